//! One-associations: foreign key resolution, inverses, destroy cascade.

mod common;

use common::{fixture, record};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

#[test]
fn setting_associations() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 5})).unwrap();
    let membership = fx
        .graph
        .create(fx.membership, json!({"id": 3, "user_id": 5}))
        .unwrap();
    assert_eq!(membership.one("user"), Some(user.clone()));

    membership.set("user_id", Value::Null);
    assert_eq!(membership.one("user"), None);

    membership.set("user_id", 5);
    assert_eq!(membership.one("user"), Some(user));
}

#[test]
fn parsing_associations() {
    let fx = fixture();
    let membership = fx.graph.create(fx.membership, json!({"id": 2})).unwrap();
    membership.parse(json!({"user": {"id": 4}})).unwrap();

    let user = membership.one("user").unwrap();
    assert_eq!(user.class(), fx.user);
    assert_eq!(user.id(), Some(json!(4)));
    assert_eq!(membership.get("user_id"), Some(json!(4)));
    assert!(!membership.has("user"));

    membership.parse(json!({})).unwrap();
    assert_eq!(membership.one("user"), Some(user));
}

#[rstest]
#[case(json!("3"))]
#[case(json!(3))]
fn handles_ids_that_are_strings(#[case] foreign_key: Value) {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 3})).unwrap();
    let membership = fx
        .graph
        .create(fx.membership, json!({"id": 2, "user_id": foreign_key}))
        .unwrap();
    assert_eq!(membership.one("user"), Some(user.clone()));
    membership.set("user_id", "3");
    assert_eq!(membership.one("user"), Some(user));
}

#[test]
fn parse_without_existing_instance() {
    let fx = fixture();
    let membership = fx
        .graph
        .create_parsed(fx.membership, json!({"id": 1, "user": {"id": 2}}))
        .unwrap();
    let user = membership.one("user").unwrap();
    assert_eq!(user.class(), fx.user);
    assert_eq!(user.id(), Some(json!(2)));
}

#[test]
fn with_inverse() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let settings = fx
        .graph
        .create(fx.settings, json!({"id": 1, "user_id": 1}))
        .unwrap();

    assert_eq!(user.one("settings"), Some(settings.clone()));
    assert_eq!(user.get("settings_id"), Some(json!(1)));
    assert_eq!(settings.one("user"), Some(user.clone()));
    assert_eq!(settings.get("user_id"), Some(json!(1)));

    user.unset("settings_id");
    assert_eq!(user.one("settings"), None);
    assert_eq!(user.get("settings_id"), None);
    assert_eq!(settings.one("user"), None);
    assert_eq!(settings.get("user_id"), None);
}

#[test]
fn unsetting_the_other_side_clears_both() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let settings = fx
        .graph
        .create(fx.settings, json!({"id": 1, "user_id": 1}))
        .unwrap();
    let user_events = record(&user);
    let settings_events = record(&settings);

    settings.unset("user_id");
    assert_eq!(settings.one("user"), None);
    assert_eq!(settings.get("user_id"), None);
    assert_eq!(user.one("settings"), None);
    assert_eq!(user.get("settings_id"), None);

    let count = |events: &[String], topic: &str| events.iter().filter(|t| *t == topic).count();
    assert_eq!(count(&user_events.borrow(), "dissociate:settings"), 1);
    assert_eq!(count(&settings_events.borrow(), "dissociate:user"), 1);
}

#[test]
fn inverse_moves_to_a_new_partner() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let first = fx
        .graph
        .create(fx.settings, json!({"id": 1, "user_id": 1}))
        .unwrap();
    let second = fx.graph.create(fx.settings, json!({"id": 2})).unwrap();

    user.set("settings_id", 2);
    assert_eq!(user.one("settings"), Some(second.clone()));
    assert_eq!(second.get("user_id"), Some(json!(1)));
    assert_eq!(first.one("user"), None);
    assert_eq!(first.get("user_id"), None);
}

#[test]
fn dissociate_on_destroy() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let settings = fx
        .graph
        .create(fx.settings, json!({"id": 1, "user_id": 1}))
        .unwrap();

    settings.destroy();
    assert_eq!(user.one("settings"), None);
    assert_eq!(user.get("settings_id"), None);
    assert_eq!(settings.one("user"), None);
    assert_eq!(settings.get("user_id"), None);
}

#[test]
fn destroyed_owner_keeps_its_foreign_keys() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let membership = fx
        .graph
        .create(fx.membership, json!({"id": 2, "user_id": 1}))
        .unwrap();
    let memberships = user.many("memberships").unwrap();
    assert_eq!(memberships.len(), 1);

    membership.destroy();
    assert_eq!(membership.one("user"), None);
    assert_eq!(membership.get("user_id"), Some(json!(1)));
    assert!(memberships.is_empty());
}

#[test]
fn association_events_follow_the_change() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let settings = fx.graph.create(fx.settings, json!({"id": 9})).unwrap();
    let user_events = record(&user);
    let settings_events = record(&settings);

    settings.set("user_id", 1);
    assert_eq!(
        *settings_events.borrow(),
        ["change:user_id", "change", "associate:user"]
    );
    assert_eq!(
        *user_events.borrow(),
        ["change:settings_id", "change", "associate:settings"]
    );

    settings_events.borrow_mut().clear();
    user_events.borrow_mut().clear();
    settings.unset("user_id");
    assert_eq!(
        *settings_events.borrow(),
        ["change:user_id", "change", "dissociate:user"]
    );
    assert_eq!(
        *user_events.borrow(),
        ["change:settings_id", "change", "dissociate:settings"]
    );
}

#[test]
fn custom_foreign_key() {
    let graph = lig_graph::Graph::new();
    let user = graph.define("User").unwrap();
    let post = graph.define("Post").unwrap();
    graph
        .has(post)
        .one("author", lig_graph::One::model("User").foreign_key("written_by"))
        .unwrap();

    let ada = graph.create(user, json!({"id": 7})).unwrap();
    let entry = graph
        .create_parsed(post, json!({"id": 1, "author": {"id": 7}}))
        .unwrap();
    assert_eq!(entry.get("written_by"), Some(json!(7)));
    assert_eq!(entry.one("author"), Some(ada));
}

#[test]
fn id_change_propagates_to_referrers() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let membership = fx
        .graph
        .create(fx.membership, json!({"id": 2, "user_id": 1}))
        .unwrap();

    user.set("id", 10);
    assert_eq!(membership.get("user_id"), Some(json!(10)));
    assert_eq!(membership.one("user"), Some(user));
}
