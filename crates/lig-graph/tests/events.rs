//! Event ordering and listener management.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{fixture, record};
use lig_graph::Event;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn change_events_carry_previous_and_current_values() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1, "name": "ada"})).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    user.on("change:name", move |event| {
        if let Event::Change {
            previous, current, ..
        } = event
        {
            sink.borrow_mut().push((previous.clone(), current.clone()));
        }
    });

    user.set("name", "bob");
    user.unset("name");
    assert_eq!(
        *seen.borrow(),
        [
            (Some(json!("ada")), Some(json!("bob"))),
            (Some(json!("bob")), None),
        ]
    );
}

#[test]
fn unset_of_a_missing_key_is_silent() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let events = record(&user);
    user.unset("nothing");
    assert!(events.borrow().is_empty());
}

#[test]
fn off_removes_a_listener() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    let id = user.on("change", move |_| *counter.borrow_mut() += 1);

    user.set("a", 1);
    assert!(user.off(id));
    user.set("a", 2);
    assert_eq!(*count.borrow(), 1);
    assert!(!user.off(id));
}

#[test]
fn destroy_fires_before_dissociation() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let membership = fx
        .graph
        .create(fx.membership, json!({"id": 2, "user_id": 1}))
        .unwrap();
    let membership_events = record(&membership);
    let user_events = record(&user);

    membership.destroy();
    membership.destroy();
    assert_eq!(*membership_events.borrow(), ["destroy", "dissociate:user"]);
    assert_eq!(*user_events.borrow(), ["dissociate:memberships"]);
}

#[test]
fn listeners_may_mutate_the_graph() {
    let fx = fixture();
    let user = fx.graph.create(fx.user, json!({"id": 1})).unwrap();
    let membership = fx.graph.create(fx.membership, json!({"id": 2})).unwrap();

    let target = user.clone();
    membership.on("associate:user", move |_| target.set("touched", true));
    membership.set("user_id", 1);
    assert_eq!(user.get("touched"), Some(json!(true)));
}
