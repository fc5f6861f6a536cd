//! Shared fixture: users, memberships, groups, settings.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use lig_graph::{ClassId, Event, Graph, Many, Model, One};

pub struct Fixture {
    pub graph: Graph,
    pub user: ClassId,
    pub membership: ClassId,
    pub group: ClassId,
    pub settings: ClassId,
}

pub fn fixture() -> Fixture {
    fixture_with(Graph::new())
}

/// Declare the fixture classes on `graph`.
pub fn fixture_with(graph: Graph) -> Fixture {
    let user = graph.define("User").unwrap();
    let membership = graph.define("Membership").unwrap();
    let group = graph.define("Group").unwrap();
    let settings = graph.define("Settings").unwrap();

    graph
        .has(membership)
        .one("user", One::model("User").inverse("memberships"))
        .unwrap()
        .one("group", One::model("Group").inverse("memberships"))
        .unwrap();
    graph
        .has(settings)
        .one("user", One::model("User").inverse("settings"))
        .unwrap();
    graph
        .has(user)
        .one("settings", One::model("Settings").inverse("user"))
        .unwrap()
        .many("memberships", Many::collection("Membership").inverse("user"))
        .unwrap()
        .many("contacts", Many::collection("User").source("users"))
        .unwrap();
    graph
        .has(group)
        .many("memberships", Many::collection("Membership").inverse("group"))
        .unwrap();

    Fixture {
        graph,
        user,
        membership,
        group,
        settings,
    }
}

/// Record the topics of every event `model` emits.
pub fn record(model: &Model) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    model.on("all", move |event: &Event| sink.borrow_mut().push(event.topic()));
    seen
}
