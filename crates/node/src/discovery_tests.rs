// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

use super::*;

fn eid(s: &str) -> Eid {
    Eid::parse(s).expect("valid eid")
}

fn announce(from: &Eid) -> Bundle {
    Bundle::new(BundleType::BrokerAnnounce, from.clone(), Eid::broadcast())
        .with_node_type(NodeType::Broker)
}

fn ack(from: &Eid, to: &Eid) -> Bundle {
    Bundle::new(BundleType::BrokerAck, from.clone(), to.clone())
}

#[test]
fn announcement_starts_pending_association_and_requests() {
    let me = eid("dtn://exec/");
    let broker = eid("dtn://broker/");
    let mut assoc = Association::default();

    let out = assoc.observe(&me, NodeType::Executor, &announce(&broker));

    assert_eq!(assoc.pending, Some(broker.clone()));
    assert_eq!(assoc.broker, None);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].kind, BundleType::BrokerRequest);
    assert_eq!(out[0].source, me);
    assert_eq!(out[0].destination, broker);
    assert_eq!(out[0].node_type, Some(NodeType::Executor));
}

#[test]
fn duplicate_announcements_are_ignored_while_pending() {
    let me = eid("dtn://exec/");
    let first = eid("dtn://broker1/");
    let second = eid("dtn://broker2/");
    let mut assoc = Association::default();

    assoc.observe(&me, NodeType::Executor, &announce(&first));
    let out = assoc.observe(&me, NodeType::Executor, &announce(&second));

    assert!(out.is_empty());
    assert_eq!(assoc.pending, Some(first));
    assert_eq!(assoc.broker, None);
}

#[test]
fn matching_ack_confirms_association() {
    let me = eid("dtn://exec/");
    let broker = eid("dtn://broker/");
    let mut assoc = Association::default();

    assoc.observe(&me, NodeType::Executor, &announce(&broker));
    let out = assoc.observe(&me, NodeType::Executor, &ack(&broker, &me));

    assert!(out.is_empty());
    assert_eq!(assoc.pending, None);
    assert_eq!(assoc.broker, Some(broker));
}

#[test]
fn ack_from_a_different_broker_is_ignored() {
    let me = eid("dtn://exec/");
    let wanted = eid("dtn://broker1/");
    let intruder = eid("dtn://broker2/");
    let mut assoc = Association::default();

    assoc.observe(&me, NodeType::Executor, &announce(&wanted));
    assoc.observe(&me, NodeType::Executor, &ack(&intruder, &me));

    assert_eq!(assoc.pending, Some(wanted));
    assert_eq!(assoc.broker, None);
}

#[test]
fn ack_without_pending_association_is_ignored() {
    let me = eid("dtn://exec/");
    let broker = eid("dtn://broker/");
    let mut assoc = Association::default();

    let out = assoc.observe(&me, NodeType::Executor, &ack(&broker, &me));

    assert!(out.is_empty());
    assert_eq!(assoc, Association::default());
}

#[test]
fn association_is_monotone_once_confirmed() {
    let me = eid("dtn://exec/");
    let broker = eid("dtn://broker/");
    let latecomer = eid("dtn://broker2/");
    let mut assoc = Association::default();

    assoc.observe(&me, NodeType::Executor, &announce(&broker));
    assoc.observe(&me, NodeType::Executor, &ack(&broker, &me));

    // No later discovery traffic changes the confirmed broker.
    let out = assoc.observe(&me, NodeType::Executor, &announce(&latecomer));
    assert!(out.is_empty());
    assoc.observe(&me, NodeType::Executor, &ack(&latecomer, &me));
    assoc.observe(&me, NodeType::Executor, &announce(&broker));

    assert_eq!(assoc.broker, Some(broker));
    assert_eq!(assoc.pending, None);
}

#[test]
fn preseeded_association_ignores_all_discovery() {
    let me = eid("dtn://client/");
    let broker = eid("dtn://broker/");
    let other = eid("dtn://broker2/");
    let mut assoc = Association::with_broker(broker.clone());

    let out = assoc.observe(&me, NodeType::Client, &announce(&other));
    assert!(out.is_empty());
    assert_eq!(assoc.broker, Some(broker));
}
