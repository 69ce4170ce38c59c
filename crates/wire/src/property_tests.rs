// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Property tests for codec roundtrips covering every message variant.

use drift_core::Eid;
use proptest::prelude::*;

use crate::{decode, encode, Bundle, BundleType, FetchReply, Message, NamedData, NodeType, Reply};

fn node_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._~-]{1,12}".prop_filter("the null node name is reserved", |s| s != "none")
}

fn eid() -> impl Strategy<Value = Eid> {
    (node_name(), "[a-z0-9/~]{0,12}")
        .prop_map(|(node, service)| Eid::dtn(&node, &service).unwrap())
}

fn bundle_type() -> impl Strategy<Value = BundleType> {
    prop_oneof![
        Just(BundleType::BrokerAnnounce),
        Just(BundleType::BrokerRequest),
        Just(BundleType::BrokerAck),
        Just(BundleType::JobSubmit),
        Just(BundleType::JobResult),
        Just(BundleType::JobQuery),
        Just(BundleType::JobList),
        Just(BundleType::NdataPut),
        Just(BundleType::NdataGet),
        Just(BundleType::NdataDel),
    ]
}

fn node_type() -> impl Strategy<Value = NodeType> {
    prop_oneof![
        Just(NodeType::Broker),
        Just(NodeType::Executor),
        Just(NodeType::Datastore),
        Just(NodeType::Client),
    ]
}

fn named_data() -> impl Strategy<Value = NamedData> {
    prop_oneof![
        "[a-z0-9/]{1,16}".prop_map(NamedData::One),
        proptest::collection::vec("[a-z0-9/]{1,16}".prop_map(String::from), 0..4)
            .prop_map(NamedData::Many),
    ]
}

prop_compose! {
    fn bundle()(
        kind in bundle_type(),
        source in eid(),
        destination in eid(),
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        success in any::<bool>(),
        error in "[ -~]{0,24}",
        node_type in proptest::option::of(node_type()),
        submitter in proptest::option::of(eid()),
        named in proptest::option::of(named_data()),
    ) -> Bundle {
        Bundle {
            kind,
            source,
            destination,
            payload,
            success,
            error,
            node_type,
            submitter,
            named_data: named,
        }
    }
}

fn message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (any::<bool>(), "[ -~]{0,24}")
            .prop_map(|(success, error)| Message::Reply(Reply { success, error })),
        eid().prop_map(|endpoint_id| Message::Register { endpoint_id }),
        (eid(), node_type())
            .prop_map(|(endpoint_id, node_type)| Message::Fetch { endpoint_id, node_type }),
        (any::<bool>(), "[ -~]{0,24}", proptest::collection::vec(bundle(), 0..4)).prop_map(
            |(success, error, bundles)| Message::FetchReply(FetchReply {
                success,
                error,
                bundles
            })
        ),
        bundle().prop_map(|bundle| Message::Create { bundle }),
    ]
}

proptest! {
    #[test]
    fn every_message_roundtrips(original in message()) {
        let bytes = encode(&original).unwrap();
        let back = decode(&bytes).unwrap();
        prop_assert_eq!(back, original);
    }

    #[test]
    fn every_bundle_roundtrips(original in bundle()) {
        let bytes = encode(&Message::Create { bundle: original.clone() }).unwrap();
        let back = decode(&bytes).unwrap();
        prop_assert_eq!(back, Message::Create { bundle: original });
    }
}
