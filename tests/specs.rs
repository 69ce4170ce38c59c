// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Workspace integration tests: the agent RPC client against an
//! in-process fake DTN agent serving the real socket protocol.

use std::path::PathBuf;
use std::sync::Arc;

use drift_core::Eid;
use drift_node::{AgentClient, AgentError};
use drift_wire::{
    decode, encode, read_frame, write_frame, Bundle, BundleType, FetchReply, Message, NodeType,
    Reply,
};
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::sync::Mutex;

fn eid(s: &str) -> Eid {
    Eid::parse(s).expect("valid eid")
}

/// A fake agent: accepts one connection per request, records what it was
/// sent, and answers from a scripted queue of replies.
struct FakeAgent {
    received: Arc<Mutex<Vec<Message>>>,
    replies: Arc<Mutex<Vec<Message>>>,
}

impl FakeAgent {
    /// Serve on a fresh socket path, answering each request with the next
    /// scripted reply (or a generic OK once the script runs dry).
    async fn spawn(dir: &TempDir, scripted: Vec<Message>) -> (PathBuf, Arc<Mutex<Vec<Message>>>) {
        let socket_path = dir.path().join("agent.sock");
        let listener = UnixListener::bind(&socket_path).expect("bind fake agent");

        let agent = FakeAgent {
            received: Arc::new(Mutex::new(Vec::new())),
            replies: Arc::new(Mutex::new(scripted)),
        };
        let received = agent.received.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let request = read_frame(&mut stream).await.expect("read request");
                let message = decode(&request).expect("decode request");
                agent.received.lock().await.push(message);

                let reply = {
                    let mut replies = agent.replies.lock().await;
                    if replies.is_empty() {
                        Message::Reply(Reply::ok())
                    } else {
                        replies.remove(0)
                    }
                };
                let bytes = encode(&reply).expect("encode reply");
                write_frame(&mut stream, &bytes).await.expect("write reply");
            }
        });

        (socket_path, received)
    }
}

#[tokio::test]
async fn register_speaks_the_socket_protocol() {
    let dir = TempDir::new().unwrap();
    let (socket, received) = FakeAgent::spawn(&dir, vec![]).await;

    let client = AgentClient::new(&socket);
    client.register(&eid("dtn://node/")).await.expect("register");

    let seen = received.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], Message::Register { endpoint_id: eid("dtn://node/") });
}

#[tokio::test]
async fn fetch_returns_the_agents_bundles() {
    let dir = TempDir::new().unwrap();
    let bundle = Bundle::new(BundleType::NdataGet, eid("dtn://store/"), eid("dtn://exec/"))
        .with_payload(b"blob-bytes".to_vec())
        .with_named_data("input/blob".to_string());
    let (socket, received) =
        FakeAgent::spawn(&dir, vec![Message::FetchReply(FetchReply::ok(vec![bundle.clone()]))])
            .await;

    let client = AgentClient::new(&socket);
    let bundles = client.fetch(&eid("dtn://exec/"), NodeType::Executor).await.expect("fetch");

    assert_eq!(bundles, vec![bundle]);

    let seen = received.lock().await;
    assert_eq!(
        seen[0],
        Message::Fetch { endpoint_id: eid("dtn://exec/"), node_type: NodeType::Executor }
    );
}

#[tokio::test]
async fn failed_fetch_yields_no_bundles() {
    let dir = TempDir::new().unwrap();
    let (socket, _) = FakeAgent::spawn(
        &dir,
        vec![Message::FetchReply(FetchReply {
            success: false,
            error: "endpoint unknown".to_string(),
            bundles: Vec::new(),
        })],
    )
    .await;

    let client = AgentClient::new(&socket);
    let bundles = client.fetch(&eid("dtn://exec/"), NodeType::Executor).await.expect("fetch");
    assert!(bundles.is_empty());
}

#[tokio::test]
async fn send_bundle_wraps_in_create_and_surfaces_the_reply() {
    let dir = TempDir::new().unwrap();
    let (socket, received) =
        FakeAgent::spawn(&dir, vec![Message::Reply(Reply::err("no route"))]).await;

    let client = AgentClient::new(&socket);
    let bundle = Bundle::new(BundleType::BrokerAnnounce, eid("dtn://broker/"), Eid::broadcast())
        .with_node_type(NodeType::Broker);
    let reply = client.send_bundle(bundle.clone()).await.expect("send");

    assert!(!reply.success);
    assert_eq!(reply.error, "no route");

    let seen = received.lock().await;
    assert_eq!(seen[0], Message::Create { bundle });
}

#[tokio::test]
async fn each_request_uses_a_fresh_connection() {
    let dir = TempDir::new().unwrap();
    let (socket, received) = FakeAgent::spawn(&dir, vec![]).await;

    let client = AgentClient::new(&socket);
    for _ in 0..3 {
        client.register(&eid("dtn://node/")).await.expect("register");
    }

    assert_eq!(received.lock().await.len(), 3);
}

#[tokio::test]
async fn missing_socket_is_a_connect_error() {
    let dir = TempDir::new().unwrap();
    let client = AgentClient::new(dir.path().join("nonexistent.sock"));

    let err = client.register(&eid("dtn://node/")).await.expect_err("should fail");
    assert!(matches!(err, AgentError::Connect { .. }));
}
