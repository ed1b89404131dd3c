// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end tests over real UDP on the loopback interface.
//!
//! A `DnsServer` is bound to an ephemeral port; Ingress events are applied
//! through an `IngressWatcher` sharing the same `RecordStore`, and queries are
//! sent as real datagrams. No cluster is required.

mod common;

use std::net::{Ipv4Addr, SocketAddr};

use hickory_proto::op::{MessageType, ResponseCode};
use hickory_proto::rr::RecordType;
use ingress_dns::ingress_watcher::IngressWatcher;
use ingress_dns::record_store::RecordStore;
use ingress_dns::server::DnsServer;
use kube::runtime::watcher::Event;
use tokio::task::JoinHandle;

use common::*;

/// A running server; aborted on drop.
struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(store: RecordStore) -> Self {
        let server = DnsServer::bind("127.0.0.1:0".parse().unwrap(), store)
            .await
            .expect("failed to bind DNS server");
        let addr = server.local_addr().expect("failed to get local addr");
        let handle = tokio::spawn(server.run());
        Self { addr, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn unknown_host_yields_zero_answers() {
    let server = TestServer::start(RecordStore::new()).await;

    let msg = query(server.addr, "nothing.example.com.", RecordType::A, 1).await;

    assert_eq!(msg.id(), 1);
    assert_eq!(msg.message_type(), MessageType::Response);
    assert_eq!(msg.response_code(), ResponseCode::NoError);
    assert!(msg.answers().is_empty());
}

#[tokio::test]
async fn added_then_removed_ingress_host() {
    let store = RecordStore::new();
    let mut watcher = IngressWatcher::new(store.clone(), Ipv4Addr::LOCALHOST);
    let server = TestServer::start(store).await;
    let foo = ingress("default", "foo", &["foo.example.com"]);

    watcher.apply_event(Event::Apply(foo.clone()));
    let msg = query(server.addr, "foo.example.com.", RecordType::A, 2).await;
    assert_eq!(
        a_answers(&msg),
        vec![("foo.example.com.".to_string(), Ipv4Addr::LOCALHOST)]
    );

    watcher.apply_event(Event::Delete(foo));
    let msg = query(server.addr, "foo.example.com.", RecordType::A, 3).await;
    assert!(msg.answers().is_empty());
    assert_eq!(msg.response_code(), ResponseCode::NoError);
}

#[tokio::test]
async fn non_a_query_for_known_host_yields_zero_answers() {
    let store = RecordStore::new();
    store.put("foo.example.com.", "127.0.0.1");
    let server = TestServer::start(store).await;

    let msg = query(server.addr, "foo.example.com.", RecordType::AAAA, 4).await;

    assert_eq!(msg.response_code(), ResponseCode::NoError);
    assert!(msg.answers().is_empty());
}

#[tokio::test]
async fn malformed_datagram_is_dropped_and_server_keeps_serving() {
    let store = RecordStore::new();
    store.put("foo.example.com.", "127.0.0.1");
    let server = TestServer::start(store).await;

    let reply = exchange_raw(server.addr, &[0xde, 0xad]).await;
    assert!(reply.is_none(), "Undecodable datagram should get no reply");

    let msg = query(server.addr, "foo.example.com.", RecordType::A, 5).await;
    assert_eq!(a_answers(&msg).len(), 1);
}

#[tokio::test]
async fn concurrent_queries_during_updates() {
    let store = RecordStore::new();
    let server = TestServer::start(store.clone()).await;
    let addr = server.addr;

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut watcher = IngressWatcher::new(store, Ipv4Addr::LOCALHOST);
            for i in 0..200 {
                let ing = ingress("default", "flappy", &["flappy.example.com"]);
                if i % 2 == 0 {
                    watcher.apply_event(Event::Apply(ing));
                } else {
                    watcher.apply_event(Event::Delete(ing));
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..8u16)
        .map(|n| {
            tokio::spawn(async move {
                for i in 0..10u16 {
                    let msg = query(addr, "flappy.example.com.", RecordType::A, n * 100 + i).await;
                    let answers = a_answers(&msg);
                    assert!(answers.len() <= 1);
                    for (_, ip) in answers {
                        assert_eq!(ip, Ipv4Addr::LOCALHOST);
                    }
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
