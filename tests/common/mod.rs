// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// How long a test waits for a UDP reply before giving up
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Build an Ingress declaring one rule per host
pub fn ingress(namespace: &str, name: &str, hosts: &[&str]) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(
                hosts
                    .iter()
                    .map(|host| IngressRule {
                        host: Some((*host).to_string()),
                        http: None,
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: None,
    }
}

/// Wire-format bytes for a single-question query
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    let mut query = Query::new();
    query
        .set_name(Name::from_str(name).unwrap())
        .set_query_type(record_type)
        .set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Send raw bytes to the server and wait for a reply
pub async fn exchange_raw(server: SocketAddr, bytes: &[u8]) -> Option<Vec<u8>> {
    let sock = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("failed to bind client socket");
    sock.send_to(bytes, server)
        .await
        .expect("failed to send datagram");

    let mut buf = vec![0u8; 4096];
    match tokio::time::timeout(REPLY_TIMEOUT, sock.recv(&mut buf)).await {
        Ok(Ok(len)) => Some(buf[..len].to_vec()),
        Ok(Err(e)) => panic!("failed to receive reply: {e}"),
        Err(_) => None,
    }
}

/// Query the server over UDP and parse the reply
pub async fn query(server: SocketAddr, name: &str, record_type: RecordType, id: u16) -> Message {
    let reply = exchange_raw(server, &build_query_bytes(name, record_type, id))
        .await
        .expect("query timed out");
    Message::from_vec(&reply).expect("failed to parse DNS response")
}

/// All A answers in a response as (owner, address)
pub fn a_answers(msg: &Message) -> Vec<(String, Ipv4Addr)> {
    msg.answers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::A(a)) => Some((record.name().to_ascii(), a.0)),
            _ => None,
        })
        .collect()
}
