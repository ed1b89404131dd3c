// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Builds DNS responses from the [`RecordStore`].
//!
//! One inbound query produces exactly one response. Only `A` questions on a
//! `QUERY` opcode are answered; everything else is echoed back with no answers
//! and `NOERROR`, which clients read as "no data". The responder never writes to
//! the store.

use hickory_proto::error::ProtoResult;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::net::Ipv4Addr;
use tracing::debug;

use crate::constants::ANSWER_TTL_SECS;
use crate::metrics::{self, QueryOutcome};
use crate::record_store::RecordStore;

/// Produce the response to `request` using the current contents of `store`.
///
/// Header fields the client needs to match the reply (id, opcode, RD, CD) and
/// the question section are copied from the request.
#[must_use]
pub fn respond(request: &Message, store: &RecordStore) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_checking_disabled(request.checking_disabled())
        .set_response_code(ResponseCode::NoError)
        .add_queries(request.queries().iter().cloned());

    if request.op_code() != OpCode::Query {
        debug!(id = request.id(), op_code = ?request.op_code(), "Unsupported opcode, no answers");
        for query in request.queries() {
            metrics::record_query(query.query_type(), QueryOutcome::Ignored);
        }
        return response;
    }

    for query in request.queries() {
        let (outcome, answer) = answer_question(query, store);
        metrics::record_query(query.query_type(), outcome);
        if let Some(record) = answer {
            response.add_answer(record);
        }
    }

    response
}

/// Answer a single question, if it can be answered.
fn answer_question(query: &Query, store: &RecordStore) -> (QueryOutcome, Option<Record>) {
    if query.query_type() != RecordType::A {
        debug!(name = %query.name(), qtype = %query.query_type(), "Ignoring non-A question");
        return (QueryOutcome::Ignored, None);
    }

    let hostname = query.name().to_ascii();
    debug!(name = %hostname, "Query for A record");

    let Some(ip) = store.get(&hostname) else {
        return (QueryOutcome::NoData, None);
    };

    match ip.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let mut record =
                Record::from_rdata(query.name().clone(), ANSWER_TTL_SECS, RData::A(A::from(addr)));
            record.set_dns_class(DNSClass::IN);
            (QueryOutcome::Answered, Some(record))
        }
        Err(e) => {
            debug!(name = %hostname, value = %ip, error = %e, "Stored value is not an IPv4 address, dropping answer");
            (QueryOutcome::InvalidRecord, None)
        }
    }
}

/// Encode a response in wire format with name compression disabled.
///
/// # Errors
///
/// Returns an error if the message cannot be encoded.
pub fn encode_response(response: &Message) -> ProtoResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(512);
    {
        let mut encoder = BinEncoder::new(&mut buffer);
        encoder.set_canonical_names(true);
        response.emit(&mut encoder)?;
    }
    Ok(buffer)
}

#[cfg(test)]
#[path = "query_responder_tests.rs"]
mod query_responder_tests;
