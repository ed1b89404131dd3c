// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for ingress-dns.
//!
//! All metrics carry the namespace prefix `ingress_dns_`.
//!
//! # Metrics Categories
//!
//! - **Query Metrics** - Questions answered, ignored or dropped by the responder
//! - **Transport Metrics** - Datagrams the server loop could not decode
//! - **Watcher Metrics** - Ingress events applied and watch stream errors
//! - **Store Metrics** - Number of hostnames currently resolvable
//!
//! # Example
//!
//! ```rust,no_run
//! use hickory_proto::rr::RecordType;
//! use ingress_dns::metrics::{gather_metrics, record_query, QueryOutcome};
//!
//! record_query(RecordType::A, QueryOutcome::Answered);
//! let text = gather_metrics().unwrap();
//! assert!(text.contains("ingress_dns_queries_total"));
//! ```

use hickory_proto::rr::RecordType;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::Duration;

use crate::constants::METRICS_NAMESPACE;

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Query Metrics
// ============================================================================

/// Total number of questions processed by the responder
///
/// Labels:
/// - `qtype`: Record type asked for (e.g., `A`, `AAAA`)
/// - `result`: Outcome (`answered`, `no_data`, `ignored`, `invalid_record`)
pub static QUERIES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_queries_total"),
        "Total number of DNS questions by record type and result",
    );
    let counter = CounterVec::new(opts, &["qtype", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Time spent producing a response for one datagram
pub static QUERY_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_query_duration_seconds"),
        "Time spent decoding, answering and encoding one DNS message",
    )
    .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Transport Metrics
// ============================================================================

/// Datagrams that could not be decoded as DNS messages
pub static MALFORMED_DATAGRAMS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_malformed_datagrams_total"),
        "Total number of received datagrams that failed to decode",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Watcher Metrics
// ============================================================================

/// Ingress watch events applied to the record store
///
/// Labels:
/// - `event`: `apply`, `delete`, `init`, `init_apply`, `init_done`
pub static WATCH_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_watch_events_total"),
        "Total number of Ingress watch events by kind",
    );
    let counter = CounterVec::new(opts, &["event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Errors surfaced by the Ingress watch stream (each one triggers a backoff)
pub static WATCH_ERRORS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_watch_errors_total"),
        "Total number of Ingress watch stream errors",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Full reconciliations of the record store after a relist
pub static RECONCILIATIONS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of full record store reconciliations after an Ingress relist",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Store Metrics
// ============================================================================

/// Number of hostnames currently in the record store
pub static RECORDS_ACTIVE: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::with_opts(Opts::new(
        format!("{METRICS_NAMESPACE}_records_active"),
        "Number of hostnames currently resolvable",
    ))
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Result of answering a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// An A answer was appended
    Answered,
    /// A question for a name the store does not know
    NoData,
    /// A question type other than A, or a non-QUERY opcode
    Ignored,
    /// The stored value could not be turned into a record
    InvalidRecord,
}

impl QueryOutcome {
    /// Label value used for the `result` label
    #[must_use]
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::NoData => "no_data",
            Self::Ignored => "ignored",
            Self::InvalidRecord => "invalid_record",
        }
    }
}

/// Label value used for the `qtype` label.
///
/// Types hickory does not know are folded into `other` so that clients cannot
/// grow the label set without bound.
#[must_use]
pub fn qtype_label(qtype: RecordType) -> Cow<'static, str> {
    match qtype {
        RecordType::Unknown(_) => Cow::Borrowed("other"),
        known => Cow::Owned(known.to_string()),
    }
}

/// Record the outcome of one question
///
/// # Arguments
/// * `qtype` - Record type of the question (e.g., `A`)
/// * `outcome` - What the responder did with it
pub fn record_query(qtype: RecordType, outcome: QueryOutcome) {
    let qtype = qtype_label(qtype);
    QUERIES_TOTAL
        .with_label_values(&[qtype.as_ref(), outcome.as_label()])
        .inc();
}

/// Record the time spent handling one datagram
pub fn record_query_duration(duration: Duration) {
    QUERY_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a datagram that failed to decode
pub fn record_malformed_datagram() {
    MALFORMED_DATAGRAMS_TOTAL.inc();
}

/// Record an Ingress watch event
///
/// # Arguments
/// * `event` - Event kind (e.g., `apply`, `delete`)
pub fn record_watch_event(event: &str) {
    WATCH_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Record an error from the Ingress watch stream
pub fn record_watch_error() {
    WATCH_ERRORS_TOTAL.inc();
}

/// Record a full reconciliation of the record store
pub fn record_reconciliation() {
    RECONCILIATIONS_TOTAL.inc();
}

/// Publish the current number of records
#[allow(clippy::cast_precision_loss)]
pub fn set_records_active(count: usize) {
    RECORDS_ACTIVE.set(count as f64);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
