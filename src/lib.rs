// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ingress-dns - Local DNS for Kubernetes Ingress hosts
//!
//! ingress-dns watches every `Ingress` in a cluster and answers DNS `A` queries
//! for their rule hosts with a fixed address (loopback by default), so that
//! cluster-routed services are reachable by name from a workstation without
//! editing `/etc/hosts`.
//!
//! ## Architecture
//!
//! ```text
//!  Kubernetes API                                   DNS clients
//!       │ watch Ingress (all namespaces)                 │ udp :5353
//!       ▼                                                ▼
//!  ┌──────────────────┐   put / delete   ┌─────────────┐  get  ┌──────────────────┐
//!  │  IngressWatcher  │ ───────────────▶ │ RecordStore │ ◀──── │ DnsServer        │
//!  │  (single task)   │                  │ (RwLock map)│       │  + respond()     │
//!  └──────────────────┘                  └─────────────┘       └──────────────────┘
//! ```
//!
//! The watcher and the server never call each other; they share only the
//! [`record_store::RecordStore`].
//!
//! ## Modules
//!
//! - [`record_store`] - Concurrency-safe hostname → address table
//! - [`ingress_watcher`] - Applies Ingress watch events to the store
//! - [`query_responder`] - Builds DNS responses from the store
//! - [`server`] - UDP listener loop
//! - [`cluster`] - Kubeconfig loading and client construction
//! - [`cli`] - Command-line arguments
//! - [`metrics`] / [`metrics_server`] - Prometheus metrics and their HTTP endpoint
//!
//! ## Example
//!
//! ```rust,no_run
//! use ingress_dns::query_responder::respond;
//! use ingress_dns::record_store::RecordStore;
//! use hickory_proto::op::Message;
//!
//! let store = RecordStore::new();
//! store.put("foo.example.com.", "127.0.0.1");
//!
//! let request = Message::new();
//! let response = respond(&request, &store);
//! assert_eq!(response.id(), request.id());
//! ```

pub mod cli;
pub mod cluster;
pub mod constants;
pub mod errors;
pub mod ingress_watcher;
pub mod metrics;
pub mod metrics_server;
pub mod query_responder;
pub mod record_store;
pub mod server;
