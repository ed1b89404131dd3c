// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Startup error types for ingress-dns.
//!
//! Every variant here is fatal: it is returned before serving begins and the
//! binary turns it into a non-zero exit. Steady-state failures (watch stream
//! interruptions, malformed queries) never surface as these errors; they are
//! absorbed by the watcher and the server loop.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the process before it starts answering queries.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The kubeconfig file could not be read or parsed
    #[error("Failed to load kubeconfig from {path}: {source}")]
    KubeconfigRead {
        /// Path that was read
        path: PathBuf,
        /// Underlying kubeconfig error
        #[source]
        source: kube::config::KubeconfigError,
    },

    /// The kubeconfig was readable but did not yield a usable client configuration
    #[error("Failed to build client configuration from {origin}: {reason}")]
    ClientConfig {
        /// Where the configuration came from (a path, or "environment")
        origin: String,
        /// Explanation of what went wrong
        reason: String,
    },

    /// The Kubernetes client could not be constructed from the configuration
    #[error("Failed to construct Kubernetes client: {source}")]
    ClientBuild {
        /// Underlying client error
        #[source]
        source: kube::Error,
    },

    /// The Ingress API could not be reached with the loaded credentials
    #[error("Failed to open Ingress watch (cluster-wide list check failed): {source}")]
    InitialWatch {
        /// Underlying API error
        #[source]
        source: kube::Error,
    },

    /// The DNS listener socket could not be bound
    #[error("Failed to bind DNS listener on udp://{addr}: {source}")]
    Bind {
        /// Requested listen address
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The metrics HTTP endpoint could not be bound
    #[error("Failed to bind metrics endpoint on http://{addr}: {source}")]
    MetricsBind {
        /// Requested listen address
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
