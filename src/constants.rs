// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for ingress-dns.
//!
//! Constants are organized by category for easy maintenance.

use std::net::Ipv4Addr;

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Default UDP port for the DNS listener
pub const DEFAULT_DNS_PORT: u16 = 5353;

/// Default listen address for the DNS listener (all interfaces)
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0";

/// Address every discovered ingress host resolves to
pub const DEFAULT_TARGET_ADDR: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// TTL of synthesized A answers (1 hour)
pub const ANSWER_TTL_SECS: u32 = 3600;

/// Receive buffer for a single UDP datagram
///
/// Large enough for EDNS0 payloads; plain DNS over UDP tops out at 512 bytes.
pub const UDP_RECV_BUFFER_SIZE: usize = 4096;

// ============================================================================
// Ingress Watcher Constants
// ============================================================================

/// Delay before re-creating the watch stream after it terminates
pub const WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Pause after a failed `recv_from` before the server loop tries again
pub const RECV_ERROR_BACKOFF_MILLIS: u64 = 100;

/// Page size used by the startup access check against the Ingress API
pub const PREFLIGHT_LIST_LIMIT: u32 = 1;

/// Server-side timeout of the one-shot watch opened by the startup access check
pub const PREFLIGHT_WATCH_TIMEOUT_SECS: u32 = 1;

// ============================================================================
// Kubernetes Client Constants
// ============================================================================

/// Kubeconfig location relative to the user's home directory
pub const KUBECONFIG_HOME_RELATIVE_PATH: &str = ".kube/config";

// ============================================================================
// Metrics Constants
// ============================================================================

/// Namespace prefix for all exported metrics (prometheus-safe)
pub const METRICS_NAMESPACE: &str = "ingress_dns";
