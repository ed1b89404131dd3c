// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared hostname → address table.
//!
//! The [`RecordStore`] is the single source of truth for name resolution. The
//! Ingress watcher writes to it and every query handler reads from it, so all
//! access goes through one `RwLock`. Each operation holds the lock for exactly
//! one map operation and never across an `.await`.
//!
//! Keys are fully-qualified hostnames (trailing dot) kept in the case they were
//! received in. Values are IPv4 literals kept as text; turning them into wire
//! records is the responder's job.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::metrics;

/// Thread-safe, cheaply clonable handle to the record table.
///
/// Clones share the same underlying map. Construct it once at startup and hand
/// clones to the watcher and the server.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the address for a fully-qualified hostname.
    ///
    /// Absence means "no answer", not an error.
    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<String> {
        self.inner.read().get(hostname).cloned()
    }

    /// Insert or overwrite the address for `hostname`.
    ///
    /// Returns `true` if an existing entry was replaced.
    pub fn put(&self, hostname: impl Into<String>, ip: impl Into<String>) -> bool {
        let hostname = hostname.into();
        let ip = ip.into();
        trace!(hostname = %hostname, ip = %ip, "record put");

        let (replaced, len) = {
            let mut records = self.inner.write();
            let replaced = records.insert(hostname, ip).is_some();
            (replaced, records.len())
        };
        metrics::set_records_active(len);
        replaced
    }

    /// Remove `hostname` from the store.
    ///
    /// Removing an absent key is a no-op. Returns `true` if an entry was removed.
    pub fn delete(&self, hostname: &str) -> bool {
        trace!(hostname = %hostname, "record delete");

        let (removed, len) = {
            let mut records = self.inner.write();
            let removed = records.remove(hostname).is_some();
            (removed, records.len())
        };
        metrics::set_records_active(len);
        removed
    }

    /// Atomically replace the whole table.
    ///
    /// Readers observe either the old table or the new one, never a mix.
    pub fn replace_all(&self, records: HashMap<String, String>) {
        let len = records.len();
        *self.inner.write() = records;
        metrics::set_records_active(len);
    }

    /// Number of hostnames currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store holds no hostnames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sorted snapshot of all stored hostnames.
    #[must_use]
    pub fn hostnames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "record_store_tests.rs"]
mod record_store_tests;
