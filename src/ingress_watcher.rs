// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress watcher that keeps the [`RecordStore`] in sync with the cluster.
//!
//! The watcher subscribes to `networking.k8s.io/v1` Ingresses in all namespaces
//! and maintains the invariant:
//!
//! > the record store contains exactly the union of `spec.rules[*].host` over
//! > all live Ingresses, each resolving to the configured target address.
//!
//! # Event Handling
//!
//! | Watch event | Store effect |
//! |---|---|
//! | `Apply` (added or modified) | hosts no longer declared are deleted, newly declared hosts are put |
//! | `Delete` | hosts declared only by this Ingress are deleted |
//! | `Init` .. `InitApply` .. `InitDone` | relist; on `InitDone` the store is replaced wholesale |
//! | stream error | logged and counted; the backoff-wrapped stream resumes |
//!
//! A host shared by two Ingresses stays resolvable until the last of them is
//! gone. A relist happens on startup and after every reconnect, so hosts removed
//! while the watch was disconnected are dropped at the next `InitDone`.

use futures::{Stream, StreamExt};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::runtime::watcher::Event;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::{
    PREFLIGHT_LIST_LIMIT, PREFLIGHT_WATCH_TIMEOUT_SECS, WATCH_RESTART_DELAY_SECS,
};
use crate::errors::StartupError;
use crate::metrics;
use crate::record_store::RecordStore;

/// Turn a host as written in an Ingress rule into a record store key.
///
/// Appends the root label separator unless the host already carries one.
/// No other normalization is applied.
#[must_use]
pub fn to_fqdn(host: &str) -> String {
    if host.ends_with('.') {
        host.to_string()
    } else {
        format!("{host}.")
    }
}

/// Collect the fully-qualified hosts declared by an Ingress' rules.
///
/// Rules without a host (catch-all rules) are skipped, as are empty hosts.
#[must_use]
pub fn ingress_hosts(ingress: &Ingress) -> BTreeSet<String> {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.host.as_deref())
        .filter(|host| !host.is_empty())
        .map(to_fqdn)
        .collect()
}

/// Index key for an Ingress: `namespace/name`.
fn ingress_key(ingress: &Ingress) -> String {
    format!(
        "{}/{}",
        ingress.namespace().unwrap_or_default(),
        ingress.name_any()
    )
}

/// Hosts whose visibility changed after an index update.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HostChanges {
    /// Hosts that were not declared by any Ingress before
    pub added: Vec<String>,
    /// Hosts that are no longer declared by any Ingress
    pub removed: Vec<String>,
}

/// Which hosts each live Ingress declares, with a reference count per host.
#[derive(Debug, Default, Clone)]
pub struct IngressIndex {
    hosts_by_ingress: HashMap<String, BTreeSet<String>>,
    host_refs: HashMap<String, usize>,
}

impl IngressIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current host set of an Ingress.
    pub fn upsert(&mut self, key: String, hosts: BTreeSet<String>) -> HostChanges {
        let previous = self
            .hosts_by_ingress
            .insert(key, hosts.clone())
            .unwrap_or_default();

        let mut changes = HostChanges::default();
        for host in previous.difference(&hosts) {
            if self.release(host) {
                changes.removed.push(host.clone());
            }
        }
        for host in hosts.difference(&previous) {
            let refs = self.host_refs.entry(host.clone()).or_insert(0);
            *refs += 1;
            if *refs == 1 {
                changes.added.push(host.clone());
            }
        }
        changes
    }

    /// Forget an Ingress. Returns the hosts no other Ingress declares.
    pub fn remove(&mut self, key: &str) -> Vec<String> {
        let Some(hosts) = self.hosts_by_ingress.remove(key) else {
            return Vec::new();
        };
        hosts
            .iter()
            .filter(|host| self.release(host))
            .cloned()
            .collect()
    }

    /// Whether any live Ingress declares `host`.
    #[must_use]
    pub fn contains_host(&self, host: &str) -> bool {
        self.host_refs.contains_key(host)
    }

    /// Whether the Ingress with this key is tracked.
    #[must_use]
    pub fn contains_ingress(&self, key: &str) -> bool {
        self.hosts_by_ingress.contains_key(key)
    }

    /// All hosts declared by at least one Ingress.
    pub fn hosts(&self) -> impl Iterator<Item = &String> {
        self.host_refs.keys()
    }

    /// Number of tracked Ingresses.
    #[must_use]
    pub fn ingress_count(&self) -> usize {
        self.hosts_by_ingress.len()
    }

    /// Drop one reference to `host`; `true` if that was the last one.
    fn release(&mut self, host: &str) -> bool {
        match self.host_refs.get_mut(host) {
            Some(refs) if *refs > 1 => {
                *refs -= 1;
                false
            }
            Some(_) => {
                self.host_refs.remove(host);
                true
            }
            None => false,
        }
    }
}

/// Applies Ingress watch events to a [`RecordStore`].
///
/// The watcher owns its [`IngressIndex`]; only the store is shared.
pub struct IngressWatcher {
    store: RecordStore,
    target: Ipv4Addr,
    index: IngressIndex,
    relist: Option<IngressIndex>,
}

impl IngressWatcher {
    /// Create a watcher that points every discovered host at `target`.
    #[must_use]
    pub fn new(store: RecordStore, target: Ipv4Addr) -> Self {
        Self {
            store,
            target,
            index: IngressIndex::new(),
            relist: None,
        }
    }

    /// The index of currently live Ingresses.
    #[must_use]
    pub fn index(&self) -> &IngressIndex {
        &self.index
    }

    /// Apply a single watch event to the index and the store.
    pub fn apply_event(&mut self, event: Event<Ingress>) {
        match event {
            Event::Apply(ingress) => {
                metrics::record_watch_event("apply");
                self.apply_ingress(&ingress);
            }
            Event::Delete(ingress) => {
                metrics::record_watch_event("delete");
                self.delete_ingress(&ingress);
            }
            Event::Init => {
                metrics::record_watch_event("init");
                debug!("Ingress relist started");
                self.relist = Some(IngressIndex::new());
            }
            Event::InitApply(ingress) => {
                metrics::record_watch_event("init_apply");
                let relist = self.relist.get_or_insert_with(IngressIndex::new);
                relist.upsert(ingress_key(&ingress), ingress_hosts(&ingress));
            }
            Event::InitDone => {
                metrics::record_watch_event("init_done");
                self.finish_relist();
            }
        }
    }

    /// Drain a watch stream, applying events until it ends.
    ///
    /// Errors from the stream are logged and skipped; they never end the drain.
    pub async fn run_stream<S, E>(&mut self, stream: S)
    where
        S: Stream<Item = Result<Event<Ingress>, E>>,
        E: Display,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => self.apply_event(event),
                Err(e) => {
                    metrics::record_watch_error();
                    warn!(error = %e, "Ingress watch error, backing off before resuming");
                }
            }
        }
    }

    /// Watch Ingresses cluster-wide for the lifetime of the process.
    ///
    /// The stream is wrapped in the runtime's default exponential backoff, so
    /// API errors and expired watches are retried. If the stream itself ends it
    /// is re-created after [`WATCH_RESTART_DELAY_SECS`].
    pub async fn run(mut self, client: Client) {
        let api: Api<Ingress> = Api::all(client);
        info!(target_address = %self.target, "Starting Ingress watcher (all namespaces)");

        loop {
            let stream = watcher(api.clone(), watcher::Config::default()).default_backoff();
            self.run_stream(stream).await;

            warn!(
                restart_in_secs = WATCH_RESTART_DELAY_SECS,
                "Ingress watch stream ended, re-establishing"
            );
            tokio::time::sleep(Duration::from_secs(WATCH_RESTART_DELAY_SECS)).await;
        }
    }

    fn apply_ingress(&mut self, ingress: &Ingress) {
        let key = ingress_key(ingress);
        let hosts = ingress_hosts(ingress);
        if hosts.is_empty() && !self.index.contains_ingress(&key) {
            debug!(ingress = %key, "Ingress declares no hosts, nothing to add");
            return;
        }

        let changes = self.index.upsert(key.clone(), hosts);
        for host in &changes.removed {
            self.store.delete(host);
            info!(ingress = %key, host = %host, "Removed");
        }
        // Hosts already declared elsewhere are in the store from that Ingress.
        let target = self.target.to_string();
        for host in changes.added {
            self.store.put(host.clone(), target.clone());
            info!(ingress = %key, host = %host, address = %target, "Added");
        }
    }

    fn delete_ingress(&mut self, ingress: &Ingress) {
        let key = ingress_key(ingress);
        let removed = if self.index.contains_ingress(&key) {
            self.index.remove(&key)
        } else {
            // Never indexed (e.g. created and deleted while disconnected):
            // fall back to the hosts the object itself declares.
            ingress_hosts(ingress)
                .into_iter()
                .filter(|host| !self.index.contains_host(host))
                .collect()
        };

        for host in removed {
            self.store.delete(&host);
            info!(ingress = %key, host = %host, "Removed");
        }
    }

    fn finish_relist(&mut self) {
        let index = self.relist.take().unwrap_or_default();
        let target = self.target.to_string();
        let records: HashMap<String, String> = index
            .hosts()
            .map(|host| (host.clone(), target.clone()))
            .collect();

        let before: BTreeSet<String> = self.store.hostnames().into_iter().collect();
        let after: BTreeSet<String> = records.keys().cloned().collect();
        for host in before.difference(&after) {
            info!(host = %host, "Removed (not present after relist)");
        }
        for host in after.difference(&before) {
            info!(host = %host, address = %target, "Added");
        }

        self.store.replace_all(records);
        self.index = index;
        metrics::record_reconciliation();
        info!(
            ingresses = self.index.ingress_count(),
            hosts = self.store.len(),
            "Ingress relist complete, record store reconciled"
        );
    }
}

/// Verify the Ingress API is reachable with the loaded credentials.
///
/// Performs one cluster-wide `list` with a page size of one, then opens a
/// short watch from the returned resource version, so that both verbs the
/// watch loop depends on are checked. This is the only watcher failure that is
/// fatal: once the watch loop runs, errors are retried.
///
/// # Errors
///
/// Returns [`StartupError::InitialWatch`] if either call is rejected.
pub async fn check_ingress_access(client: &Client) -> Result<(), StartupError> {
    let api: Api<Ingress> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default().limit(PREFLIGHT_LIST_LIMIT))
        .await
        .map_err(|source| StartupError::InitialWatch { source })?;
    debug!(
        returned = list.items.len(),
        "Ingress API reachable, cluster-wide list permitted"
    );

    let version = list
        .metadata
        .resource_version
        .unwrap_or_else(|| "0".to_string());
    let params = WatchParams::default().timeout(PREFLIGHT_WATCH_TIMEOUT_SECS);
    let stream = api
        .watch(&params, &version)
        .await
        .map_err(|source| StartupError::InitialWatch { source })?;
    let mut stream = std::pin::pin!(stream);

    // A rejected watch arrives as a Status body on the first line.
    let grace = Duration::from_secs(u64::from(PREFLIGHT_WATCH_TIMEOUT_SECS) + 1);
    match tokio::time::timeout(grace, stream.next()).await {
        Ok(Some(Err(source))) => return Err(StartupError::InitialWatch { source }),
        Ok(Some(Ok(WatchEvent::Error(status)))) => {
            return Err(StartupError::InitialWatch {
                source: kube::Error::Api(status),
            })
        }
        Ok(Some(Ok(_)) | None) | Err(_) => {}
    }
    debug!(resource_version = %version, "Cluster-wide Ingress watch permitted");
    Ok(())
}

#[cfg(test)]
#[path = "ingress_watcher_tests.rs"]
mod ingress_watcher_tests;
