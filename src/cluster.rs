// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes credential loading and client construction.
//!
//! Resolution order for credentials:
//! 1. `--kubeconfig <PATH>` if given
//! 2. `$HOME/.kube/config` if it exists
//! 3. `kube`'s own inference (`KUBECONFIG`, then in-cluster service account)

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::KUBECONFIG_HOME_RELATIVE_PATH;
use crate::errors::StartupError;

/// `$HOME/.kube/config`, if `HOME` is set.
#[must_use]
pub fn home_kubeconfig_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(KUBECONFIG_HOME_RELATIVE_PATH))
}

/// Pick the kubeconfig file to load, if any.
///
/// An explicit path is always used, even if it does not exist, so that a typo
/// surfaces as a load error instead of silently falling back.
#[must_use]
pub fn resolve_kubeconfig_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| home_kubeconfig_path().filter(|path| path.is_file()))
}

/// Build a client configuration from a kubeconfig file, or infer one.
///
/// # Errors
///
/// Returns [`StartupError::KubeconfigRead`] if the file cannot be read or
/// parsed, and [`StartupError::ClientConfig`] if it has no usable context.
pub async fn load_client_config(kubeconfig: Option<&Path>) -> Result<Config, StartupError> {
    let Some(path) = kubeconfig else {
        debug!("No kubeconfig file found, inferring configuration from environment");
        return Config::infer()
            .await
            .map_err(|e| StartupError::ClientConfig {
                origin: "environment".to_string(),
                reason: e.to_string(),
            });
    };

    debug!(path = %path.display(), "Loading kubeconfig");
    let kubeconfig = Kubeconfig::read_from(path).map_err(|source| StartupError::KubeconfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| StartupError::ClientConfig {
            origin: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Load credentials and construct the Kubernetes client.
///
/// # Errors
///
/// Returns any [`load_client_config`] error, or [`StartupError::ClientBuild`]
/// if the client cannot be constructed.
pub async fn build_client(kubeconfig: Option<&Path>) -> Result<Client, StartupError> {
    let config = load_client_config(kubeconfig).await?;
    debug!(cluster_url = %config.cluster_url, "Kubernetes client configuration loaded");
    Client::try_from(config).map_err(|source| StartupError::ClientBuild { source })
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
