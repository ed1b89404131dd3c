// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line interface.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::constants::{DEFAULT_DNS_PORT, DEFAULT_LISTEN_ADDR, DEFAULT_TARGET_ADDR};

/// Resolve every Kubernetes Ingress host to a local address.
#[derive(Parser, Debug, Clone)]
#[command(name = "ingress-dns", version)]
#[command(about = "DNS server that resolves Kubernetes Ingress hosts to a fixed local address", long_about = None)]
pub struct Args {
    /// (optional) absolute path to the kubeconfig file [default: $HOME/.kube/config]
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Address to listen on for DNS queries
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: IpAddr,

    /// UDP port to listen on for DNS queries
    #[arg(short, long, default_value_t = DEFAULT_DNS_PORT)]
    pub port: u16,

    /// Address every Ingress host resolves to
    #[arg(long, default_value_t = DEFAULT_TARGET_ADDR)]
    pub target_address: Ipv4Addr,

    /// Serve Prometheus metrics and a health check on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Args {
    /// Socket address the DNS listener binds.
    #[must_use]
    pub fn dns_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }
}
