// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! UDP server loop.
//!
//! Binds one UDP socket and answers each datagram independently: decode,
//! [`respond`], encode, send back to the origin. Every datagram is handled on
//! its own task so a slow send never delays the next receive.

use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::constants::{RECV_ERROR_BACKOFF_MILLIS, UDP_RECV_BUFFER_SIZE};
use crate::errors::StartupError;
use crate::metrics;
use crate::query_responder::{encode_response, respond};
use crate::record_store::RecordStore;

/// DNS server answering from a [`RecordStore`].
pub struct DnsServer {
    socket: Arc<UdpSocket>,
    store: RecordStore,
}

impl DnsServer {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Bind`] if the socket cannot be bound (port in
    /// use, insufficient privilege). There is no fallback transport.
    pub async fn bind(addr: SocketAddr, store: RecordStore) -> Result<Self, StartupError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;
        Ok(Self {
            socket: Arc::new(socket),
            store,
        })
    }

    /// Address the socket is bound to (useful when binding port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot report the local address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve until the future is dropped.
    ///
    /// Receive errors are logged and the loop continues after a short pause.
    pub async fn run(self) {
        match self.socket.local_addr() {
            Ok(addr) => info!(%addr, "DNS server listening (udp)"),
            Err(e) => warn!(error = %e, "DNS server listening, local address unavailable"),
        }

        let mut buf = vec![0u8; UDP_RECV_BUFFER_SIZE];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    pause_after_recv_error(&e).await;
                    continue;
                }
            };

            let datagram = buf[..len].to_vec();
            let socket = Arc::clone(&self.socket);
            let store = self.store.clone();
            tokio::spawn(async move {
                handle_datagram(&socket, &store, &datagram, peer).await;
            });
        }
    }
}

/// Log a receive failure and wait before the next `recv_from`.
async fn pause_after_recv_error(error: &std::io::Error) {
    warn!(
        error = %error,
        retry_in_ms = RECV_ERROR_BACKOFF_MILLIS,
        "Failed to receive datagram"
    );
    tokio::time::sleep(Duration::from_millis(RECV_ERROR_BACKOFF_MILLIS)).await;
}

/// Answer one datagram. Undecodable input is dropped without a reply.
async fn handle_datagram(socket: &UdpSocket, store: &RecordStore, datagram: &[u8], peer: SocketAddr) {
    let started = Instant::now();

    let request = match Message::from_vec(datagram) {
        Ok(request) => request,
        Err(e) => {
            metrics::record_malformed_datagram();
            debug!(%peer, bytes = datagram.len(), error = %e, "Dropping undecodable datagram");
            return;
        }
    };

    let response = respond(&request, store);
    let bytes = match encode_response(&response) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%peer, id = request.id(), error = %e, "Failed to encode response");
            return;
        }
    };
    metrics::record_query_duration(started.elapsed());

    if let Err(e) = socket.send_to(&bytes, peer).await {
        warn!(%peer, id = request.id(), error = %e, "Failed to send response");
    } else {
        debug!(%peer, id = request.id(), answers = response.answers().len(), "Response sent");
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
