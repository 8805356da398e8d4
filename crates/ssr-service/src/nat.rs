//! UDP NAT table (`spec.md` §4.9 "UDP NAT", §8 "NAT idle eviction").
//! Keyed by the client address string; each entry owns an upstream
//! socket and a reader task that is evicted on idle timeout or error.
//!
//! Grounded on `examples/original_source/utils/netx/netx.go` (per-peer
//! upstream reader with a read-deadline-as-idle-timeout) generalized to
//! `tokio::time::timeout` since the core uses async sockets rather than
//! blocking `net.Conn` deadlines.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::net::UdpSocket;
use tokio::sync::RwLock;

use crate::copy::spawn_guarded;

/// `peer address string -> upstream socket`, guarded by a reader-writer
/// lock since lookups vastly outnumber insert/evict (`spec.md` §5).
#[derive(Default)]
pub struct NatTable {
    entries: RwLock<HashMap<String, Arc<UdpSocket>>>,
}

impl NatTable {
    pub fn new() -> NatTable {
        NatTable::default()
    }

    pub async fn get(&self, peer: &str) -> Option<Arc<UdpSocket>> {
        self.entries.read().await.get(peer).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Register `peer -> upstream` and spawn a reader that forwards every
    /// inbound datagram on `upstream` back to `peer` via `downstream`,
    /// prepending the SOCKS-style source address header. The reader
    /// evicts the entry (and drops the upstream socket) on idle timeout
    /// or read error.
    ///
    /// Idempotent per peer: if an entry for `peer` already exists, it is
    /// returned unchanged and `upstream` is dropped without ever being
    /// registered or read from — multiple datagrams from the same peer
    /// must resolve to exactly one NAT entry (`spec.md` §8 scenario 5).
    pub async fn add(self: &Arc<Self>, peer: String, peer_addr: SocketAddr, upstream: Arc<UdpSocket>, downstream: Arc<UdpSocket>, idle_timeout: Duration) -> Arc<UdpSocket> {
        {
            let mut entries = self.entries.write().await;
            if let Some(existing) = entries.get(&peer) {
                return existing.clone();
            }
            entries.insert(peer.clone(), upstream.clone());
        }

        let table = self.clone();
        let registered = upstream.clone();
        spawn_guarded(async move {
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let read = tokio::time::timeout(idle_timeout, upstream.recv_from(&mut buf)).await;
                let (n, from) = match read {
                    Ok(Ok(pair)) => pair,
                    Ok(Err(e)) => {
                        warn!("NAT entry {peer} upstream read error: {e}");
                        break;
                    }
                    Err(_elapsed) => {
                        debug!("NAT entry {peer} idle for {idle_timeout:?}, evicting");
                        break;
                    }
                };

                let mut framed = Vec::with_capacity(n + 7);
                ssr_protocol::socks::Address::SocketAddr(from).write_to(&mut framed);
                framed.extend_from_slice(&buf[..n]);

                if let Err(e) = downstream.send_to(&framed, peer_addr).await {
                    warn!("NAT entry {peer} downstream write error: {e}");
                    break;
                }
            }
            table.entries.write().await.remove(&peer);
            Ok(0)
        });

        registered
    }
}
