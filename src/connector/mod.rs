// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Demand-driven connection maintainer. Keeps every peer any process still
//! needs dialed, retrying on a backoff schedule, without blocking callers —
//! ported from the source's `connector.go`, which pairs a `PeerSet` with a
//! single background goroutine woken on a ticker.

use crate::addr::AddrInfo;
use crate::host::Host;
use crate::peerset::PeerSet;
use libp2p::PeerId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{trace, warn};

const TAG_PREFIX: &str = "connector:";

/// Keeps the peers any process still `need`s connected. Cheap to clone.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<Inner>,
}

struct Inner {
    host: Host,
    peer_set: PeerSet,
    tick: Duration,
    background: Mutex<Option<AbortHandle>>,
}

impl Connector {
    pub fn new(host: Host, tick: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                peer_set: PeerSet::new(),
                tick,
                background: Mutex::new(None),
            }),
        }
    }

    /// Registers demand for `addr_info.id` under `process`: protects the
    /// connection, adds it to the peer set, forces it out of the next `turn`
    /// (so this call's own dial below isn't raced), starts the background
    /// loop if it was idle, and kicks off a non-blocking dial attempt.
    pub async fn need(&self, process: &str, addr_info: AddrInfo) {
        self.inner.host.protect(addr_info.id, &format!("{TAG_PREFIX}{process}"));
        self.inner.peer_set.add(process, addr_info.clone());
        self.inner.peer_set.force(&addr_info.id);
        self.ensure_background_running().await;

        let connector = self.clone();
        tokio::spawn(async move {
            if let Err(e) = connector.inner.host.dial(addr_info.clone()).await {
                trace!(peer = %addr_info.id, error = %e, "immediate dial failed, backoff will retry");
                connector.inner.peer_set.failed(&addr_info.id);
            }
        });
    }

    pub fn done(&self, process: &str, peer_id: &PeerId) {
        self.inner.host.unprotect(*peer_id, &format!("{TAG_PREFIX}{process}"));
        self.inner.peer_set.remove(process, peer_id);
    }

    async fn ensure_background_running(&self) {
        let mut guard = self.inner.background.lock().await;
        if guard.is_some() {
            return;
        }
        let connector = self.clone();
        let handle = tokio::spawn(async move { connector.run_background_loop().await });
        *guard = Some(handle.abort_handle());
    }

    async fn run_background_loop(&self) {
        let mut interval = tokio::time::interval(self.inner.tick);
        loop {
            interval.tick().await;
            let due = self.inner.peer_set.turn(Instant::now());
            for addr_info in due {
                if self.inner.host.is_connected(addr_info.id).await {
                    self.inner.peer_set.done(&addr_info.id);
                    continue;
                }
                let connector = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = connector.inner.host.dial(addr_info.clone()).await {
                        warn!(peer = %addr_info.id, error = %e, "dial attempt failed");
                        connector.inner.peer_set.failed(&addr_info.id);
                    }
                });
            }
            if self.inner.peer_set.is_empty() {
                let mut guard = self.inner.background.lock().await;
                if let Some(handle) = guard.take() {
                    handle.abort();
                }
                return;
            }
        }
    }

    /// Marks a peer connected, stopping its retry schedule. Called from the
    /// host connectivity subscription owned by whichever service wires up
    /// `Host::subscribe_connectivity`.
    pub fn on_connected(&self, peer_id: &PeerId) {
        self.inner.peer_set.done(peer_id);
    }

    pub fn on_disconnected(&self, peer_id: &PeerId) {
        self.inner.peer_set.failed(peer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_prefix_is_stable() {
        assert_eq!(format!("{TAG_PREFIX}chat.message"), "connector:chat.message");
    }
}
