// Copyright 2023 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Per-peer retry buffer with expiry, ported from the source's `outbox.go`.
//! Holds envelopes for peers that are not currently reachable; ages them out
//! on a ticker and reports timeouts on an unbounded failure stream.

use crate::direct::Envelope;
use libp2p::PeerId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::trace;

struct Entry {
    envelope: Envelope,
    inserted_at: Instant,
}

#[derive(Default)]
struct Partitions {
    /// peer -> envelope id -> entry, awaiting delivery.
    active: HashMap<PeerId, HashMap<String, Entry>>,
    /// peer -> envelope id -> entry, already reported failed; never rescanned.
    passive: HashMap<PeerId, HashMap<String, Entry>>,
}

pub struct Outbox {
    partitions: Mutex<Partitions>,
    timeout: Duration,
    interval: Duration,
    keep: bool,
    failures: mpsc::UnboundedSender<Envelope>,
    ticker: Mutex<Option<AbortHandle>>,
}

impl Outbox {
    pub fn new(timeout: Duration, interval: Duration, keep: bool) -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<Envelope>) {
        let (failures, rx) = mpsc::unbounded_channel();
        let outbox = std::sync::Arc::new(Self {
            partitions: Mutex::new(Partitions::default()),
            timeout,
            interval,
            keep,
            failures,
            ticker: Mutex::new(None),
        });
        (outbox, rx)
    }

    /// Inserts `envelope` into the active partition for `peer_id`, rearming
    /// the expiry ticker if it had stopped.
    pub fn put(self: &std::sync::Arc<Self>, peer_id: PeerId, envelope: Envelope) {
        let id = envelope.id.clone();
        {
            let mut partitions = self.partitions.lock().expect("outbox mutex poisoned");
            partitions.active.entry(peer_id).or_default().insert(
                id,
                Entry {
                    envelope,
                    inserted_at: Instant::now(),
                },
            );
        }
        self.ensure_ticker_running();
    }

    /// Atomically removes and returns every envelope (active + passive) held
    /// for `peer_id`, in no particular order.
    pub fn pop(&self, peer_id: &PeerId) -> Vec<Envelope> {
        let mut partitions = self.partitions.lock().expect("outbox mutex poisoned");
        let mut out = Vec::new();
        if let Some(entries) = partitions.active.remove(peer_id) {
            out.extend(entries.into_values().map(|e| e.envelope));
        }
        if let Some(entries) = partitions.passive.remove(peer_id) {
            out.extend(entries.into_values().map(|e| e.envelope));
        }
        out
    }

    fn ensure_ticker_running(self: &std::sync::Arc<Self>) {
        let mut guard = self.ticker.lock().expect("outbox mutex poisoned");
        if guard.is_some() {
            return;
        }
        let outbox = self.clone();
        let handle = tokio::spawn(async move { outbox.run_ticker().await });
        *guard = Some(handle.abort_handle());
    }

    async fn run_ticker(self: std::sync::Arc<Self>) {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            interval.tick().await;
            let now = Instant::now();
            let mut expired = Vec::new();
            let mut any_active_left;
            {
                let mut partitions = self.partitions.lock().expect("outbox mutex poisoned");
                for (peer_id, entries) in partitions.active.iter_mut() {
                    let timed_out: Vec<String> = entries
                        .iter()
                        .filter(|(_, e)| now.duration_since(e.inserted_at) > self.timeout)
                        .map(|(id, _)| id.clone())
                        .collect();
                    for id in timed_out {
                        if let Some(entry) = entries.remove(&id) {
                            expired.push((*peer_id, entry));
                        }
                    }
                }
                partitions.active.retain(|_, entries| !entries.is_empty());
                if self.keep {
                    for (peer_id, entry) in &expired {
                        partitions
                            .passive
                            .entry(*peer_id)
                            .or_default()
                            .insert(entry.envelope.id.clone(), Entry {
                                envelope: entry.envelope.clone(),
                                inserted_at: entry.inserted_at,
                            });
                    }
                }
                any_active_left = !partitions.active.is_empty();
            }
            for (_, entry) in expired {
                trace!(envelope = %entry.envelope.id, "envelope expired in outbox");
                if self.failures.send(entry.envelope).is_err() {
                    any_active_left = false;
                }
            }
            if !any_active_left {
                let mut guard = self.ticker.lock().expect("outbox mutex poisoned");
                if let Some(handle) = guard.take() {
                    handle.abort();
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Contact, Payload};
    use libp2p::identity::Keypair;
    use tokio::time::sleep;

    fn peer() -> PeerId {
        Keypair::generate_ed25519().public().to_peer_id()
    }

    fn envelope(id: &str) -> Envelope {
        Envelope {
            id: id.to_string(),
            destination: Contact { id: "x".into(), name: "x".into() },
            payload: Payload::Invite(crate::entity::Invite {
                id: "c1".into(),
                name: "c".into(),
                members: vec![],
                admins: vec![],
                kind: crate::entity::ChatKind::Private,
            }),
            created_at: 0,
            protocol: crate::wire::MESSAGE_PROTOCOL,
        }
    }

    #[tokio::test]
    async fn put_then_pop_returns_the_envelope() {
        let (outbox, _failures) = Outbox::new(Duration::from_secs(60), Duration::from_millis(20), true);
        let p = peer();
        outbox.put(p, envelope("e1"));
        let popped = outbox.pop(&p);
        assert_eq!(popped.len(), 1);
        assert_eq!(popped[0].id, "e1");
        assert!(outbox.pop(&p).is_empty());
    }

    #[tokio::test]
    async fn expired_envelope_is_reported_exactly_once() {
        let (outbox, mut failures) = Outbox::new(Duration::from_millis(10), Duration::from_millis(5), true);
        let p = peer();
        outbox.put(p, envelope("e1"));
        let failed = tokio::time::timeout(Duration::from_secs(1), failures.recv())
            .await
            .expect("should report a failure before the test timeout")
            .expect("channel should not be closed");
        assert_eq!(failed.id, "e1");
        // give the ticker a chance to run once more; the passive entry must
        // never be rescanned, so no second failure should arrive.
        sleep(Duration::from_millis(30)).await;
        assert!(failures.try_recv().is_err());
    }

    #[tokio::test]
    async fn pop_drains_both_active_and_passive_partitions() {
        let (outbox, mut failures) = Outbox::new(Duration::from_millis(10), Duration::from_millis(5), true);
        let p = peer();
        outbox.put(p, envelope("e1"));
        let _ = tokio::time::timeout(Duration::from_secs(1), failures.recv()).await;
        // e1 is now in the passive partition; put a second, live envelope.
        outbox.put(p, envelope("e2"));
        let popped = outbox.pop(&p);
        let ids: Vec<_> = popped.iter().map(|e| e.id.clone()).collect();
        assert!(ids.contains(&"e1".to_string()));
        assert!(ids.contains(&"e2".to_string()));
    }
}
