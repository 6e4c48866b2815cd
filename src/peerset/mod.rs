//! Indexed set of peers demanded by one or more named *processes*, with
//! per-peer backoff state. Ported from the source's `PeerSet` (`peerset.go`):
//! a single mutex guarding a `HashMap<PeerId, Info>`, with reference-counted
//! demand and a `Turn`/`Done`/`Failed`/`Force` state machine that the
//! [`crate::connector::Connector`] drives on a timer.

mod backoff;

pub use backoff::PolynomialBackoff;

use crate::addr::AddrInfo;
use libp2p::PeerId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

struct PeerRecord {
    addr_info: AddrInfo,
    process: HashMap<String, u32>,
    done: bool,
    working: bool,
    next_try: Instant,
    backoff: PolynomialBackoff,
}

/// Demand-driven peer registry. All operations are synchronous and hold the
/// internal mutex for their whole duration; none of them do I/O, so the lock
/// is never held across an `.await`.
#[derive(Default)]
pub struct PeerSet {
    set: Mutex<HashMap<PeerId, PeerRecord>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self {
            set: Mutex::new(HashMap::new()),
        }
    }

    /// Registers demand for `addr_info.id` under `process`. Idempotent: a second
    /// `add` for the same process increments a refcount rather than duplicating state.
    pub fn add(&self, process: &str, addr_info: AddrInfo) {
        let mut set = self.set.lock().expect("peerset mutex poisoned");
        match set.get_mut(&addr_info.id) {
            Some(record) => {
                *record.process.entry(process.to_string()).or_insert(0) += 1;
            }
            None => {
                let mut process_map = HashMap::new();
                process_map.insert(process.to_string(), 1);
                set.insert(
                    addr_info.id,
                    PeerRecord {
                        addr_info,
                        process: process_map,
                        done: false,
                        working: false,
                        next_try: Instant::now(),
                        backoff: PolynomialBackoff::new(),
                    },
                );
            }
        }
    }

    /// Releases one unit of demand from `process` for `peer_id`. Removes the peer
    /// entirely once no process still needs it. A no-op if the peer or process is
    /// already absent.
    pub fn remove(&self, process: &str, peer_id: &PeerId) {
        let mut set = self.set.lock().expect("peerset mutex poisoned");
        let Some(record) = set.get_mut(peer_id) else {
            return;
        };
        if let Some(count) = record.process.get_mut(process) {
            if *count > 1 {
                *count -= 1;
            } else {
                record.process.remove(process);
            }
        }
        if record.process.is_empty() {
            set.remove(peer_id);
        }
    }

    /// Returns every peer whose `next_try` has elapsed and that is neither
    /// `done` nor already `working`, atomically marking each returned peer
    /// `working = true` so a concurrent `turn` cannot also pick it up.
    pub fn turn(&self, now: Instant) -> Vec<AddrInfo> {
        let mut set = self.set.lock().expect("peerset mutex poisoned");
        let mut out = Vec::new();
        for record in set.values_mut() {
            if record.next_try <= now && !record.done && !record.working {
                record.working = true;
                out.push(record.addr_info.clone());
            }
        }
        out
    }

    /// Marks a peer connected: stops retrying it and resets its backoff so a
    /// future disconnect starts the schedule fresh.
    pub fn done(&self, peer_id: &PeerId) {
        let mut set = self.set.lock().expect("peerset mutex poisoned");
        if let Some(record) = set.get_mut(peer_id) {
            record.done = true;
            record.working = false;
            record.backoff.reset();
        }
    }

    /// Marks a dial/connection attempt failed: schedules the next retry per backoff.
    pub fn failed(&self, peer_id: &PeerId) {
        let mut set = self.set.lock().expect("peerset mutex poisoned");
        if let Some(record) = set.get_mut(peer_id) {
            record.done = false;
            record.working = false;
            record.next_try = Instant::now() + record.backoff.delay();
        }
    }

    /// Forces a peer out of contention for the next `turn` without marking it done —
    /// used right after `add` so the caller's own immediate dial attempt isn't raced
    /// by the background ticker.
    pub fn force(&self, peer_id: &PeerId) {
        let mut set = self.set.lock().expect("peerset mutex poisoned");
        if let Some(record) = set.get_mut(peer_id) {
            record.done = false;
            record.working = true;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.lock().expect("peerset mutex poisoned").is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p::identity::Keypair;

    fn rand_peer() -> AddrInfo {
        AddrInfo::bare(Keypair::generate_ed25519().public().to_peer_id())
    }

    #[test]
    fn add_and_remove_are_refcounted() {
        let ps = PeerSet::new();
        let peer = rand_peer();
        ps.add("x", peer.clone());
        ps.add("x", peer.clone());
        assert!(!ps.is_empty());
        ps.remove("x", &peer.id);
        assert!(!ps.is_empty());
        ps.remove("x", &peer.id);
        assert!(ps.is_empty());
    }

    #[test]
    fn remove_is_idempotent_once_peer_is_gone() {
        let ps = PeerSet::new();
        let peer = rand_peer();
        ps.add("x", peer.clone());
        ps.remove("x", &peer.id);
        ps.remove("x", &peer.id);
        assert!(ps.is_empty());
    }

    #[test]
    fn two_peers_different_processes_both_removed_before_empty() {
        let ps = PeerSet::new();
        let peer = rand_peer();
        ps.add("a", peer.clone());
        ps.add("b", peer.clone());
        ps.remove("a", &peer.id);
        assert!(!ps.is_empty());
        ps.remove("b", &peer.id);
        assert!(ps.is_empty());
    }

    #[test]
    fn turn_returns_each_peer_exactly_once_until_done_or_failed() {
        let ps = PeerSet::new();
        let peer = rand_peer();
        ps.add("x", peer.clone());
        let now = Instant::now();
        let first = ps.turn(now);
        assert_eq!(first.len(), 1);
        let second = ps.turn(now);
        assert!(second.is_empty(), "peer is `working`, must not be reselected");
    }

    #[test]
    fn failed_advances_next_try_by_at_least_the_backoff_minimum() {
        let ps = PeerSet::new();
        let peer = rand_peer();
        ps.add("x", peer.clone());
        let now = Instant::now();
        ps.turn(now);
        ps.failed(&peer.id);
        let immediate = ps.turn(now);
        assert!(immediate.is_empty(), "next_try must be in the future after a failure");
    }

    #[test]
    fn force_suppresses_next_turn() {
        let ps = PeerSet::new();
        let peer = rand_peer();
        ps.add("x", peer.clone());
        ps.done(&peer.id);
        ps.force(&peer.id);
        let now = Instant::now();
        assert!(ps.turn(now).is_empty());
    }

    #[quickcheck_macros::quickcheck]
    fn reference_counting_matches_add_remove_multiset(adds: u8, removes: u8) -> bool {
        let ps = PeerSet::new();
        let peer = rand_peer();
        for _ in 0..adds {
            ps.add("p", peer.clone());
        }
        for _ in 0..removes.min(adds) {
            ps.remove("p", &peer.id);
        }
        let expect_empty = removes >= adds;
        ps.is_empty() == expect_empty || adds == 0
    }
}
