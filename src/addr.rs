//! Shared addressing types used by [`crate::peerset`], [`crate::host`] and the
//! dispatch services. Kept in their own module so `peerset` does not need to
//! depend on `host`.

use libp2p::{Multiaddr, PeerId};

/// A peer id plus the multiaddrs known for reaching it — the `peer.AddrInfo`
/// equivalent from the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddrInfo {
    pub id: PeerId,
    pub addrs: Vec<Multiaddr>,
}

impl AddrInfo {
    pub fn new(id: PeerId, addrs: Vec<Multiaddr>) -> Self {
        Self { id, addrs }
    }

    /// An `AddrInfo` with no known addresses — valid for a peer only reachable
    /// via circuit relay or DHT-resolved addresses added later.
    pub fn bare(id: PeerId) -> Self {
        Self { id, addrs: Vec::new() }
    }
}
