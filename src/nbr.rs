//! The neighbor cache.
//!
//! Each entry runs the RFC 4861 reachability state machine; the periodic
//! driver advances the timers. Cross-table concerns (eviction cascades,
//! garbage collectibility) live on [`Interface`](crate::Interface), since
//! they need the registration and default router lists.

use crate::config::NBR_NB;
use crate::table::{scan, PoolEntry, Scan};
use crate::time::{Ticks, Timer};
use sixlo_types::LinkLayerAddr;
use std::net::Ipv6Addr;

/// Reachability state of a neighbor cache entry (RFC 4861 §7.3.2).
///
/// Hosts never create INCOMPLETE entries: with 6LoWPAN-ND address resolution
/// the link-layer address always arrives with the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborState {
    Incomplete,
    Reachable,
    Stale,
    Delay,
    Probe,
}

/// Slot handle into the neighbor cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NbrHandle(pub(crate) usize);

/// A neighbor cache entry.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub(crate) in_use: bool,
    pub ipaddr: Ipv6Addr,
    pub lladdr: Option<LinkLayerAddr>,
    pub state: NeighborState,
    pub is_router: bool,
    /// Reachability timer; doubles as the DELAY countdown.
    pub reachable: Timer,
    /// Retransmission timer for outstanding solicitations.
    pub send_ns: Timer,
    pub ns_count: u8,
    /// Timestamp for LRU eviction only.
    pub last_lookup: Ticks,
}

impl Neighbor {
    pub(crate) const EMPTY: Neighbor = Neighbor {
        in_use: false,
        ipaddr: Ipv6Addr::UNSPECIFIED,
        lladdr: None,
        state: NeighborState::Incomplete,
        is_router: false,
        reachable: Timer::EXPIRED,
        send_ns: Timer::EXPIRED,
        ns_count: 0,
        last_lookup: 0,
    };
}

impl PoolEntry for Neighbor {
    fn in_use(&self) -> bool {
        self.in_use
    }
    fn ipaddr(&self) -> Ipv6Addr {
        self.ipaddr
    }
}

/// The neighbor cache pool.
#[derive(Debug)]
pub struct NeighborCache {
    pub(crate) entries: [Neighbor; NBR_NB],
}

impl NeighborCache {
    pub fn new() -> NeighborCache {
        NeighborCache {
            entries: [Neighbor::EMPTY; NBR_NB],
        }
    }

    /// Fills the first free slot. Returns `None` when the cache is full or
    /// the address is already cached; eviction is the caller's business.
    pub(crate) fn add_entry(
        &mut self,
        now: Ticks,
        ipaddr: Ipv6Addr,
        lladdr: Option<LinkLayerAddr>,
        is_router: bool,
        state: NeighborState,
    ) -> Option<NbrHandle> {
        let Scan::FreeSpace(slot) = scan(&self.entries, ipaddr, 128) else {
            return None;
        };
        let entry = &mut self.entries[slot];
        entry.in_use = true;
        entry.ipaddr = ipaddr;
        entry.lladdr = lladdr;
        entry.is_router = is_router;
        entry.state = state;
        // timers are armed separately, start out expired
        entry.reachable = Timer::set(now, 0);
        entry.send_ns = Timer::set(now, 0);
        entry.ns_count = 0;
        entry.last_lookup = now;
        Some(NbrHandle(slot))
    }

    pub fn lookup(&self, ipaddr: Ipv6Addr) -> Option<NbrHandle> {
        match scan(&self.entries, ipaddr, 128) {
            Scan::Found(slot) => Some(NbrHandle(slot)),
            _ => None,
        }
    }

    pub fn get(&self, handle: NbrHandle) -> Option<&Neighbor> {
        self.entries.get(handle.0).filter(|n| n.in_use)
    }

    pub fn get_mut(&mut self, handle: NbrHandle) -> Option<&mut Neighbor> {
        self.entries.get_mut(handle.0).filter(|n| n.in_use)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NbrHandle, &Neighbor)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, n)| n.in_use)
            .map(|(i, n)| (NbrHandle(i), n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(low: u16) -> Ipv6Addr {
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, low)
    }

    #[test]
    fn add_lookup_roundtrip() {
        let mut cache = NeighborCache::new();
        let h = cache
            .add_entry(7, ip(1), None, true, NeighborState::Stale)
            .unwrap();
        assert_eq!(cache.lookup(ip(1)), Some(h));
        assert_eq!(cache.get(h).unwrap().last_lookup, 7);
        assert_eq!(cache.get(h).unwrap().ns_count, 0);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut cache = NeighborCache::new();
        cache
            .add_entry(0, ip(1), None, false, NeighborState::Stale)
            .unwrap();
        assert!(cache
            .add_entry(0, ip(1), None, false, NeighborState::Stale)
            .is_none());
    }

    #[test]
    fn full_cache_rejects_plain_add() {
        let mut cache = NeighborCache::new();
        for i in 0..NBR_NB as u16 {
            cache
                .add_entry(0, ip(i + 1), None, false, NeighborState::Stale)
                .unwrap();
        }
        assert!(cache
            .add_entry(0, ip(0xff), None, false, NeighborState::Stale)
            .is_none());
    }
}
