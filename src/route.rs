//! The longest-prefix-match routing table.

use crate::config::ROUTE_NB;
use crate::table::{scan, PoolEntry, Scan};
use sixlo_types::Ipv6AddrExt;
use std::net::Ipv6Addr;

/// Slot handle into the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteHandle(pub(crate) usize);

/// Per-route state owned by the routing protocol. The core never interprets
/// it; it travels with the slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteState {
    pub lifetime: u32,
    pub saved_lifetime: u32,
    pub learned_from: u8,
}

/// A routing table entry.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub(crate) in_use: bool,
    pub ipaddr: Ipv6Addr,
    pub length: u8,
    pub metric: u8,
    pub next_hop: Ipv6Addr,
    pub state: RouteState,
}

impl Route {
    const EMPTY: Route = Route {
        in_use: false,
        ipaddr: Ipv6Addr::UNSPECIFIED,
        length: 0,
        metric: 0,
        next_hop: Ipv6Addr::UNSPECIFIED,
        state: RouteState {
            lifetime: 0,
            saved_lifetime: 0,
            learned_from: 0,
        },
    };
}

impl PoolEntry for Route {
    fn in_use(&self) -> bool {
        self.in_use
    }
    fn ipaddr(&self) -> Ipv6Addr {
        self.ipaddr
    }
}

/// The routing table pool.
#[derive(Debug)]
pub struct RoutingTable {
    pub(crate) entries: [Route; ROUTE_NB],
}

impl RoutingTable {
    pub fn new() -> RoutingTable {
        RoutingTable {
            entries: [Route::EMPTY; ROUTE_NB],
        }
    }

    /// Adds a route, overwriting next hop and metric when the destination
    /// prefix is already present.
    pub fn add(
        &mut self,
        ipaddr: Ipv6Addr,
        length: u8,
        next_hop: Ipv6Addr,
        metric: u8,
    ) -> Option<RouteHandle> {
        let slot = match scan(&self.entries, ipaddr, length) {
            Scan::Found(slot) | Scan::FreeSpace(slot) => slot,
            Scan::NoSpace => return None,
        };
        let entry = &mut self.entries[slot];
        if !entry.in_use {
            entry.in_use = true;
            entry.ipaddr = ipaddr;
            entry.length = length;
            entry.state = RouteState::default();
        }
        entry.next_hop = next_hop;
        entry.metric = metric;
        log::debug!(target: "sixlo/route", "route {}/{} via {}", ipaddr, length, next_hop);
        Some(RouteHandle(slot))
    }

    pub fn remove(&mut self, handle: RouteHandle) {
        self.entries[handle.0].in_use = false;
    }

    /// Clears every route whose next hop equals `next_hop`.
    pub fn remove_by_next_hop(&mut self, next_hop: Ipv6Addr) {
        for entry in self.entries.iter_mut() {
            if entry.in_use && entry.next_hop == next_hop {
                entry.in_use = false;
            }
        }
    }

    /// Longest-prefix match; among equal lengths the first entry wins.
    pub fn lookup(&self, dst: Ipv6Addr) -> Option<RouteHandle> {
        let mut best: Option<(usize, u8)> = None;
        for (slot, route) in self.entries.iter().enumerate() {
            if !route.in_use || !dst.matches_prefix(route.ipaddr, route.length) {
                continue;
            }
            if best.map_or(true, |(_, len)| route.length > len) {
                best = Some((slot, route.length));
            }
        }
        best.map(|(slot, _)| RouteHandle(slot))
    }

    pub fn get(&self, handle: RouteHandle) -> Option<&Route> {
        self.entries.get(handle.0).filter(|r| r.in_use)
    }

    pub fn get_mut(&mut self, handle: RouteHandle) -> Option<&mut Route> {
        self.entries.get_mut(handle.0).filter(|r| r.in_use)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouteHandle, &Route)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, r)| r.in_use)
            .map(|(i, r)| (RouteHandle(i), r))
    }
}
