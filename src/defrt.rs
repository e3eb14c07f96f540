//! The default router list.

use crate::config::DEFRT_NB;
use crate::nbr::{NeighborCache, NeighborState};
use crate::reg::RegistrationList;
use crate::table::{scan, PoolEntry, Scan};
use crate::time::{Ticks, Timer};
use std::net::Ipv6Addr;

/// Slot handle into the default router list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefrtHandle(pub(crate) usize);

/// A default router learned from a router advertisement.
#[derive(Debug, Clone, Copy)]
pub struct DefaultRouter {
    pub(crate) in_use: bool,
    pub ipaddr: Ipv6Addr,
    pub lifetime: Timer,
    pub infinite: bool,
    /// Set while a unicast RS campaign targets this router.
    pub sending_rs: bool,
    pub rs_count: u8,
    /// Number of in-use registrations naming this router.
    pub registration_count: u8,
}

impl DefaultRouter {
    const EMPTY: DefaultRouter = DefaultRouter {
        in_use: false,
        ipaddr: Ipv6Addr::UNSPECIFIED,
        lifetime: Timer::EXPIRED,
        infinite: false,
        sending_rs: false,
        rs_count: 0,
        registration_count: 0,
    };
}

impl PoolEntry for DefaultRouter {
    fn in_use(&self) -> bool {
        self.in_use
    }
    fn ipaddr(&self) -> Ipv6Addr {
        self.ipaddr
    }
}

/// The default router pool.
#[derive(Debug)]
pub struct DefaultRouterList {
    pub(crate) entries: [DefaultRouter; DEFRT_NB],
}

impl DefaultRouterList {
    pub fn new() -> DefaultRouterList {
        DefaultRouterList {
            entries: [DefaultRouter::EMPTY; DEFRT_NB],
        }
    }

    /// Records a router. A `lifetime_secs` of zero means infinite.
    pub fn add(&mut self, now: Ticks, ipaddr: Ipv6Addr, lifetime_secs: u32) -> Option<DefrtHandle> {
        let Scan::FreeSpace(slot) = scan(&self.entries, ipaddr, 128) else {
            return None;
        };
        let entry = &mut self.entries[slot];
        entry.in_use = true;
        entry.ipaddr = ipaddr;
        entry.sending_rs = false;
        entry.rs_count = 0;
        entry.registration_count = 0;
        entry.infinite = lifetime_secs == 0;
        if !entry.infinite {
            entry.lifetime = Timer::set_secs(now, lifetime_secs);
        }
        log::debug!(target: "sixlo/defrt", "added default router {}", ipaddr);
        Some(DefrtHandle(slot))
    }

    /// Clears the slot. Registrations pointing at the router are the caller's
    /// concern; [`Interface::defrt_remove`](crate::Interface::defrt_remove)
    /// runs the full cascade.
    pub(crate) fn remove(&mut self, handle: DefrtHandle) {
        self.entries[handle.0].in_use = false;
    }

    pub fn lookup(&self, ipaddr: Ipv6Addr) -> Option<DefrtHandle> {
        match scan(&self.entries, ipaddr, 128) {
            Scan::Found(slot) => Some(DefrtHandle(slot)),
            _ => None,
        }
    }

    pub fn get(&self, handle: DefrtHandle) -> Option<&DefaultRouter> {
        self.entries.get(handle.0).filter(|r| r.in_use)
    }

    pub fn get_mut(&mut self, handle: DefrtHandle) -> Option<&mut DefaultRouter> {
        self.entries.get_mut(handle.0).filter(|r| r.in_use)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DefrtHandle, &DefaultRouter)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, r)| r.in_use)
            .map(|(i, r)| (DefrtHandle(i), r))
    }

    /// `registration_count` with a not-in-use guard.
    pub fn registrations(&self, handle: DefrtHandle) -> u8 {
        self.get(handle).map_or(0, |r| r.registration_count)
    }

    /// Picks a default router, preferring one whose neighbor cache entry
    /// exists and is past address resolution. Pool order breaks ties.
    pub fn choose(&self, nbrs: &NeighborCache) -> Option<Ipv6Addr> {
        let mut fallback = None;
        for (_, router) in self.iter() {
            match nbrs.lookup(router.ipaddr).and_then(|h| nbrs.get(h)) {
                Some(nbr) if nbr.state != NeighborState::Incomplete => {
                    return Some(router.ipaddr);
                }
                _ => {
                    if fallback.is_none() {
                        fallback = Some(router.ipaddr);
                    }
                }
            }
        }
        fallback
    }

    /// The router with the fewest registrations among those the address is
    /// not yet registered with. Exits early on a router with none.
    pub fn choose_min_registrations(
        &self,
        addr: crate::addr::AddrHandle,
        regs: &RegistrationList,
    ) -> Option<DefrtHandle> {
        let mut min = 0;
        let mut min_defrt = None;
        for (handle, router) in self.iter() {
            if regs.lookup(addr, handle).is_some() {
                continue;
            }
            if min_defrt.is_none() || router.registration_count < min {
                min_defrt = Some(handle);
                min = router.registration_count;
                if min == 0 {
                    break;
                }
            }
        }
        min_defrt
    }
}
