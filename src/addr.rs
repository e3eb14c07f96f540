//! Interface-local unicast, multicast and anycast address pools.

use crate::config::{AADDR_NB, ADDR_NB, MADDR_NB};
use crate::defrt::DefrtHandle;
use crate::table::{scan, PoolEntry, Scan};
use crate::time::{Ticks, Timer};
use sixlo_types::Ipv6AddrExt;
use std::net::Ipv6Addr;

/// Autoconfiguration state of a unicast address (RFC 4862).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrState {
    Tentative,
    Preferred,
    Deprecated,
}

/// How a unicast address was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrOrigin {
    Autoconf,
    Dhcp,
    Manual,
}

/// Slot handle into the unicast address list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddrHandle(pub(crate) usize);

/// A unicast address bound to the interface.
#[derive(Debug, Clone, Copy)]
pub struct UnicastAddr {
    pub(crate) in_use: bool,
    pub ipaddr: Ipv6Addr,
    pub state: AddrState,
    pub origin: AddrOrigin,
    /// When set, the valid lifetime never expires and `vlifetime` is unarmed.
    pub infinite: bool,
    pub vlifetime: Timer,
    /// The router that advertised the prefix this address was formed from.
    pub defrt: Option<DefrtHandle>,
}

impl UnicastAddr {
    const EMPTY: UnicastAddr = UnicastAddr {
        in_use: false,
        ipaddr: Ipv6Addr::UNSPECIFIED,
        state: AddrState::Tentative,
        origin: AddrOrigin::Manual,
        infinite: true,
        vlifetime: Timer::EXPIRED,
        defrt: None,
    };
}

impl PoolEntry for UnicastAddr {
    fn in_use(&self) -> bool {
        self.in_use
    }
    fn ipaddr(&self) -> Ipv6Addr {
        self.ipaddr
    }
}

/// The unicast address list.
#[derive(Debug)]
pub struct AddrList {
    pub(crate) entries: [UnicastAddr; ADDR_NB],
}

impl AddrList {
    pub fn new() -> AddrList {
        AddrList {
            entries: [UnicastAddr::EMPTY; ADDR_NB],
        }
    }

    /// Binds an address. A `vlifetime_secs` of zero means infinite validity.
    /// Link-local addresses start out PREFERRED, everything else TENTATIVE
    /// until registration confirms it.
    pub fn add(
        &mut self,
        now: Ticks,
        ipaddr: Ipv6Addr,
        vlifetime_secs: u32,
        origin: AddrOrigin,
    ) -> Option<AddrHandle> {
        let Scan::FreeSpace(slot) = scan(&self.entries, ipaddr, 128) else {
            return None;
        };
        let entry = &mut self.entries[slot];
        entry.in_use = true;
        entry.ipaddr = ipaddr;
        entry.state = if ipaddr.is_link_local() {
            AddrState::Preferred
        } else {
            AddrState::Tentative
        };
        entry.origin = origin;
        entry.infinite = vlifetime_secs == 0;
        if !entry.infinite {
            entry.vlifetime = Timer::set_secs(now, vlifetime_secs);
        }
        entry.defrt = None;
        log::debug!(target: "sixlo/addr", "bound {} ({:?})", ipaddr, entry.state);
        Some(AddrHandle(slot))
    }

    pub fn remove(&mut self, handle: AddrHandle) {
        self.entries[handle.0].in_use = false;
    }

    pub fn lookup(&self, ipaddr: Ipv6Addr) -> Option<AddrHandle> {
        match scan(&self.entries, ipaddr, 128) {
            Scan::Found(slot) => Some(AddrHandle(slot)),
            _ => None,
        }
    }

    pub fn get(&self, handle: AddrHandle) -> Option<&UnicastAddr> {
        self.entries.get(handle.0).filter(|a| a.in_use)
    }

    pub fn get_mut(&mut self, handle: AddrHandle) -> Option<&mut UnicastAddr> {
        self.entries.get_mut(handle.0).filter(|a| a.in_use)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AddrHandle, &UnicastAddr)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, a)| a.in_use)
            .map(|(i, a)| (AddrHandle(i), a))
    }

    /// First link-local address, optionally restricted to a state.
    pub fn link_local(&self, state: Option<AddrState>) -> Option<AddrHandle> {
        self.iter()
            .find(|(_, a)| a.ipaddr.is_link_local() && state.map_or(true, |s| a.state == s))
            .map(|(h, _)| h)
    }

    /// First non-link-local address, optionally restricted to a state.
    pub fn global(&self, state: Option<AddrState>) -> Option<AddrHandle> {
        self.iter()
            .find(|(_, a)| !a.ipaddr.is_link_local() && state.map_or(true, |s| a.state == s))
            .map(|(h, _)| h)
    }

    /// RFC 3484-style source selection: the preferred link-local address for
    /// link-local or multicast destinations, otherwise the preferred global
    /// address with the longest common prefix. Falls back to `::`.
    pub fn select_src(&self, dst: Ipv6Addr) -> Ipv6Addr {
        let chosen = if !dst.is_link_local() && !dst.is_multicast() {
            let mut best = 0;
            let mut matched = None;
            for (_, addr) in self.iter() {
                if addr.state != AddrState::Preferred || addr.ipaddr.is_link_local() {
                    continue;
                }
                let n = addr.ipaddr.common_prefix_length(dst);
                if n >= best {
                    best = n;
                    matched = Some(addr.ipaddr);
                }
            }
            matched
        } else {
            self.link_local(Some(AddrState::Preferred))
                .and_then(|h| self.get(h))
                .map(|a| a.ipaddr)
        };
        chosen.unwrap_or(Ipv6Addr::UNSPECIFIED)
    }
}

/// A multicast group membership.
#[derive(Debug, Clone, Copy)]
pub struct MulticastAddr {
    pub(crate) in_use: bool,
    pub ipaddr: Ipv6Addr,
}

impl PoolEntry for MulticastAddr {
    fn in_use(&self) -> bool {
        self.in_use
    }
    fn ipaddr(&self) -> Ipv6Addr {
        self.ipaddr
    }
}

/// The multicast address list.
#[derive(Debug)]
pub struct MulticastList {
    pub(crate) entries: [MulticastAddr; MADDR_NB],
}

impl MulticastList {
    pub fn new() -> MulticastList {
        MulticastList {
            entries: [MulticastAddr {
                in_use: false,
                ipaddr: Ipv6Addr::UNSPECIFIED,
            }; MADDR_NB],
        }
    }

    pub fn add(&mut self, ipaddr: Ipv6Addr) -> bool {
        match scan(&self.entries, ipaddr, 128) {
            Scan::FreeSpace(slot) => {
                self.entries[slot] = MulticastAddr { in_use: true, ipaddr };
                true
            }
            Scan::Found(_) => true,
            Scan::NoSpace => false,
        }
    }

    pub fn remove(&mut self, ipaddr: Ipv6Addr) {
        if let Scan::Found(slot) = scan(&self.entries, ipaddr, 128) {
            self.entries[slot].in_use = false;
        }
    }

    pub fn contains(&self, ipaddr: Ipv6Addr) -> bool {
        matches!(scan(&self.entries, ipaddr, 128), Scan::Found(_))
    }
}

/// An anycast address binding.
#[derive(Debug, Clone, Copy)]
pub struct AnycastAddr {
    pub(crate) in_use: bool,
    pub ipaddr: Ipv6Addr,
}

impl PoolEntry for AnycastAddr {
    fn in_use(&self) -> bool {
        self.in_use
    }
    fn ipaddr(&self) -> Ipv6Addr {
        self.ipaddr
    }
}

/// The anycast address list.
#[derive(Debug)]
pub struct AnycastList {
    pub(crate) entries: [AnycastAddr; AADDR_NB],
}

impl AnycastList {
    pub fn new() -> AnycastList {
        AnycastList {
            entries: [AnycastAddr {
                in_use: false,
                ipaddr: Ipv6Addr::UNSPECIFIED,
            }; AADDR_NB],
        }
    }

    pub fn add(&mut self, ipaddr: Ipv6Addr) -> bool {
        match scan(&self.entries, ipaddr, 128) {
            Scan::FreeSpace(slot) => {
                self.entries[slot] = AnycastAddr { in_use: true, ipaddr };
                true
            }
            Scan::Found(_) => true,
            Scan::NoSpace => false,
        }
    }

    pub fn remove(&mut self, ipaddr: Ipv6Addr) {
        if let Scan::Found(slot) = scan(&self.entries, ipaddr, 128) {
            self.entries[slot].in_use = false;
        }
    }

    pub fn contains(&self, ipaddr: Ipv6Addr) -> bool {
        matches!(scan(&self.entries, ipaddr, 128), Scan::Found(_))
    }
}
