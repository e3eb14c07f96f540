//! The prefix list.
//!
//! Hosts track prefixes learned from router advertisements with their valid
//! lifetimes; routers track the prefixes they advertise themselves. Per
//! 6LoWPAN-ND a host treats every prefix except link-local as off-link.

use crate::config::PREFIX_NB;
use crate::table::{scan, PoolEntry, Scan};
#[cfg(not(feature = "router"))]
use crate::{
    defrt::DefrtHandle,
    time::{Ticks, Timer},
};
use sixlo_types::Ipv6AddrExt;
use std::net::Ipv6Addr;

/// Slot handle into the prefix list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrefixHandle(pub(crate) usize);

cfg_host! {
    /// A prefix learned from a router advertisement.
    #[derive(Debug, Clone, Copy)]
    pub struct Prefix {
        pub(crate) in_use: bool,
        pub ipaddr: Ipv6Addr,
        pub length: u8,
        pub infinite: bool,
        pub vlifetime: Timer,
        /// The router that advertised this prefix.
        pub defrt: Option<DefrtHandle>,
    }

    impl Prefix {
        const EMPTY: Prefix = Prefix {
            in_use: false,
            ipaddr: Ipv6Addr::UNSPECIFIED,
            length: 0,
            infinite: true,
            vlifetime: Timer::EXPIRED,
            defrt: None,
        };
    }
}

cfg_router! {
    /// On-link flag in [`Prefix::l_a_reserved`], as carried in the prefix
    /// information option.
    pub const FLAG_ON_LINK: u8 = 0b1000_0000;
    /// Autonomous address-configuration flag in [`Prefix::l_a_reserved`].
    pub const FLAG_AUTONOMOUS: u8 = 0b0100_0000;

    /// A prefix this router advertises.
    #[derive(Debug, Clone, Copy)]
    pub struct Prefix {
        pub(crate) in_use: bool,
        pub ipaddr: Ipv6Addr,
        pub length: u8,
        /// Whether the prefix is included in outgoing RAs.
        pub advertise: bool,
        /// Valid lifetime advertised, in seconds.
        pub vlifetime: u32,
        /// Preferred lifetime advertised, in seconds.
        pub plifetime: u32,
        /// On-link and autonomous flags plus six reserved bits, as they
        /// appear in the prefix information option.
        pub l_a_reserved: u8,
    }

    impl Prefix {
        const EMPTY: Prefix = Prefix {
            in_use: false,
            ipaddr: Ipv6Addr::UNSPECIFIED,
            length: 0,
            advertise: false,
            vlifetime: 0,
            plifetime: 0,
            l_a_reserved: 0,
        };
    }
}

impl PoolEntry for Prefix {
    fn in_use(&self) -> bool {
        self.in_use
    }
    fn ipaddr(&self) -> Ipv6Addr {
        self.ipaddr
    }
}

/// The prefix pool.
#[derive(Debug)]
pub struct PrefixList {
    pub(crate) entries: [Prefix; PREFIX_NB],
}

impl PrefixList {
    pub fn new() -> PrefixList {
        PrefixList {
            entries: [Prefix::EMPTY; PREFIX_NB],
        }
    }

    pub fn remove(&mut self, handle: PrefixHandle) {
        self.entries[handle.0].in_use = false;
    }

    pub fn lookup(&self, ipaddr: Ipv6Addr, length: u8) -> Option<PrefixHandle> {
        match scan(&self.entries, ipaddr, length) {
            Scan::Found(slot) => Some(PrefixHandle(slot)),
            _ => None,
        }
    }

    pub fn get(&self, handle: PrefixHandle) -> Option<&Prefix> {
        self.entries.get(handle.0).filter(|p| p.in_use)
    }

    pub fn get_mut(&mut self, handle: PrefixHandle) -> Option<&mut Prefix> {
        self.entries.get_mut(handle.0).filter(|p| p.in_use)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PrefixHandle, &Prefix)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, p)| p.in_use)
            .map(|(i, p)| (PrefixHandle(i), p))
    }
}

cfg_host! {
    impl PrefixList {
        /// Records a prefix. A `vlifetime_secs` of zero means infinite.
        pub fn add(
            &mut self,
            now: Ticks,
            ipaddr: Ipv6Addr,
            length: u8,
            vlifetime_secs: u32,
        ) -> Option<PrefixHandle> {
            let Scan::FreeSpace(slot) = scan(&self.entries, ipaddr, length) else {
                return None;
            };
            let entry = &mut self.entries[slot];
            entry.in_use = true;
            entry.ipaddr = ipaddr;
            entry.length = length;
            entry.infinite = vlifetime_secs == 0;
            if !entry.infinite {
                entry.vlifetime = Timer::set_secs(now, vlifetime_secs);
            }
            entry.defrt = None;
            log::debug!(target: "sixlo/prefix", "added prefix {}/{}", ipaddr, length);
            Some(PrefixHandle(slot))
        }

        /// Everything except link-local is off-link on a 6LoWPAN host and is
        /// reached through the default router.
        pub fn is_addr_on_link(&self, ipaddr: Ipv6Addr) -> bool {
            ipaddr.is_link_local()
        }
    }
}

cfg_router! {
    impl PrefixList {
        pub fn add(
            &mut self,
            ipaddr: Ipv6Addr,
            length: u8,
            advertise: bool,
            flags: u8,
            vlifetime_secs: u32,
            plifetime_secs: u32,
        ) -> Option<PrefixHandle> {
            let Scan::FreeSpace(slot) = scan(&self.entries, ipaddr, length) else {
                return None;
            };
            self.entries[slot] = Prefix {
                in_use: true,
                ipaddr,
                length,
                advertise,
                vlifetime: vlifetime_secs,
                plifetime: plifetime_secs,
                l_a_reserved: flags,
            };
            log::debug!(target: "sixlo/prefix", "added prefix {}/{}", ipaddr, length);
            Some(PrefixHandle(slot))
        }

        /// On a router, on-link means link-local or covered by a configured
        /// prefix whose on-link flag is set. A prefix advertised with the
        /// flag clear does not make addresses under it on-link.
        pub fn is_addr_on_link(&self, ipaddr: Ipv6Addr) -> bool {
            ipaddr.is_link_local()
                || self.iter().any(|(_, p)| {
                    p.l_a_reserved & FLAG_ON_LINK != 0
                        && ipaddr.matches_prefix(p.ipaddr, p.length)
                })
        }
    }
}

#[cfg(all(test, feature = "router"))]
mod router_tests {
    use super::*;

    #[test]
    fn add_and_lookup_roundtrip() {
        let mut prefixes = PrefixList::new();
        let prefix = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0);
        let h = prefixes
            .add(prefix, 64, true, FLAG_ON_LINK, 2_592_000, 604_800)
            .unwrap();
        assert_eq!(prefixes.lookup(prefix, 64), Some(h));
        assert!(prefixes.get(h).unwrap().advertise);
        prefixes.remove(h);
        assert_eq!(prefixes.lookup(prefix, 64), None);
    }

    #[test]
    fn on_link_requires_the_on_link_flag() {
        let mut prefixes = PrefixList::new();
        let on_link = Ipv6Addr::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 0);
        let off_link = Ipv6Addr::new(0x2001, 0xdb8, 2, 0, 0, 0, 0, 0);
        prefixes
            .add(on_link, 64, true, FLAG_ON_LINK | FLAG_AUTONOMOUS, 2_592_000, 604_800)
            .unwrap();
        prefixes
            .add(off_link, 64, true, FLAG_AUTONOMOUS, 2_592_000, 604_800)
            .unwrap();

        assert!(prefixes.is_addr_on_link(Ipv6Addr::new(0x2001, 0xdb8, 1, 0, 0, 0, 0, 1)));
        assert!(!prefixes.is_addr_on_link(Ipv6Addr::new(0x2001, 0xdb8, 2, 0, 0, 0, 0, 1)));
        // link-local needs no configuration
        assert!(prefixes.is_addr_on_link(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)));
    }

    #[test]
    fn advertise_flag_does_not_imply_on_link() {
        let mut prefixes = PrefixList::new();
        let prefix = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0);
        let h = prefixes.add(prefix, 64, true, 0, 2_592_000, 604_800).unwrap();
        assert!(prefixes.get(h).unwrap().advertise);
        assert!(!prefixes.is_addr_on_link(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)));
    }
}
