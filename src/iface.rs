//! The interface: single owner of every table and of the interface-level
//! variables, with the cross-table operations that keep them consistent.

use crate::addr::{AddrHandle, AddrList, AddrOrigin, AddrState, AnycastList, MulticastList};
use crate::config::{DELAY_FIRST_PROBE_TIME, CUR_HOP_LIMIT, LINK_MTU, PERIOD, REACHABLE_TIME,
    REGISTRATION_LIFETIME, RETRANS_TIMER};
use crate::defrt::{DefaultRouterList, DefrtHandle};
use crate::nbr::{NbrHandle, NeighborCache, NeighborState};
use crate::output::NdSender;
use crate::prefix::PrefixList;
use crate::reg::{RegHandle, RegState, RegistrationList};
use crate::route::RoutingTable;
use crate::time::{Ticks, Timer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sixlo_types::nd::RegistrationStatus;
use sixlo_types::{Ipv6AddrExt, Ipv6Prefix, LinkLayerAddr};
use std::net::Ipv6Addr;

#[cfg(feature = "6co")]
use crate::context::ContextTable;
#[cfg(feature = "6co")]
use sixlo_types::nd::ContextOption;
#[cfg(not(feature = "router"))]
use crate::config::MAX_RTR_SOLICITATION_DELAY;
#[cfg(not(feature = "router"))]
use crate::time::CLOCK_SECOND;

/// A 6LoWPAN network interface and all of its ND state.
///
/// Every operation takes the current tick; the interface keeps no connection
/// to a clock of its own.
pub struct Interface {
    pub link_mtu: u32,
    pub cur_hop_limit: u8,
    /// Base reachable time in milliseconds.
    pub base_reachable_time: u32,
    /// Randomized reachable time in milliseconds, derived from the base.
    pub reachable_time: u32,
    /// Retransmission interval in milliseconds.
    pub retrans_timer: u32,

    lladdr: LinkLayerAddr,

    pub addrs: AddrList,
    pub maddrs: MulticastList,
    pub aaddrs: AnycastList,
    pub nbrs: NeighborCache,
    pub routers: DefaultRouterList,
    pub prefixes: PrefixList,
    pub routes: RoutingTable,
    pub regs: RegistrationList,
    #[cfg(feature = "6co")]
    pub contexts: ContextTable,

    /// The registration campaign currently running, at most one.
    pub(crate) registration_in_progress: Option<RegHandle>,

    pub(crate) periodic_timer: Timer,
    #[cfg(not(feature = "router"))]
    pub(crate) rs_timer: Timer,
    #[cfg(not(feature = "router"))]
    pub(crate) rs_count: u8,
    #[cfg(feature = "router")]
    pub(crate) ra_timer: Timer,
    #[cfg(feature = "router")]
    pub(crate) ra_count: u8,

    pub(crate) rng: StdRng,
}

impl Interface {
    /// Brings the interface up: link-local address from the interface
    /// identifier, link-local prefix, all-nodes group, and the role-specific
    /// solicitation or advertisement timers.
    pub fn new(lladdr: LinkLayerAddr, now: Ticks) -> Interface {
        Interface::with_rng(lladdr, now, StdRng::from_entropy())
    }

    /// Like [`Interface::new`] with a deterministic RNG seed.
    pub fn with_seed(lladdr: LinkLayerAddr, now: Ticks, seed: u64) -> Interface {
        Interface::with_rng(lladdr, now, StdRng::seed_from_u64(seed))
    }

    fn with_rng(lladdr: LinkLayerAddr, now: Ticks, mut rng: StdRng) -> Interface {
        #[cfg(not(feature = "router"))]
        let rs_delay = rng.gen_range(0..MAX_RTR_SOLICITATION_DELAY * CLOCK_SECOND as u32);

        let mut iface = Interface {
            link_mtu: LINK_MTU,
            cur_hop_limit: CUR_HOP_LIMIT,
            base_reachable_time: REACHABLE_TIME,
            reachable_time: 0,
            retrans_timer: RETRANS_TIMER,
            lladdr,
            addrs: AddrList::new(),
            maddrs: MulticastList::new(),
            aaddrs: AnycastList::new(),
            nbrs: NeighborCache::new(),
            routers: DefaultRouterList::new(),
            prefixes: PrefixList::new(),
            routes: RoutingTable::new(),
            regs: RegistrationList::new(),
            #[cfg(feature = "6co")]
            contexts: ContextTable::new(),
            registration_in_progress: None,
            periodic_timer: Timer::set(now, PERIOD),
            #[cfg(not(feature = "router"))]
            rs_timer: Timer::set(now, Ticks::from(rs_delay)),
            #[cfg(not(feature = "router"))]
            rs_count: 0,
            #[cfg(feature = "router")]
            ra_timer: Timer::set_secs(now, 2),
            #[cfg(feature = "router")]
            ra_count: 0,
            rng,
        };
        iface.reachable_time = iface.compute_reachable_time();

        let link_local = lladdr.apply_iid(Ipv6Prefix::LINK_LOCAL.addr());
        #[cfg(not(feature = "router"))]
        iface.prefixes.add(now, Ipv6Prefix::LINK_LOCAL.addr(), 64, 0);
        #[cfg(feature = "router")]
        iface.prefixes.add(Ipv6Prefix::LINK_LOCAL.addr(), 64, false, 0, 0, 0);
        iface.addrs.add(now, link_local, 0, AddrOrigin::Autoconf);
        iface.maddrs.add(Ipv6Addr::ALL_NODES);
        #[cfg(feature = "router")]
        iface.maddrs.add(Ipv6Addr::ALL_ROUTERS);

        log::debug!(target: "sixlo/iface", "interface up, link-local {}", link_local);
        iface
    }

    pub fn lladdr(&self) -> LinkLayerAddr {
        self.lladdr
    }

    /// The registration campaign currently running, if any.
    pub fn registration_in_progress(&self) -> Option<RegHandle> {
        self.registration_in_progress
    }

    /// Multicast RS attempts in the current discovery campaign.
    #[cfg(not(feature = "router"))]
    pub fn rs_count(&self) -> u8 {
        self.rs_count
    }

    /// Randomized reachable time: `base/2 + uniform(0, base)` milliseconds.
    pub fn compute_reachable_time(&mut self) -> u32 {
        if self.base_reachable_time == 0 {
            return 0;
        }
        self.base_reachable_time / 2 + self.rng.gen_range(0..self.base_reachable_time)
    }

    /// Updates the base reachable time and re-randomizes the derived value.
    pub fn set_base_reachable_time(&mut self, base_msecs: u32) {
        self.base_reachable_time = base_msecs;
        self.reachable_time = self.compute_reachable_time();
    }

    pub fn is_my_addr(&self, ipaddr: Ipv6Addr) -> bool {
        self.addrs.lookup(ipaddr).is_some()
    }

    pub fn is_my_maddr(&self, ipaddr: Ipv6Addr) -> bool {
        self.maddrs.contains(ipaddr)
    }

    pub fn is_my_aaddr(&self, ipaddr: Ipv6Addr) -> bool {
        self.aaddrs.contains(ipaddr)
    }

    /// Source address selection for an outgoing packet.
    pub fn select_src(&self, dst: Ipv6Addr) -> Ipv6Addr {
        self.addrs.select_src(dst)
    }

    // --- neighbor cache -----------------------------------------------------

    /// Caches a neighbor. When the pool is full the least recently used
    /// garbage-collectible entry is evicted first, together with its default
    /// router and that router's registrations; without an eviction candidate
    /// the add fails.
    pub fn nbr_add<S: NdSender>(
        &mut self,
        now: Ticks,
        ipaddr: Ipv6Addr,
        lladdr: Option<LinkLayerAddr>,
        is_router: bool,
        state: NeighborState,
        out: &mut S,
    ) -> Option<NbrHandle> {
        if let Some(handle) = self.nbrs.add_entry(now, ipaddr, lladdr, is_router, state) {
            log::trace!(target: "sixlo/nbr", "cached {} ({:?})", ipaddr, state);
            out.neighbor_state_changed(ipaddr, Some(state));
            return Some(handle);
        }
        if self.nbrs.lookup(ipaddr).is_some() {
            return None;
        }

        let mut oldest: Option<NbrHandle> = None;
        let mut oldest_time = now;
        for (handle, nbr) in self.nbrs.iter() {
            if nbr.last_lookup < oldest_time && self.is_nbr_garbage_collectible(handle) {
                oldest = Some(handle);
                oldest_time = nbr.last_lookup;
            }
        }
        let victim = match oldest {
            Some(victim) => victim,
            None => {
                log::debug!(target: "sixlo/nbr", "cache full, no evictable entry, dropping {}", ipaddr);
                return None;
            }
        };

        let victim_ip = self.nbrs.get(victim).map(|n| n.ipaddr);
        self.nbr_remove(victim, out);
        if let Some(router) = victim_ip.and_then(|ip| self.routers.lookup(ip)) {
            self.defrt_remove(router);
        }

        let handle = self.nbrs.add_entry(now, ipaddr, lladdr, is_router, state);
        if handle.is_some() {
            log::trace!(target: "sixlo/nbr", "cached {} after evicting {:?}", ipaddr, victim_ip);
            out.neighbor_state_changed(ipaddr, Some(state));
        }
        handle
    }

    /// Drops a neighbor and notifies the hook.
    pub fn nbr_remove<S: NdSender>(&mut self, handle: NbrHandle, out: &mut S) {
        if let Some(nbr) = self.nbrs.get(handle) {
            let ipaddr = nbr.ipaddr;
            self.nbrs.entries[handle.0].in_use = false;
            log::trace!(target: "sixlo/nbr", "removed {}", ipaddr);
            out.neighbor_state_changed(ipaddr, None);
        }
    }

    /// A neighbor may be reclaimed unless a live registration pins the
    /// router behind its address.
    pub fn is_nbr_garbage_collectible(&self, handle: NbrHandle) -> bool {
        let Some(nbr) = self.nbrs.get(handle) else {
            return true;
        };
        match self.routers.lookup(nbr.ipaddr) {
            Some(router) => !self.regs.pins_router(router),
            None => true,
        }
    }

    /// Reachability was confirmed for `ipaddr` (solicited NA arrived).
    pub fn nbr_reachability_confirmed<S: NdSender>(
        &mut self,
        now: Ticks,
        ipaddr: Ipv6Addr,
        out: &mut S,
    ) {
        let Some(handle) = self.nbrs.lookup(ipaddr) else {
            return;
        };
        let reachable = self.reachable_time;
        let nbr = self.nbrs.get_mut(handle).unwrap();
        nbr.state = NeighborState::Reachable;
        nbr.reachable = Timer::set_msecs(now, reachable);
        nbr.ns_count = 0;
        nbr.last_lookup = now;
        log::trace!(target: "sixlo/nbr", "{} is reachable", ipaddr);
        out.neighbor_state_changed(ipaddr, Some(NeighborState::Reachable));
    }

    /// Upper-layer hint that a packet was just sent to `ipaddr`; arms the
    /// DELAY probe for stale entries.
    pub fn nbr_used<S: NdSender>(&mut self, now: Ticks, ipaddr: Ipv6Addr, out: &mut S) {
        let Some(handle) = self.nbrs.lookup(ipaddr) else {
            return;
        };
        let nbr = self.nbrs.get_mut(handle).unwrap();
        nbr.last_lookup = now;
        if nbr.state == NeighborState::Stale {
            nbr.state = NeighborState::Delay;
            nbr.reachable = Timer::set_secs(now, DELAY_FIRST_PROBE_TIME);
            out.neighbor_state_changed(ipaddr, Some(NeighborState::Delay));
        }
    }

    // --- default routers ----------------------------------------------------

    /// Removes a default router and every registration naming it. Routes via
    /// the router are left for the caller
    /// ([`RoutingTable::remove_by_next_hop`]).
    pub fn defrt_remove(&mut self, handle: DefrtHandle) {
        let Some(router) = self.routers.get(handle) else {
            return;
        };
        let ipaddr = router.ipaddr;
        self.routers.remove(handle);
        self.regs.cleanup_router(handle, &mut self.routers);
        self.sync_registration_in_progress();
        log::debug!(target: "sixlo/defrt", "removed default router {}", ipaddr);
    }

    // --- unicast addresses --------------------------------------------------

    /// Binds a unicast address to the interface.
    pub fn addr_add(
        &mut self,
        now: Ticks,
        ipaddr: Ipv6Addr,
        vlifetime_secs: u32,
        origin: AddrOrigin,
    ) -> Option<AddrHandle> {
        let handle = self.addrs.add(now, ipaddr, vlifetime_secs, origin)?;
        // hosts running the registration protocol skip the solicited-node
        // group; routers still join it for classic address resolution
        #[cfg(feature = "router")]
        self.maddrs.add(Ipv6Addr::solicited_node_multicast(ipaddr));
        Some(handle)
    }

    /// Unbinds a unicast address. Confirmed registrations must be torn down
    /// with a zero-lifetime NS first, so the address lingers DEPRECATED until
    /// the driver has run those campaigns.
    pub fn addr_remove(&mut self, handle: AddrHandle) {
        let Some(addr) = self.addrs.get(handle) else {
            return;
        };
        let ipaddr = addr.ipaddr;
        self.regs.cleanup_address(handle, &mut self.routers);
        self.sync_registration_in_progress();
        if self.regs.iter().any(|(_, r)| r.addr == handle) {
            self.addrs.get_mut(handle).unwrap().state = AddrState::Deprecated;
            log::debug!(target: "sixlo/addr", "{} deprecated pending unregistration", ipaddr);
        } else {
            self.addrs.remove(handle);
            log::debug!(target: "sixlo/addr", "unbound {}", ipaddr);
        }
    }

    // --- registrations ------------------------------------------------------

    /// Creates a registration binding for `addr` with the least loaded
    /// router the address is not yet registered with. The periodic driver
    /// picks the binding up and runs the NS/ARO campaign.
    pub fn register_address(&mut self, now: Ticks, addr: AddrHandle) -> Option<RegHandle> {
        self.addrs.get(addr)?;
        let router = self.routers.choose_min_registrations(addr, &self.regs)?;
        let reg = self
            .regs
            .add(now, addr, router, RegState::GarbageCollectible, &mut self.routers)?;
        log::trace!(
            target: "sixlo/reg",
            "queued registration of addr slot {} with router slot {}",
            addr.0, router.0
        );
        Some(reg)
    }

    /// An NA carrying an address registration option arrived for
    /// (`addr_ip`, `router_ip`).
    pub fn registration_confirmed(
        &mut self,
        now: Ticks,
        addr_ip: Ipv6Addr,
        router_ip: Ipv6Addr,
        status: RegistrationStatus,
    ) {
        let (Some(addr), Some(router)) = (self.addrs.lookup(addr_ip), self.routers.lookup(router_ip))
        else {
            return;
        };
        let Some(reg) = self.regs.lookup(addr, router) else {
            return;
        };

        match status {
            RegistrationStatus::Success => {
                if self.regs.get(reg).unwrap().state == RegState::ToBeUnregistered {
                    // the zero-lifetime NS was acknowledged
                    self.regs.remove(reg, &mut self.routers);
                    self.release_address_if_orphaned(addr);
                    log::trace!(target: "sixlo/reg", "{} unregistered from {}", addr_ip, router_ip);
                } else {
                    let entry = self.regs.get_mut(reg).unwrap();
                    entry.state = RegState::Registered;
                    entry.reg_lifetime =
                        Timer::set_secs(now, u32::from(REGISTRATION_LIFETIME) * 60);
                    if let Some(a) = self.addrs.get_mut(addr) {
                        if a.state == AddrState::Tentative {
                            a.state = AddrState::Preferred;
                        }
                    }
                    log::trace!(target: "sixlo/reg", "{} registered with {}", addr_ip, router_ip);
                }
            }
            RegistrationStatus::DuplicateAddress => {
                log::warn!(target: "sixlo/reg", "{} rejected as duplicate by {}", addr_ip, router_ip);
                // the address must not be used at all anymore
                for slot in 0..self.regs.entries.len() {
                    if self.regs.entries[slot].in_use && self.regs.entries[slot].addr == addr {
                        self.regs.remove(RegHandle(slot), &mut self.routers);
                    }
                }
                self.addrs.remove(addr);
            }
            RegistrationStatus::NeighborCacheFull => {
                log::warn!(target: "sixlo/reg", "{} has no room for {}", router_ip, addr_ip);
                self.regs.remove(reg, &mut self.routers);
            }
        }

        if self.registration_in_progress == Some(reg) {
            self.registration_in_progress = None;
        }
    }

    /// Clears the in-progress handle when its registration no longer exists.
    pub(crate) fn sync_registration_in_progress(&mut self) {
        if let Some(handle) = self.registration_in_progress {
            if self.regs.get(handle).is_none() {
                self.registration_in_progress = None;
            }
        }
    }

    /// Frees an address that was kept only for pending unregistrations.
    pub(crate) fn release_address_if_orphaned(&mut self, addr: AddrHandle) {
        let Some(entry) = self.addrs.get(addr) else {
            return;
        };
        if entry.state == AddrState::Deprecated
            && !self.regs.iter().any(|(_, r)| r.addr == addr)
        {
            self.addrs.remove(addr);
        }
    }

    // --- contexts -----------------------------------------------------------

    /// Installs a compression context from a parsed 6CO option.
    /// `defrt_lifetime_secs` is the advertising router's lifetime, kept for
    /// the decompression grace period after expiry.
    #[cfg(feature = "6co")]
    pub fn context_add(
        &mut self,
        now: Ticks,
        option: &ContextOption,
        defrt_lifetime_secs: u32,
        router_ip: Option<Ipv6Addr>,
    ) -> Option<u8> {
        let defrt = router_ip.and_then(|ip| self.routers.lookup(ip));
        self.contexts.add(now, option, defrt_lifetime_secs, defrt)
    }
}

#[cfg(all(test, not(feature = "router")))]
mod tests {
    use super::*;
    use crate::config::NBR_NB;

    #[derive(Default)]
    struct Sink {
        events: Vec<(Ipv6Addr, Option<NeighborState>)>,
    }

    impl NdSender for Sink {
        fn send_ns(&mut self, _: Option<Ipv6Addr>, _: Ipv6Addr, _: Option<Ipv6Addr>, _: Option<u16>) {}
        fn send_rs(&mut self, _: Option<Ipv6Addr>) {}
        fn send_ra(&mut self, _: Option<Ipv6Addr>) {}
        fn neighbor_state_changed(&mut self, addr: Ipv6Addr, state: Option<NeighborState>) {
            self.events.push((addr, state));
        }
    }

    const MAC: LinkLayerAddr = LinkLayerAddr::Mac48([0x02, 0, 0, 0, 0, 0x01]);

    fn iface() -> Interface {
        Interface::with_seed(MAC, 0, 7)
    }

    fn router_ip(low: u16) -> Ipv6Addr {
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, low)
    }

    fn check_registration_counts(iface: &Interface) {
        for (router_h, router) in iface.routers.iter() {
            let live = iface
                .regs
                .iter()
                .filter(|(_, r)| r.defrt == router_h)
                .count();
            assert_eq!(router.registration_count as usize, live);
        }
        for (_, reg) in iface.regs.iter() {
            assert!(iface.routers.get(reg.defrt).is_some());
            assert!(iface.addrs.get(reg.addr).is_some());
        }
    }

    #[test]
    fn bootstrap_binds_link_local() {
        let iface = iface();
        let ll = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0x00ff, 0xfe00, 0x0001);
        assert!(iface.is_my_addr(ll));
        let handle = iface.addrs.link_local(Some(AddrState::Preferred)).unwrap();
        assert_eq!(iface.addrs.get(handle).unwrap().ipaddr, ll);
        assert!(iface.is_my_maddr(Ipv6Addr::ALL_NODES));
        assert!(iface.prefixes.is_addr_on_link(ll));
    }

    #[test]
    fn reachable_time_is_within_randomization_bounds() {
        let mut iface = iface();
        for _ in 0..32 {
            let t = iface.compute_reachable_time();
            assert!(t >= iface.base_reachable_time / 2);
            assert!(t < iface.base_reachable_time / 2 + iface.base_reachable_time);
        }
    }

    #[test]
    fn full_cache_evicts_least_recently_used() {
        let mut iface = iface();
        let mut out = Sink::default();
        for i in 0..NBR_NB as u16 {
            iface
                .nbr_add(
                    Ticks::from(i),
                    router_ip(i + 1),
                    None,
                    false,
                    NeighborState::Stale,
                    &mut out,
                )
                .unwrap();
        }

        let newcomer = router_ip(0xff);
        let handle = iface
            .nbr_add(100, newcomer, None, false, NeighborState::Stale, &mut out)
            .unwrap();
        assert_eq!(iface.nbrs.get(handle).unwrap().ipaddr, newcomer);
        // the oldest entry is gone
        assert!(iface.nbrs.lookup(router_ip(1)).is_none());
        assert!(out.events.contains(&(router_ip(1), None)));
    }

    #[test]
    fn eviction_requires_a_strictly_older_entry() {
        let mut iface = iface();
        let mut out = Sink::default();
        for i in 0..NBR_NB as u16 {
            iface
                .nbr_add(50, router_ip(i + 1), None, false, NeighborState::Stale, &mut out)
                .unwrap();
        }
        // nothing was looked up before `now`, so nothing may be evicted
        assert!(iface
            .nbr_add(50, router_ip(0xff), None, false, NeighborState::Stale, &mut out)
            .is_none());
        assert_eq!(iface.nbrs.iter().count(), NBR_NB);
    }

    #[test]
    fn pinned_neighbors_are_not_evicted() {
        let mut iface = iface();
        let mut out = Sink::default();

        // every neighbor is a router pinned by a live registration
        let addr = iface.addrs.link_local(None).unwrap();
        for i in 0..NBR_NB as u16 {
            let ip = router_ip(i + 1);
            iface
                .nbr_add(Ticks::from(i), ip, None, true, NeighborState::Stale, &mut out)
                .unwrap();
            if i < crate::config::DEFRT_NB as u16 {
                let router = iface.routers.add(0, ip, 1800).unwrap();
                iface
                    .regs
                    .add(0, addr, router, RegState::Registered, &mut iface.routers)
                    .unwrap();
            }
        }

        let nbr1 = iface.nbrs.lookup(router_ip(1)).unwrap();
        assert!(!iface.is_nbr_garbage_collectible(nbr1));

        // slots 3 and 4 have no router entry at all, so the oldest of those goes
        let handle = iface
            .nbr_add(100, router_ip(0xff), None, false, NeighborState::Stale, &mut out)
            .unwrap();
        assert!(handle.0 >= 2);
        assert!(iface.nbrs.lookup(router_ip(1)).is_some());
        assert!(iface.nbrs.lookup(router_ip(2)).is_some());
        check_registration_counts(&iface);
    }

    #[test]
    fn defrt_remove_cascades_to_registrations() {
        let mut iface = iface();
        let addr = iface.addrs.link_local(None).unwrap();
        let router = iface.routers.add(0, router_ip(1), 1800).unwrap();
        iface
            .regs
            .add(0, addr, router, RegState::Registered, &mut iface.routers)
            .unwrap();

        iface.defrt_remove(router);
        assert!(iface.routers.lookup(router_ip(1)).is_none());
        assert_eq!(iface.regs.iter().count(), 0);
        check_registration_counts(&iface);
    }

    #[test]
    fn addr_remove_defers_until_unregistered() {
        let mut iface = iface();
        let global = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        let addr = iface.addr_add(0, global, 600, AddrOrigin::Autoconf).unwrap();
        let router = iface.routers.add(0, router_ip(1), 1800).unwrap();
        iface
            .regs
            .add(0, addr, router, RegState::Registered, &mut iface.routers)
            .unwrap();

        iface.addr_remove(addr);
        // the zero-lifetime NS has not gone out yet
        let entry = iface.addrs.get(addr).unwrap();
        assert_eq!(entry.state, AddrState::Deprecated);
        let (_, reg) = iface.regs.iter().next().unwrap();
        assert_eq!(reg.state, RegState::ToBeUnregistered);
        check_registration_counts(&iface);

        // acknowledgment of the deregistration frees both
        iface.registration_confirmed(0, global, router_ip(1), RegistrationStatus::Success);
        assert!(iface.addrs.lookup(global).is_none());
        assert_eq!(iface.regs.iter().count(), 0);
    }

    #[test]
    fn registration_confirm_promotes_address() {
        let mut iface = iface();
        let mut out = Sink::default();
        let global = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        let addr = iface.addr_add(0, global, 600, AddrOrigin::Autoconf).unwrap();
        iface.routers.add(0, router_ip(1), 1800).unwrap();
        iface.register_address(0, addr).unwrap();

        // driver starts the campaign
        iface.periodic(crate::config::PERIOD, &mut out);
        let reg = iface.registration_in_progress().unwrap();
        assert_eq!(iface.regs.get(reg).unwrap().state, RegState::Tentative);

        iface.registration_confirmed(20, global, router_ip(1), RegistrationStatus::Success);
        assert!(iface.registration_in_progress().is_none());
        let (_, reg) = iface.regs.iter().next().unwrap();
        assert_eq!(reg.state, RegState::Registered);
        assert_eq!(iface.addrs.get(addr).unwrap().state, AddrState::Preferred);
        check_registration_counts(&iface);
    }

    #[test]
    fn duplicate_address_is_dropped_entirely() {
        let mut iface = iface();
        let global = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        let addr = iface.addr_add(0, global, 600, AddrOrigin::Autoconf).unwrap();
        iface.routers.add(0, router_ip(1), 1800).unwrap();
        iface.register_address(0, addr).unwrap();

        iface.registration_confirmed(0, global, router_ip(1), RegistrationStatus::DuplicateAddress);
        assert!(iface.addrs.lookup(global).is_none());
        assert_eq!(iface.regs.iter().count(), 0);
        check_registration_counts(&iface);
    }

    #[test]
    fn stale_neighbor_enters_delay_on_use() {
        let mut iface = iface();
        let mut out = Sink::default();
        let ip = router_ip(1);
        iface
            .nbr_add(0, ip, None, true, NeighborState::Stale, &mut out)
            .unwrap();

        iface.nbr_used(5, ip, &mut out);
        let nbr = iface.nbrs.get(iface.nbrs.lookup(ip).unwrap()).unwrap();
        assert_eq!(nbr.state, NeighborState::Delay);
        assert_eq!(nbr.last_lookup, 5);

        iface.nbr_reachability_confirmed(10, ip, &mut out);
        let nbr = iface.nbrs.get(iface.nbrs.lookup(ip).unwrap()).unwrap();
        assert_eq!(nbr.state, NeighborState::Reachable);
        assert_eq!(nbr.ns_count, 0);
        assert_eq!(
            out.events.last(),
            Some(&(ip, Some(NeighborState::Reachable)))
        );
    }
}
