//! The periodic driver.
//!
//! One invocation per [`PERIOD`](crate::config::PERIOD): expire entries,
//! advance every state machine, and emit at most one outgoing solicitation.
//! Registrations are serviced before neighbor probing, so registration
//! traffic has strict priority over NUD.

use crate::addr::{AddrHandle, AddrState};
use crate::config::*;
use crate::defrt::DefrtHandle;
use crate::iface::Interface;
use crate::nbr::{NbrHandle, NeighborState};
use crate::output::NdSender;
#[cfg(not(feature = "router"))]
use crate::reg::{RegHandle, RegState};
use crate::time::{Ticks, Timer, CLOCK_SECOND};

#[cfg(feature = "6co")]
use crate::context::ContextState;

/// Smallest remaining lifetime seen this tick, with the router it belongs
/// to. Drives the proactive RS before anything important expires.
struct MinLifetime {
    remaining: Ticks,
    defrt: Option<DefrtHandle>,
}

impl MinLifetime {
    fn new() -> MinLifetime {
        MinLifetime {
            remaining: Ticks::MAX,
            defrt: None,
        }
    }

    fn fold(&mut self, remaining: Ticks, defrt: Option<DefrtHandle>) {
        if remaining < self.remaining {
            self.remaining = remaining;
            self.defrt = defrt;
        }
    }
}

impl Interface {
    /// One driver invocation. Call this every [`PERIOD`] ticks; early calls
    /// are no-ops.
    pub fn periodic<S: NdSender>(&mut self, now: Ticks, out: &mut S) {
        if !self.periodic_timer.expired(now) {
            return;
        }

        // one outgoing solicitation per invocation, nothing more
        let mut allow_output = true;
        let mut min = MinLifetime::new();

        #[cfg(not(feature = "router"))]
        self.periodic_registrations(now, &mut allow_output, out);

        self.periodic_addrs(now, allow_output, &mut min);

        #[cfg(not(feature = "router"))]
        {
            if self.routers.choose(&self.nbrs).is_none() {
                if allow_output {
                    // no usable router left, restart discovery
                    self.send_rs(now, None, out);
                    allow_output = false;
                }
            } else {
                self.periodic_defrts(now, allow_output, &mut min);
            }
        }
        #[cfg(feature = "router")]
        self.periodic_defrts(now, allow_output, &mut min);

        #[cfg(not(feature = "router"))]
        self.periodic_prefixes(now, allow_output, &mut min);

        #[cfg(feature = "6co")]
        self.periodic_contexts(now, allow_output, &mut min);

        // solicit well before the shortest lifetime runs out
        #[cfg(not(feature = "router"))]
        {
            if allow_output && min.remaining < Ticks::from(LIFETIME_THRESHOLD) * CLOCK_SECOND {
                self.send_rs(now, min.defrt, out);
                allow_output = false;
            }
        }

        self.periodic_neighbors(now, &mut allow_output, out);

        #[cfg(feature = "router")]
        {
            if self.ra_timer.expired(now) {
                self.send_ra_periodic(now, out);
            }
        }

        self.periodic_timer.advance();
    }

    #[cfg(not(feature = "router"))]
    fn periodic_registrations<S: NdSender>(
        &mut self,
        now: Ticks,
        allow_output: &mut bool,
        out: &mut S,
    ) {
        for slot in 0..REG_LIST_SIZE {
            let reg = self.regs.entries[slot];
            if !reg.in_use {
                continue;
            }
            if reg.reg_lifetime.expired(now) {
                self.regs.remove(RegHandle(slot), &mut self.routers);
                self.sync_registration_in_progress();
                self.release_address_if_orphaned(reg.addr);
                continue;
            }
            if !*allow_output {
                continue;
            }
            match self.registration_in_progress {
                Some(current) if current == RegHandle(slot) => {
                    if !reg.retransmit.expired(now) {
                        continue;
                    }
                    if reg.reg_count >= MAX_UNICAST_SOLICIT {
                        self.registration_failed(now, RegHandle(slot), out);
                    } else {
                        let Some((src, router_ip)) = self.reg_endpoints(RegHandle(slot)) else {
                            continue;
                        };
                        let entry = &mut self.regs.entries[slot];
                        entry.reg_count += 1;
                        entry.retransmit.restart(now);
                        log::trace!(
                            target: "sixlo/reg",
                            "retransmitting registration NS to {} ({}/{})",
                            router_ip, entry.reg_count, MAX_UNICAST_SOLICIT
                        );
                        out.send_ns(Some(src), router_ip, Some(router_ip), Some(REGISTRATION_LIFETIME));
                    }
                    *allow_output = false;
                }
                Some(_) => {}
                None => {
                    let refresh_due = reg.state == RegState::Registered
                        && reg.reg_lifetime.remaining(now) < reg.reg_lifetime.elapsed(now);
                    let needs_work = refresh_due
                        || matches!(
                            reg.state,
                            RegState::GarbageCollectible | RegState::ToBeUnregistered
                        );
                    if !needs_work {
                        continue;
                    }
                    let Some((src, router_ip)) = self.reg_endpoints(RegHandle(slot)) else {
                        continue;
                    };
                    self.registration_in_progress = Some(RegHandle(slot));
                    let retrans = self.retrans_timer;
                    let entry = &mut self.regs.entries[slot];
                    if entry.state == RegState::GarbageCollectible {
                        entry.state = RegState::Tentative;
                        entry.reg_lifetime = Timer::set_secs(now, TENTATIVE_REG_LIFETIME);
                    }
                    entry.reg_count = 1;
                    entry.retransmit = Timer::set_msecs(now, retrans);
                    let lifetime = if entry.state == RegState::ToBeUnregistered {
                        0
                    } else {
                        REGISTRATION_LIFETIME
                    };
                    log::trace!(
                        target: "sixlo/reg",
                        "registration NS to {} (aro lifetime {})",
                        router_ip, lifetime
                    );
                    out.send_ns(Some(src), router_ip, Some(router_ip), Some(lifetime));
                    *allow_output = false;
                }
            }
        }
    }

    /// The (source address, router address) pair of a registration.
    #[cfg(not(feature = "router"))]
    fn reg_endpoints(&self, handle: RegHandle) -> Option<(std::net::Ipv6Addr, std::net::Ipv6Addr)> {
        let reg = self.regs.get(handle)?;
        let src = self.addrs.get(reg.addr)?.ipaddr;
        let router = self.routers.get(reg.defrt)?.ipaddr;
        Some((src, router))
    }

    /// Retransmission budget exhausted: NUD failed for the router. Drop the
    /// binding, the neighbor and the router itself, then restart router
    /// discovery with a multicast RS.
    #[cfg(not(feature = "router"))]
    fn registration_failed<S: NdSender>(&mut self, now: Ticks, handle: RegHandle, out: &mut S) {
        let Some(reg) = self.regs.get(handle).copied() else {
            return;
        };
        let router_ip = self.routers.get(reg.defrt).map(|r| r.ipaddr);
        log::warn!(
            target: "sixlo/reg",
            "registration with {:?} failed after {} solicitations",
            router_ip, reg.reg_count
        );
        self.regs.remove(handle, &mut self.routers);
        if let Some(ip) = router_ip {
            if let Some(nbr) = self.nbrs.lookup(ip) {
                self.nbr_remove(nbr, out);
            }
        }
        self.defrt_remove(reg.defrt);
        self.send_rs(now, None, out);
        self.registration_in_progress = None;
    }

    fn periodic_addrs(&mut self, now: Ticks, allow_output: bool, min: &mut MinLifetime) {
        for slot in 0..ADDR_NB {
            let addr = self.addrs.entries[slot];
            if !addr.in_use || addr.infinite {
                continue;
            }
            if addr.vlifetime.expired(now) {
                if addr.state != AddrState::Deprecated {
                    log::debug!(target: "sixlo/addr", "{} valid lifetime expired", addr.ipaddr);
                    self.addr_remove(AddrHandle(slot));
                }
            } else if allow_output {
                min.fold(addr.vlifetime.remaining(now), addr.defrt);
            }
        }
    }

    fn periodic_defrts(&mut self, now: Ticks, allow_output: bool, min: &mut MinLifetime) {
        for slot in 0..DEFRT_NB {
            let router = self.routers.entries[slot];
            if !router.in_use || router.infinite {
                continue;
            }
            if router.lifetime.expired(now) {
                log::debug!(target: "sixlo/defrt", "{} lifetime expired", router.ipaddr);
                self.defrt_remove(DefrtHandle(slot));
            } else if allow_output {
                min.fold(router.lifetime.remaining(now), Some(DefrtHandle(slot)));
            }
        }
    }

    #[cfg(not(feature = "router"))]
    fn periodic_prefixes(&mut self, now: Ticks, allow_output: bool, min: &mut MinLifetime) {
        for slot in 0..PREFIX_NB {
            let prefix = self.prefixes.entries[slot];
            if !prefix.in_use || prefix.infinite {
                continue;
            }
            if prefix.vlifetime.expired(now) {
                log::debug!(
                    target: "sixlo/prefix",
                    "{}/{} valid lifetime expired",
                    prefix.ipaddr, prefix.length
                );
                self.prefixes.entries[slot].in_use = false;
            } else if allow_output {
                min.fold(prefix.vlifetime.remaining(now), prefix.defrt);
            }
        }
    }

    #[cfg(feature = "6co")]
    fn periodic_contexts(&mut self, now: Ticks, allow_output: bool, min: &mut MinLifetime) {
        for slot in 0..CONTEXT_NB {
            let context = self.contexts.entries[slot];
            if context.state == ContextState::NotInUse {
                continue;
            }
            if context.vlifetime.expired(now) {
                self.contexts.step_expiry(now, slot);
            } else if allow_output {
                min.fold(context.vlifetime.remaining(now), context.defrt);
            }
        }
    }

    fn periodic_neighbors<S: NdSender>(&mut self, now: Ticks, allow_output: &mut bool, out: &mut S) {
        for slot in 0..NBR_NB {
            let nbr = self.nbrs.entries[slot];
            if !nbr.in_use {
                continue;
            }
            match nbr.state {
                // hosts keep no INCOMPLETE entries under 6LoWPAN-ND
                NeighborState::Incomplete => {
                    #[cfg(feature = "router")]
                    if *allow_output {
                        if nbr.ns_count >= MAX_MULTICAST_SOLICIT {
                            self.nbr_remove(NbrHandle(slot), out);
                        } else if nbr.send_ns.expired(now) {
                            let retrans = self.retrans_timer;
                            let entry = &mut self.nbrs.entries[slot];
                            entry.ns_count += 1;
                            entry.send_ns = Timer::set_msecs(now, retrans);
                            log::trace!(
                                target: "sixlo/nbr",
                                "multicast NS for {} ({}/{})",
                                nbr.ipaddr, entry.ns_count, MAX_MULTICAST_SOLICIT
                            );
                            out.send_ns(None, nbr.ipaddr, None, None);
                            *allow_output = false;
                        }
                    }
                }
                NeighborState::Reachable => {
                    if nbr.reachable.expired(now) {
                        log::trace!(target: "sixlo/nbr", "{} reachable -> stale", nbr.ipaddr);
                        self.nbrs.entries[slot].state = NeighborState::Stale;
                        out.neighbor_state_changed(nbr.ipaddr, Some(NeighborState::Stale));
                    }
                }
                NeighborState::Stale => {}
                NeighborState::Delay => {
                    if *allow_output && nbr.reachable.expired(now) {
                        let retrans = self.retrans_timer;
                        let entry = &mut self.nbrs.entries[slot];
                        entry.state = NeighborState::Probe;
                        entry.ns_count = 1;
                        entry.send_ns = Timer::set_msecs(now, retrans);
                        log::trace!(target: "sixlo/nbr", "{} delay -> probe", nbr.ipaddr);
                        out.neighbor_state_changed(nbr.ipaddr, Some(NeighborState::Probe));
                        out.send_ns(None, nbr.ipaddr, Some(nbr.ipaddr), None);
                        *allow_output = false;
                    }
                }
                NeighborState::Probe => {
                    if *allow_output {
                        if nbr.ns_count >= MAX_UNICAST_SOLICIT {
                            log::debug!(target: "sixlo/nbr", "{} unreachable, probe exhausted", nbr.ipaddr);
                            if let Some(router) = self.routers.lookup(nbr.ipaddr) {
                                self.defrt_remove(router);
                            }
                            self.nbr_remove(NbrHandle(slot), out);
                        } else if nbr.send_ns.expired(now) {
                            let retrans = self.retrans_timer;
                            let entry = &mut self.nbrs.entries[slot];
                            entry.ns_count += 1;
                            entry.send_ns = Timer::set_msecs(now, retrans);
                            log::trace!(
                                target: "sixlo/nbr",
                                "probe NS for {} ({}/{})",
                                nbr.ipaddr, entry.ns_count, MAX_UNICAST_SOLICIT
                            );
                            out.send_ns(None, nbr.ipaddr, Some(nbr.ipaddr), None);
                            *allow_output = false;
                        }
                    }
                }
            }
        }
    }
}

cfg_host! {
    impl Interface {
        /// Emits a router solicitation, unicast to `target` (or any router
        /// already marked `sending_rs`) while unicast retries remain, else
        /// multicast. Paced by the RS timer with binary exponential backoff.
        pub fn send_rs<S: NdSender>(
            &mut self,
            now: Ticks,
            target: Option<DefrtHandle>,
            out: &mut S,
        ) {
            if !self.rs_timer.expired(now) {
                return;
            }

            let mut unicast = None;
            if let Some(handle) = target {
                if let Some(router) = self.routers.get_mut(handle) {
                    router.sending_rs = true;
                    unicast = Some(handle);
                }
            }
            if unicast.is_none() {
                unicast = self
                    .routers
                    .iter()
                    .find(|(_, r)| r.sending_rs)
                    .map(|(h, _)| h);
            }

            if let Some(handle) = unicast {
                let router = self.routers.get(handle).unwrap();
                if router.rs_count < MAX_RTR_SOLICITATIONS {
                    let ipaddr = router.ipaddr;
                    let count = router.rs_count + 1;
                    self.routers.get_mut(handle).unwrap().rs_count = count;
                    log::trace!(target: "sixlo/rs", "unicast RS to {} ({})", ipaddr, count);
                    out.send_rs(Some(ipaddr));
                    let interval = self.rs_rtx_time(count);
                    self.rs_timer = Timer::set_secs(now, u32::from(interval));
                    return;
                }
                // unicast retries exhausted, fall back to multicast
                let router = self.routers.get_mut(handle).unwrap();
                router.sending_rs = false;
                self.rs_count = router.rs_count;
                router.rs_count = 0;
            }

            log::trace!(target: "sixlo/rs", "multicast RS ({})", self.rs_count);
            out.send_rs(None);
            if self.routers.choose(&self.nbrs).is_none() {
                if self.rs_count <= 10 {
                    self.rs_count += 1;
                }
            } else {
                self.rs_count = 0;
            }
            let interval = self.rs_rtx_time(self.rs_count);
            self.rs_timer = Timer::set_secs(now, u32::from(interval));
        }

        /// Retransmission interval for RS attempt `count`: fixed for the
        /// first attempts, then binary exponential backoff, capped once the
        /// campaign has run long.
        fn rs_rtx_time(&mut self, count: u8) -> u16 {
            if count < MAX_RTR_SOLICITATIONS {
                RTR_SOLICITATION_INTERVAL
            } else if count > 10 {
                MAX_RTR_SOLICITATION_INTERVAL
            } else {
                self.beb_next(count, RTR_SOLICITATION_INTERVAL, MAX_RTR_SOLICITATION_INTERVAL)
            }
        }

        /// Draws from the `count`-th backoff window `[0, 2^count - 1)`,
        /// scaled by `unit` and truncated to `cap`.
        fn beb_next(&mut self, count: u8, unit: u16, cap: u16) -> u16 {
            use rand::Rng;
            let bound = (1u32 << count) - 1;
            let drawn = self.rng.gen_range(0..bound) * u32::from(unit);
            drawn.min(u32::from(cap)) as u16
        }
    }
}

cfg_router! {
    impl Interface {
        /// Sends the scheduled RA and draws the next interval, clamped for
        /// the initial burst.
        pub fn send_ra_periodic<S: NdSender>(&mut self, now: Ticks, out: &mut S) {
            use rand::Rng;
            if self.ra_count > 0 {
                log::trace!(target: "sixlo/ra", "periodic RA");
                out.send_ra(None);
            }

            let mut interval =
                MIN_RA_INTERVAL + self.rng.gen_range(0..MAX_RA_INTERVAL - MIN_RA_INTERVAL);
            if self.ra_count < MAX_INITIAL_RAS {
                if interval > MAX_INITIAL_RA_INTERVAL {
                    interval = MAX_INITIAL_RA_INTERVAL;
                }
                self.ra_count += 1;
            }
            self.ra_timer = Timer::set_secs(now, interval);
        }

        /// Schedules an RA in answer to a solicitation. RAs stay rate
        /// limited: never earlier than [`MIN_DELAY_BETWEEN_RAS`] after the
        /// previous one.
        pub fn send_ra_solicited(&mut self, now: Ticks) {
            if self.ra_timer.expired(now) {
                return;
            }
            let min_gap = Ticks::from(MIN_DELAY_BETWEEN_RAS) * CLOCK_SECOND;
            let elapsed = self.ra_timer.elapsed(now);
            if elapsed < min_gap {
                self.ra_timer = Timer::set(now, min_gap - elapsed);
            } else {
                self.ra_timer = Timer::set(now, 0);
            }
        }
    }
}
