//! The 6LoWPAN-ND address registration list.
//!
//! A registration binds one unicast address to one default router. The
//! periodic driver runs at most one registration campaign at a time; the
//! states below track where each binding stands in that protocol.

use crate::addr::AddrHandle;
use crate::config::{GARBAGE_COLLECTIBLE_REG_LIFETIME, REG_LIST_SIZE, TENTATIVE_REG_LIFETIME};
use crate::defrt::{DefaultRouterList, DefrtHandle};
use crate::time::{Ticks, Timer};

/// State of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegState {
    /// Placeholder binding with a short lifetime; its slot may be reused
    /// under pressure and the driver will start a campaign for it.
    GarbageCollectible,
    /// First registration attempt outstanding; the NS with the registration
    /// option is being retransmitted.
    Tentative,
    /// Confirmed by the router; the lifetime counts down and the driver
    /// refreshes once less than half of it remains.
    Registered,
    /// The address went away; the driver must emit a zero-lifetime NS before
    /// the binding is deleted.
    ToBeUnregistered,
}

/// Slot handle into the registration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegHandle(pub(crate) usize);

/// A registration of one address with one router.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub(crate) in_use: bool,
    pub state: RegState,
    pub addr: AddrHandle,
    pub defrt: DefrtHandle,
    /// Overall lifetime of the binding in its current state.
    pub reg_lifetime: Timer,
    /// Per-attempt retransmission timer.
    pub retransmit: Timer,
    /// Attempts made in the current campaign.
    pub reg_count: u8,
}

impl Registration {
    const EMPTY: Registration = Registration {
        in_use: false,
        state: RegState::GarbageCollectible,
        addr: AddrHandle(0),
        defrt: DefrtHandle(0),
        reg_lifetime: Timer::EXPIRED,
        retransmit: Timer::EXPIRED,
        reg_count: 0,
    };
}

/// The registration pool.
#[derive(Debug)]
pub struct RegistrationList {
    pub(crate) entries: [Registration; REG_LIST_SIZE],
}

impl RegistrationList {
    pub fn new() -> RegistrationList {
        RegistrationList {
            entries: [Registration::EMPTY; REG_LIST_SIZE],
        }
    }

    /// Adds a registration and bumps the router's registration count. Picks
    /// the first free slot, else overwrites the first garbage-collectible
    /// entry, else fails.
    pub fn add(
        &mut self,
        now: Ticks,
        addr: AddrHandle,
        defrt: DefrtHandle,
        state: RegState,
        routers: &mut DefaultRouterList,
    ) -> Option<RegHandle> {
        routers.get(defrt)?;
        let mut candidate = None;
        for (slot, reg) in self.entries.iter().enumerate() {
            if !reg.in_use {
                candidate = Some(slot);
                break;
            }
            if candidate.is_none() && reg.state == RegState::GarbageCollectible {
                candidate = Some(slot);
            }
        }
        let slot = candidate?;

        if self.entries[slot].in_use {
            // reclaiming a garbage-collectible binding
            let old = self.entries[slot];
            if let Some(router) = routers.get_mut(old.defrt) {
                router.registration_count -= 1;
            }
        }

        let reg = &mut self.entries[slot];
        reg.in_use = true;
        reg.state = state;
        reg.addr = addr;
        reg.defrt = defrt;
        reg.retransmit = Timer::set(now, 0);
        reg.reg_count = 0;
        reg.reg_lifetime = match state {
            RegState::GarbageCollectible => {
                Timer::set_secs(now, GARBAGE_COLLECTIBLE_REG_LIFETIME)
            }
            _ => Timer::set_secs(now, TENTATIVE_REG_LIFETIME),
        };
        if let Some(router) = routers.get_mut(defrt) {
            router.registration_count += 1;
        }
        Some(RegHandle(slot))
    }

    /// Removes a registration and drops the router's registration count.
    /// No cascade.
    pub fn remove(&mut self, handle: RegHandle, routers: &mut DefaultRouterList) {
        let reg = &mut self.entries[handle.0];
        if !reg.in_use {
            return;
        }
        reg.in_use = false;
        if let Some(router) = routers.get_mut(reg.defrt) {
            router.registration_count -= 1;
        }
    }

    pub fn lookup(&self, addr: AddrHandle, defrt: DefrtHandle) -> Option<RegHandle> {
        self.entries
            .iter()
            .position(|r| r.in_use && r.addr == addr && r.defrt == defrt)
            .map(RegHandle)
    }

    pub fn get(&self, handle: RegHandle) -> Option<&Registration> {
        self.entries.get(handle.0).filter(|r| r.in_use)
    }

    pub fn get_mut(&mut self, handle: RegHandle) -> Option<&mut Registration> {
        self.entries.get_mut(handle.0).filter(|r| r.in_use)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegHandle, &Registration)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, r)| r.in_use)
            .map(|(i, r)| (RegHandle(i), r))
    }

    /// Drops every registration naming `defrt`; called when the router
    /// itself goes away.
    pub fn cleanup_router(&mut self, defrt: DefrtHandle, routers: &mut DefaultRouterList) {
        for slot in 0..REG_LIST_SIZE {
            if self.entries[slot].in_use && self.entries[slot].defrt == defrt {
                self.remove(RegHandle(slot), routers);
            }
        }
    }

    /// Winds down every registration of `addr`. Unconfirmed bindings are
    /// dropped outright; confirmed ones are marked so the driver sends the
    /// zero-lifetime NS before deletion.
    pub fn cleanup_address(&mut self, addr: AddrHandle, routers: &mut DefaultRouterList) {
        for slot in 0..REG_LIST_SIZE {
            let reg = &mut self.entries[slot];
            if !reg.in_use || reg.addr != addr {
                continue;
            }
            if reg.state == RegState::Registered {
                reg.state = RegState::ToBeUnregistered;
            } else {
                self.remove(RegHandle(slot), routers);
            }
        }
    }

    /// Whether any non-garbage-collectible registration names `defrt`.
    pub fn pins_router(&self, defrt: DefrtHandle) -> bool {
        self.iter()
            .any(|(_, r)| r.defrt == defrt && r.state != RegState::GarbageCollectible)
    }
}
