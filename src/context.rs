//! The 6LoWPAN compression context table (6CO).
//!
//! Contexts are slotted by context id. A context whose valid lifetime runs
//! out is not dropped immediately: packets compressed against it may still be
//! in flight, so it stays usable for decompression for twice the advertising
//! router's lifetime, even if that router is long gone from the default
//! router list.

use crate::config::CONTEXT_NB;
use crate::defrt::DefrtHandle;
use crate::time::{Ticks, Timer};
use sixlo_types::nd::ContextOption;
use sixlo_types::Ipv6AddrExt;
use std::net::Ipv6Addr;

/// Lifecycle of a compression context. Once the advertised lifetime ends the
/// state only moves toward `NotInUse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    NotInUse,
    /// Valid for compression and decompression.
    Compress,
    /// Advertised without the compression flag; decompression only.
    UncompressOnly,
    /// Lifetime ran out; decompression only, for the grace period.
    Expired,
}

impl ContextState {
    pub fn can_compress(&self) -> bool {
        matches!(self, ContextState::Compress)
    }

    pub fn can_decompress(&self) -> bool {
        !matches!(self, ContextState::NotInUse)
    }
}

/// A compression context, slot index doubling as context id.
#[derive(Debug, Clone, Copy)]
pub struct AddrContext {
    pub state: ContextState,
    pub length: u8,
    pub prefix: Ipv6Addr,
    pub vlifetime: Timer,
    /// Advertising router's lifetime in seconds, captured at add time and
    /// capped at 0x7fff so the doubled grace period cannot overflow.
    pub defrt_lifetime: u16,
    /// The router that advertised this context.
    pub defrt: Option<DefrtHandle>,
}

impl AddrContext {
    const EMPTY: AddrContext = AddrContext {
        state: ContextState::NotInUse,
        length: 0,
        prefix: Ipv6Addr::UNSPECIFIED,
        vlifetime: Timer::EXPIRED,
        defrt_lifetime: 0,
        defrt: None,
    };
}

/// The context table.
#[derive(Debug)]
pub struct ContextTable {
    pub(crate) entries: [AddrContext; CONTEXT_NB],
}

impl ContextTable {
    pub fn new() -> ContextTable {
        ContextTable {
            entries: [AddrContext::EMPTY; CONTEXT_NB],
        }
    }

    /// Installs a context from a parsed 6CO option. Fails when the id is out
    /// of range or the slot is already occupied.
    pub fn add(
        &mut self,
        now: Ticks,
        option: &ContextOption,
        defrt_lifetime_secs: u32,
        defrt: Option<DefrtHandle>,
    ) -> Option<u8> {
        let slot = self.entries.get_mut(option.context_id as usize)?;
        if slot.state != ContextState::NotInUse {
            return None;
        }
        slot.state = if option.compress {
            ContextState::Compress
        } else {
            ContextState::UncompressOnly
        };
        slot.length = option.prefix_len;
        slot.prefix = option.prefix;
        slot.vlifetime = Timer::set_secs(now, u32::from(option.valid_lifetime));
        slot.defrt_lifetime = defrt_lifetime_secs.min(0x7fff) as u16;
        slot.defrt = defrt;
        log::debug!(
            target: "sixlo/context",
            "installed context {} for {}/{} ({:?})",
            option.context_id, option.prefix, option.prefix_len, slot.state
        );
        Some(option.context_id)
    }

    pub fn remove(&mut self, context_id: u8) {
        if let Some(slot) = self.entries.get_mut(context_id as usize) {
            slot.state = ContextState::NotInUse;
        }
    }

    pub fn lookup_by_id(&self, context_id: u8) -> Option<&AddrContext> {
        self.entries
            .get(context_id as usize)
            .filter(|c| c.state.can_decompress())
    }

    /// Longest matching context over all in-use entries.
    pub fn lookup_by_prefix(&self, prefix: Ipv6Addr) -> Option<u8> {
        let mut best: Option<(u8, u8)> = None;
        for (id, context) in self.entries.iter().enumerate() {
            if !context.state.can_decompress() {
                continue;
            }
            if prefix.matches_prefix(context.prefix, context.length)
                && best.map_or(true, |(_, len)| context.length > len)
            {
                best = Some((id as u8, context.length));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Advances the lifecycle of one slot on lifetime expiry: an active
    /// context enters the decompression grace period of twice the captured
    /// router lifetime, an already expired one frees the slot.
    pub(crate) fn step_expiry(&mut self, now: Ticks, context_id: usize) {
        let slot = &mut self.entries[context_id];
        match slot.state {
            ContextState::Compress | ContextState::UncompressOnly => {
                slot.state = ContextState::Expired;
                slot.vlifetime = Timer::set_secs(now, 2 * u32::from(slot.defrt_lifetime));
                log::debug!(
                    target: "sixlo/context",
                    "context {} expired, decompression grace of {} s",
                    context_id, 2 * u32::from(slot.defrt_lifetime)
                );
            }
            ContextState::Expired => {
                slot.state = ContextState::NotInUse;
                log::debug!(target: "sixlo/context", "context {} removed", context_id);
            }
            ContextState::NotInUse => {}
        }
    }
}
