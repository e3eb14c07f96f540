//! Compile-time tuning of the neighbor discovery core.
//!
//! Table sizes follow the memory budget of a constrained node: every table is
//! a fixed in-place array, so each additional slot costs RAM whether used or
//! not. Timing constants are in the units noted on each item.

use crate::time::{Ticks, CLOCK_SECOND};

/// Neighbor cache capacity.
pub const NBR_NB: usize = 4;
/// Default router list capacity.
pub const DEFRT_NB: usize = 2;
/// Prefix list capacity.
pub const PREFIX_NB: usize = 3;
/// Routing table capacity.
pub const ROUTE_NB: usize = 4;
/// Unicast address list capacity.
pub const ADDR_NB: usize = 3;
/// Multicast address list capacity.
pub const MADDR_NB: usize = 4;
/// Anycast address list capacity.
pub const AADDR_NB: usize = 2;
/// Registration list capacity: one slot per (address, router) pair.
pub const REG_LIST_SIZE: usize = DEFRT_NB * ADDR_NB;
/// Context table capacity. Context ids at or above this are rejected.
#[cfg(feature = "6co")]
pub const CONTEXT_NB: usize = 4;

/// Interval of the periodic driver.
pub const PERIOD: Ticks = CLOCK_SECOND / 10;

/// Link MTU reported in the interface block (6LoWPAN minimum).
pub const LINK_MTU: u32 = 1280;
/// Default hop limit for originated packets.
pub const CUR_HOP_LIMIT: u8 = 64;

/// Base reachable time, in milliseconds (RFC 4861).
pub const REACHABLE_TIME: u32 = 30_000;
/// Retransmission interval for solicitations, in milliseconds (RFC 4861).
pub const RETRANS_TIMER: u32 = 1_000;
/// Delay before the first unicast probe of a STALE neighbor, in seconds.
pub const DELAY_FIRST_PROBE_TIME: u32 = 5;
/// Multicast NS retransmission budget for address resolution.
pub const MAX_MULTICAST_SOLICIT: u8 = 3;
/// Unicast NS retransmission budget for probes and registrations.
pub const MAX_UNICAST_SOLICIT: u8 = 3;

/// Start soliciting routers once the smallest remaining lifetime across
/// routers, prefixes and contexts drops below this many seconds.
pub const LIFETIME_THRESHOLD: u32 = 60;
/// Lifetime of a garbage-collectible registration, in seconds.
pub const GARBAGE_COLLECTIBLE_REG_LIFETIME: u32 = 20;
/// Lifetime of a tentative registration, in seconds.
pub const TENTATIVE_REG_LIFETIME: u32 = 20;
/// Lifetime requested in address registration options, in units of 60 s.
pub const REGISTRATION_LIFETIME: u16 = 5;

/// Number of RS attempts sent at the fixed interval before backing off.
pub const MAX_RTR_SOLICITATIONS: u8 = 3;
/// Interval between initial router solicitations, in seconds.
pub const RTR_SOLICITATION_INTERVAL: u16 = 10;
/// Upper bound on the RS backoff interval, in seconds.
pub const MAX_RTR_SOLICITATION_INTERVAL: u16 = 60;
/// Upper bound on the random delay before the first RS, in seconds.
pub const MAX_RTR_SOLICITATION_DELAY: u32 = 1;

/// Bounds for the periodic RA interval, in seconds.
pub const MIN_RA_INTERVAL: u32 = 198;
pub const MAX_RA_INTERVAL: u32 = 600;
/// Clamp applied to the first [`MAX_INITIAL_RAS`] intervals, in seconds.
pub const MAX_INITIAL_RA_INTERVAL: u32 = 16;
pub const MAX_INITIAL_RAS: u8 = 3;
/// Minimum spacing between two RAs, in seconds.
pub const MIN_DELAY_BETWEEN_RAS: u32 = 3;
