//! IPv6 neighbor discovery data structures for 6LoWPAN nodes.
//!
//! The crate implements the table machinery behind RFC 4861/4862 plus the
//! 6LoWPAN-ND optimizations (address registration with routers, compression
//! contexts): fixed-capacity pools for neighbors, default routers, prefixes,
//! addresses, routes and registrations, and the periodic driver that evolves
//! their state machines under a one-packet-per-tick output budget.
//!
//! Packet I/O, wire formats and the clock live outside: the driver receives
//! the current tick and emits solicitations through the [`NdSender`] seam.
//!
//! ```
//! use sixlo::config::PERIOD;
//! use sixlo::{Interface, NdSender};
//! use sixlo_types::LinkLayerAddr;
//! use std::net::Ipv6Addr;
//!
//! struct Radio;
//! impl NdSender for Radio {
//!     fn send_ns(&mut self, _: Option<Ipv6Addr>, _: Ipv6Addr, _: Option<Ipv6Addr>, _: Option<u16>) {}
//!     fn send_rs(&mut self, _: Option<Ipv6Addr>) {}
//!     fn send_ra(&mut self, _: Option<Ipv6Addr>) {}
//! }
//!
//! let mut radio = Radio;
//! let mut iface = Interface::new(LinkLayerAddr::Mac48([2, 0, 0, 0, 0, 1]), 0);
//! for tick in (0..1000).step_by(PERIOD as usize) {
//!     iface.periodic(tick, &mut radio);
//! }
//! ```

#[macro_use]
mod macros;

pub mod addr;
pub mod config;
pub mod defrt;
pub mod nbr;
pub mod prefix;
pub mod reg;
pub mod route;
pub mod table;
pub mod time;

cfg_context! {
    pub mod context;
}

mod iface;
pub use iface::*;

mod output;
pub use output::NdSender;

mod periodic;
