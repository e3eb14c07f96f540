//! The seam between the core and the packet layer.

use crate::nbr::NeighborState;
use std::net::Ipv6Addr;

/// Outbound ND primitives the core invokes. Message construction, checksums
/// and transmission live behind this trait; the core only decides *what* to
/// send and *when*.
pub trait NdSender {
    /// Emits a neighbor solicitation.
    ///
    /// `src = None` leaves source selection to the packet layer, `dst = None`
    /// multicasts to the solicited-node group of `target`. `aro_lifetime`
    /// attaches an address registration option with the given lifetime in
    /// units of 60 s; zero requests deregistration.
    fn send_ns(
        &mut self,
        src: Option<Ipv6Addr>,
        target: Ipv6Addr,
        dst: Option<Ipv6Addr>,
        aro_lifetime: Option<u16>,
    );

    /// Emits a router solicitation, unicast to `dst` or multicast to
    /// all-routers when `dst = None`.
    fn send_rs(&mut self, dst: Option<Ipv6Addr>);

    /// Emits a router advertisement, unicast to `dst` or multicast to
    /// all-nodes when `dst = None`. Only invoked in the router role.
    fn send_ra(&mut self, dst: Option<Ipv6Addr>);

    /// Notification hook for neighbor cache changes, `None` meaning the entry
    /// was removed. Routing layers use this to drop stale next hops.
    fn neighbor_state_changed(&mut self, addr: Ipv6Addr, state: Option<NeighborState>) {
        let _ = (addr, state);
    }
}
