#![cfg(feature = "router")]

use sixlo::addr::AddrOrigin;
use sixlo::config::{MAX_MULTICAST_SOLICIT, PERIOD};
use sixlo::nbr::NeighborState;
use sixlo::time::{Ticks, CLOCK_SECOND};
use sixlo::{Interface, NdSender};
use sixlo_types::{Ipv6AddrExt, LinkLayerAddr};
use std::net::Ipv6Addr;

const MAC: LinkLayerAddr = LinkLayerAddr::Mac48([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Packet {
    Ns {
        src: Option<Ipv6Addr>,
        target: Ipv6Addr,
        dst: Option<Ipv6Addr>,
        aro: Option<u16>,
    },
    Rs {
        dst: Option<Ipv6Addr>,
    },
    Ra {
        dst: Option<Ipv6Addr>,
    },
}

#[derive(Default)]
struct Recorder {
    sent: Vec<Packet>,
    removed_neighbors: Vec<Ipv6Addr>,
}

impl Recorder {
    fn ras(&self) -> usize {
        self.sent.iter().filter(|p| matches!(p, Packet::Ra { .. })).count()
    }

    fn solicitations(&self) -> usize {
        self.sent
            .iter()
            .filter(|p| matches!(p, Packet::Ns { .. } | Packet::Rs { .. }))
            .count()
    }
}

impl NdSender for Recorder {
    fn send_ns(
        &mut self,
        src: Option<Ipv6Addr>,
        target: Ipv6Addr,
        dst: Option<Ipv6Addr>,
        aro: Option<u16>,
    ) {
        self.sent.push(Packet::Ns { src, target, dst, aro });
    }
    fn send_rs(&mut self, dst: Option<Ipv6Addr>) {
        self.sent.push(Packet::Rs { dst });
    }
    fn send_ra(&mut self, dst: Option<Ipv6Addr>) {
        self.sent.push(Packet::Ra { dst });
    }
    fn neighbor_state_changed(&mut self, addr: Ipv6Addr, state: Option<NeighborState>) {
        if state.is_none() {
            self.removed_neighbors.push(addr);
        }
    }
}

/// Runs the driver tick by tick. Advertisements are scheduled outside the
/// solicitation budget, so only NS/RS count against it.
fn drive(iface: &mut Interface, out: &mut Recorder, from: Ticks, to: Ticks) {
    let mut tick = from;
    while tick < to {
        let before = out.solicitations();
        iface.periodic(tick, out);
        assert!(
            out.solicitations() <= before + 1,
            "more than one solicitation emitted in the invocation at tick {tick}"
        );
        tick += PERIOD;
    }
}

#[test]
fn bootstrap_joins_router_groups() {
    let mut iface = Interface::with_seed(MAC, 0, 31);
    assert!(iface.is_my_maddr(Ipv6Addr::ALL_NODES));
    assert!(iface.is_my_maddr(Ipv6Addr::ALL_ROUTERS));

    let link_local = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0x00ff, 0xfe00, 0x0001);
    assert!(iface.is_my_addr(link_local));
    assert!(iface.prefixes.is_addr_on_link(link_local));

    // routers resolve addresses classically and join the solicited-node group
    let global = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
    iface.addr_add(0, global, 0, AddrOrigin::Manual).unwrap();
    assert!(iface.is_my_maddr(Ipv6Addr::solicited_node_multicast(global)));
}

#[test]
fn initial_ras_follow_the_warmup_schedule() {
    let mut iface = Interface::with_seed(MAC, 0, 32);
    let mut out = Recorder::default();

    // the 2 s warm-up draws a schedule but sends nothing yet; the first RA
    // leaves one clamped initial interval later
    drive(&mut iface, &mut out, 0, 18 * CLOCK_SECOND);
    assert_eq!(out.ras(), 0);
    drive(&mut iface, &mut out, 18 * CLOCK_SECOND, 18 * CLOCK_SECOND + PERIOD);
    assert_eq!(out.ras(), 1);
    assert_eq!(out.sent.last(), Some(&Packet::Ra { dst: None }));

    // second RA after another clamped interval
    drive(&mut iface, &mut out, 18 * CLOCK_SECOND + PERIOD, 34 * CLOCK_SECOND);
    assert_eq!(out.ras(), 1);
    drive(&mut iface, &mut out, 34 * CLOCK_SECOND, 34 * CLOCK_SECOND + PERIOD);
    assert_eq!(out.ras(), 2);
}

#[test]
fn solicited_ra_is_rate_limited() {
    let mut iface = Interface::with_seed(MAC, 0, 33);
    let mut out = Recorder::default();

    drive(&mut iface, &mut out, 0, 18 * CLOCK_SECOND + PERIOD);
    assert_eq!(out.ras(), 1);

    // an RS right after the RA may not be answered before the minimum gap
    let asked = 18 * CLOCK_SECOND + PERIOD;
    iface.send_ra_solicited(asked);
    drive(&mut iface, &mut out, asked, 21 * CLOCK_SECOND);
    assert_eq!(out.ras(), 1);
    drive(&mut iface, &mut out, 21 * CLOCK_SECOND, 21 * CLOCK_SECOND + PERIOD);
    assert_eq!(out.ras(), 2);
}

#[test]
fn solicited_ra_fires_promptly_outside_the_min_gap() {
    let mut iface = Interface::with_seed(MAC, 0, 34);
    let mut out = Recorder::default();

    drive(&mut iface, &mut out, 0, 18 * CLOCK_SECOND + PERIOD);
    assert_eq!(out.ras(), 1);

    // well past the minimum spacing: the answer goes out on the next tick
    iface.send_ra_solicited(25 * CLOCK_SECOND);
    drive(&mut iface, &mut out, 25 * CLOCK_SECOND, 25 * CLOCK_SECOND + PERIOD);
    assert_eq!(out.ras(), 2);
}

#[test]
fn incomplete_neighbor_is_solicited_then_dropped() {
    let mut iface = Interface::with_seed(MAC, 0, 35);
    let mut out = Recorder::default();
    let ip = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x42);

    iface
        .nbr_add(0, ip, None, false, NeighborState::Incomplete, &mut out)
        .unwrap();
    drive(&mut iface, &mut out, 0, 5 * CLOCK_SECOND);

    // multicast NS once per retransmission interval until the budget is gone
    let multicast_ns: Vec<_> = out
        .sent
        .iter()
        .filter(|p| {
            matches!(
                p,
                Packet::Ns { src: None, target, dst: None, aro: None } if *target == ip
            )
        })
        .collect();
    assert_eq!(multicast_ns.len(), usize::from(MAX_MULTICAST_SOLICIT));
    assert!(iface.nbrs.lookup(ip).is_none());
    assert!(out.removed_neighbors.contains(&ip));
}
