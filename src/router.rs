//! Longest-prefix-match forwarding between network interfaces.

use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use tracing::debug;

use crate::error::NetError;
use crate::ip::InternetDatagram;
use crate::link::interface::NetworkInterface;

/// A single forwarding rule.
#[derive(Debug, Clone, Copy)]
struct Route {
    prefix: u32,
    prefix_len: u8,
    /// Gateway address; absent for directly attached networks, where
    /// the datagram's own destination is the next hop.
    next_hop: Option<Ipv4Addr>,
    interface_idx: usize,
}

/// Moves datagrams between interfaces by longest-prefix match on the
/// destination address.
///
/// Interfaces are shared handles: the router consults them while their
/// owner keeps feeding them frames. The routing table is an unordered
/// list; among equally long matching prefixes the most recently added
/// route wins.
#[derive(Default)]
pub struct Router {
    interfaces: Vec<Rc<RefCell<NetworkInterface>>>,
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Router::default()
    }

    /// Register an interface, returning its index for `add_route`.
    pub fn add_interface(&mut self, interface: Rc<RefCell<NetworkInterface>>) -> usize {
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    /// Shared handle to a registered interface.
    ///
    /// Panics if `idx` was never returned by `add_interface`.
    pub fn interface(&self, idx: usize) -> Rc<RefCell<NetworkInterface>> {
        Rc::clone(&self.interfaces[idx])
    }

    /// Install a forwarding rule: datagrams whose destination matches
    /// the top `prefix_len` bits of `prefix` leave through interface
    /// `interface_idx`, toward `next_hop` if given and directly to the
    /// destination otherwise.
    pub fn add_route(
        &mut self,
        prefix: u32,
        prefix_len: u8,
        next_hop: Option<Ipv4Addr>,
        interface_idx: usize,
    ) -> Result<(), NetError> {
        if interface_idx >= self.interfaces.len() {
            return Err(NetError::InvalidInterface(interface_idx));
        }
        debug!(
            prefix = %Ipv4Addr::from(prefix),
            prefix_len,
            next_hop = ?next_hop,
            interface_idx,
            "route installed"
        );
        self.routes.push(Route {
            prefix,
            prefix_len,
            next_hop,
            interface_idx,
        });
        Ok(())
    }

    /// Drain every interface's inbound queue and forward each datagram
    /// to its proper outgoing interface.
    pub fn route(&mut self) {
        for idx in 0..self.interfaces.len() {
            let inbound: Vec<InternetDatagram> = self.interfaces[idx]
                .borrow_mut()
                .datagrams_received()
                .drain(..)
                .collect();
            for dgram in inbound {
                self.forward(dgram);
            }
        }
    }

    fn forward(&self, mut dgram: InternetDatagram) {
        if dgram.header.time_to_live <= 1 {
            debug!(dst = %dgram.dst(), "dropping datagram: TTL expired");
            return;
        }
        dgram.header.time_to_live -= 1;

        let dst = u32::from(dgram.dst());
        let Some(route) = self.lookup(dst) else {
            debug!(dst = %dgram.dst(), "dropping datagram: no route");
            return;
        };

        let next_hop = route.next_hop.unwrap_or_else(|| Ipv4Addr::from(dst));
        self.interfaces[route.interface_idx]
            .borrow_mut()
            .send_datagram(dgram, next_hop);
    }

    fn lookup(&self, dst: u32) -> Option<Route> {
        let mut best: Option<Route> = None;
        for route in &self.routes {
            if !prefix_matches(dst, route.prefix, route.prefix_len) {
                continue;
            }
            if best.map_or(true, |b| route.prefix_len >= b.prefix_len) {
                best = Some(*route);
            }
        }
        best
    }
}

fn prefix_matches(dst: u32, prefix: u32, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len >= 32 {
        return dst == prefix;
    }
    let mask = !((1u32 << (32 - prefix_len)) - 1);
    dst & mask == prefix & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_edges() {
        // default route matches anything
        assert!(prefix_matches(0xdead_beef, 0, 0));
        // host route needs exact equality
        assert!(prefix_matches(0x0a000001, 0x0a000001, 32));
        assert!(!prefix_matches(0x0a000002, 0x0a000001, 32));
        // /8 compares only the top octet
        assert!(prefix_matches(0x0a123456, 0x0a000000, 8));
        assert!(!prefix_matches(0x0b123456, 0x0a000000, 8));
        // a sloppy prefix with host bits set still matches after masking
        assert!(prefix_matches(0x0a000001, 0x0a0000ff, 24));
    }
}
