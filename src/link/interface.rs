//! The network interface: IPv4 datagrams in, Ethernet frames out, with
//! ARP resolution in between.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::rc::Rc;

use tracing::debug;

use super::arp::ArpMessage;
use super::ethernet::{EthernetFrame, MacAddr, ETHERTYPE_ARP, ETHERTYPE_IPV4};
use crate::ip::InternetDatagram;

/// How long a learned IP-to-Ethernet mapping stays usable.
pub const ARP_ENTRY_TTL_MS: u64 = 30_000;
/// How long after a probe before the same IP may be probed again.
pub const ARP_REQUEST_TTL_MS: u64 = 5_000;

/// The frame sink below an interface. This is the only polymorphic
/// seam in the stack, crossed once per outgoing frame.
pub trait OutputPort {
    fn transmit(&mut self, frame: EthernetFrame);
}

/// Lets tests and simple harnesses collect output with a plain queue.
impl OutputPort for VecDeque<EthernetFrame> {
    fn transmit(&mut self, frame: EthernetFrame) {
        self.push_back(frame);
    }
}

struct ArpEntry {
    mac: MacAddr,
    age_ms: u64,
}

/// Translates between IPv4 datagrams and Ethernet frames on one link.
///
/// Datagrams whose next hop has no known hardware address are parked
/// while a single ARP request goes out; the reply releases them in
/// order. Cache entries and unanswered probes age out via [`tick`],
/// taking their parked datagrams with them.
///
/// [`tick`]: NetworkInterface::tick
pub struct NetworkInterface {
    name: String,
    port: Rc<RefCell<dyn OutputPort>>,
    mac: MacAddr,
    ip: Ipv4Addr,
    /// next-hop IP (numeric) -> learned hardware address + age
    arp_cache: HashMap<u32, ArpEntry>,
    /// IPs with a probe in flight -> ms since the probe left
    pending_arp: HashMap<u32, u64>,
    /// datagrams awaiting resolution, FIFO per next-hop IP
    pending_datagrams: HashMap<u32, VecDeque<InternetDatagram>>,
    /// inbound datagrams for the owner (host stack or router) to drain
    datagrams_received: VecDeque<InternetDatagram>,
}

impl NetworkInterface {
    pub fn new(
        name: impl Into<String>,
        port: Rc<RefCell<dyn OutputPort>>,
        mac: MacAddr,
        ip: Ipv4Addr,
    ) -> Self {
        let name = name.into();
        debug!(%name, %mac, %ip, "network interface up");
        NetworkInterface {
            name,
            port,
            mac,
            ip,
            arp_cache: HashMap::new(),
            pending_arp: HashMap::new(),
            pending_datagrams: HashMap::new(),
            datagrams_received: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// Send `dgram` toward `next_hop`, resolving its hardware address
    /// first if necessary. With an unresolved next hop the datagram is
    /// parked and at most one ARP request per 5 s goes out for it.
    pub fn send_datagram(&mut self, dgram: InternetDatagram, next_hop: Ipv4Addr) {
        let next_hop_ip = u32::from(next_hop);

        if let Some(entry) = self.arp_cache.get(&next_hop_ip) {
            let dst = entry.mac;
            self.transmit_datagram(dst, &dgram);
            return;
        }

        self.pending_datagrams
            .entry(next_hop_ip)
            .or_default()
            .push_back(dgram);

        if self.pending_arp.contains_key(&next_hop_ip) {
            debug!(interface = %self.name, ip = %next_hop, "ARP probe already in flight");
            return;
        }

        let request = ArpMessage {
            opcode: ArpMessage::OPCODE_REQUEST,
            sender_mac: self.mac,
            sender_ip: self.ip,
            target_mac: MacAddr::ZERO,
            target_ip: next_hop,
        };
        self.transmit(EthernetFrame {
            dst: MacAddr::BROADCAST,
            src: self.mac,
            ethertype: ETHERTYPE_ARP,
            payload: request.to_bytes().to_vec(),
        });
        self.pending_arp.insert(next_hop_ip, 0);
    }

    /// Accept a frame from the link. Frames for other hosts, and
    /// payloads that do not parse, are dropped.
    pub fn recv_frame(&mut self, frame: EthernetFrame) {
        if frame.dst != self.mac && frame.dst != MacAddr::BROADCAST {
            debug!(interface = %self.name, dst = %frame.dst, "ignoring frame for another host");
            return;
        }

        match frame.ethertype {
            ETHERTYPE_ARP => match ArpMessage::parse(&frame.payload) {
                Ok(message) => self.handle_arp(message),
                Err(err) => debug!(interface = %self.name, %err, "dropping ARP frame"),
            },
            ETHERTYPE_IPV4 => match InternetDatagram::parse(&frame.payload) {
                Ok(dgram) => self.datagrams_received.push_back(dgram),
                Err(err) => debug!(interface = %self.name, %err, "dropping IPv4 frame"),
            },
            other => {
                debug!(interface = %self.name, ethertype = other, "ignoring unknown ethertype");
            }
        }
    }

    /// Inbound IPv4 datagrams, for the owner to drain.
    pub fn datagrams_received(&mut self) -> &mut VecDeque<InternetDatagram> {
        &mut self.datagrams_received
    }

    /// Advance time. Ages the ARP cache (entries die at 30 s) and the
    /// outstanding probes (5 s); both evictions also drop whatever
    /// datagrams were parked behind the evicted IP.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        let mut expired = Vec::new();
        for (&ip, entry) in &mut self.arp_cache {
            entry.age_ms += ms_since_last_tick;
            if entry.age_ms >= ARP_ENTRY_TTL_MS {
                expired.push(ip);
            }
        }
        for ip in expired {
            self.arp_cache.remove(&ip);
            self.pending_datagrams.remove(&ip);
        }

        let mut expired = Vec::new();
        for (&ip, age_ms) in &mut self.pending_arp {
            *age_ms += ms_since_last_tick;
            if *age_ms >= ARP_REQUEST_TTL_MS {
                expired.push(ip);
            }
        }
        for ip in expired {
            debug!(interface = %self.name, ip = %Ipv4Addr::from(ip), "ARP request expired");
            self.pending_arp.remove(&ip);
            self.pending_datagrams.remove(&ip);
        }
    }

    fn handle_arp(&mut self, message: ArpMessage) {
        let sender_ip = u32::from(message.sender_ip);

        // Learn (or refresh) the sender's mapping from any ARP
        // message, request or reply alike.
        self.arp_cache.insert(
            sender_ip,
            ArpEntry {
                mac: message.sender_mac,
                age_ms: 0,
            },
        );

        if message.opcode == ArpMessage::OPCODE_REQUEST && message.target_ip == self.ip {
            let reply = ArpMessage {
                opcode: ArpMessage::OPCODE_REPLY,
                sender_mac: self.mac,
                sender_ip: self.ip,
                target_mac: message.sender_mac,
                target_ip: message.sender_ip,
            };
            self.transmit(EthernetFrame {
                dst: message.sender_mac,
                src: self.mac,
                ethertype: ETHERTYPE_ARP,
                payload: reply.to_bytes().to_vec(),
            });
        }

        if message.opcode == ArpMessage::OPCODE_REPLY {
            if let Some(parked) = self.pending_datagrams.remove(&sender_ip) {
                for dgram in parked {
                    self.transmit_datagram(message.sender_mac, &dgram);
                }
            }
            self.pending_arp.remove(&sender_ip);
        }
    }

    fn transmit_datagram(&self, dst: MacAddr, dgram: &InternetDatagram) {
        let payload = match dgram.serialize() {
            Ok(payload) => payload,
            Err(err) => {
                debug!(interface = %self.name, %err, "dropping unserializable datagram");
                return;
            }
        };
        self.transmit(EthernetFrame {
            dst,
            src: self.mac,
            ethertype: ETHERTYPE_IPV4,
            payload,
        });
    }

    fn transmit(&self, frame: EthernetFrame) {
        self.port.borrow_mut().transmit(frame);
    }
}
