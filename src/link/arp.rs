//! The ARP wire codec for IPv4 over Ethernet.

use std::net::Ipv4Addr;

use super::ethernet::MacAddr;
use crate::error::NetError;

const ARP_HW_ETHERNET: u16 = 1;
const ARP_PROTO_IPV4: u16 = 0x0800;
/// Fixed size of an ARP message for 6-byte hardware and 4-byte
/// protocol addresses.
pub const ARP_MESSAGE_LEN: usize = 28;

/// An ARP request or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpMessage {
    pub opcode: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpMessage {
    pub const OPCODE_REQUEST: u16 = 1;
    pub const OPCODE_REPLY: u16 = 2;

    /// Parse a message, rejecting anything that is not ARP for IPv4
    /// over Ethernet.
    pub fn parse(data: &[u8]) -> Result<Self, NetError> {
        if data.len() < ARP_MESSAGE_LEN {
            return Err(NetError::MalformedArp);
        }
        let hw_type = u16::from_be_bytes([data[0], data[1]]);
        let proto_type = u16::from_be_bytes([data[2], data[3]]);
        if hw_type != ARP_HW_ETHERNET || proto_type != ARP_PROTO_IPV4 {
            return Err(NetError::MalformedArp);
        }
        if data[4] != 6 || data[5] != 4 {
            return Err(NetError::MalformedArp);
        }

        let opcode = u16::from_be_bytes([data[6], data[7]]);
        let sender_mac = MacAddr([data[8], data[9], data[10], data[11], data[12], data[13]]);
        let sender_ip = Ipv4Addr::new(data[14], data[15], data[16], data[17]);
        let target_mac = MacAddr([data[18], data[19], data[20], data[21], data[22], data[23]]);
        let target_ip = Ipv4Addr::new(data[24], data[25], data[26], data[27]);

        Ok(ArpMessage {
            opcode,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        })
    }

    pub fn to_bytes(&self) -> [u8; ARP_MESSAGE_LEN] {
        let mut buf = [0u8; ARP_MESSAGE_LEN];
        buf[0..2].copy_from_slice(&ARP_HW_ETHERNET.to_be_bytes());
        buf[2..4].copy_from_slice(&ARP_PROTO_IPV4.to_be_bytes());
        buf[4] = 6;
        buf[5] = 4;
        buf[6..8].copy_from_slice(&self.opcode.to_be_bytes());
        buf[8..14].copy_from_slice(&self.sender_mac.0);
        buf[14..18].copy_from_slice(&self.sender_ip.octets());
        buf[18..24].copy_from_slice(&self.target_mac.0);
        buf[24..28].copy_from_slice(&self.target_ip.octets());
        buf
    }
}
