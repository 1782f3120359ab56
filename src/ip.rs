//! IPv4 datagrams: a parsed header plus an opaque payload.

use std::net::Ipv4Addr;

use etherparse::{IpNumber, Ipv4Header, Ipv4HeaderSlice};

use crate::error::NetError;

/// Default TTL for locally originated datagrams.
pub const DEFAULT_TTL: u8 = 64;

/// An IPv4 datagram. The header is kept parsed so the router can
/// mutate the TTL; the checksum is recomputed whenever the header is
/// written back out, so a mutated header never leaves with a stale
/// checksum.
#[derive(Debug, Clone)]
pub struct InternetDatagram {
    pub header: Ipv4Header,
    pub payload: Vec<u8>,
}

impl InternetDatagram {
    /// Build a datagram from `src` to `dst` with [`DEFAULT_TTL`].
    pub fn new(
        src: Ipv4Addr,
        dst: Ipv4Addr,
        proto: IpNumber,
        payload: Vec<u8>,
    ) -> Result<Self, NetError> {
        let len = u16::try_from(payload.len())
            .map_err(|_| NetError::SerializeDatagram("payload too large".into()))?;
        let header = Ipv4Header::new(len, DEFAULT_TTL, proto, src.octets(), dst.octets())
            .map_err(|err| NetError::SerializeDatagram(err.to_string()))?;
        Ok(InternetDatagram { header, payload })
    }

    pub fn parse(data: &[u8]) -> Result<Self, NetError> {
        let slice = Ipv4HeaderSlice::from_slice(data)
            .map_err(|err| NetError::MalformedDatagram(err.to_string()))?;
        let header_len = slice.slice().len();
        Ok(InternetDatagram {
            header: slice.to_header(),
            payload: data[header_len..].to_vec(),
        })
    }

    /// Serialize header and payload; the header checksum is
    /// recalculated on write.
    pub fn serialize(&self) -> Result<Vec<u8>, NetError> {
        let mut out = Vec::with_capacity(20 + self.payload.len());
        self.header
            .write(&mut out)
            .map_err(|err| NetError::SerializeDatagram(err.to_string()))?;
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    pub fn src(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.header.source)
    }

    pub fn dst(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.header.destination)
    }
}
