//! The messages exchanged between the two halves of a connection.

use bitflags::bitflags;

use super::sequence::Wrap32;

bitflags! {
    /// Control flags carried by a segment.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u8 {
        const SYN = 1 << 0;
        const FIN = 1 << 1;
        const RST = 1 << 2;
    }
}

/// A segment from the sender half to the peer's receiver half: a
/// sequence number, control flags, and a payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub seqno: Wrap32,
    pub flags: SegmentFlags,
    pub payload: Vec<u8>,
}

impl TcpSegment {
    pub fn syn(&self) -> bool {
        self.flags.contains(SegmentFlags::SYN)
    }

    pub fn fin(&self) -> bool {
        self.flags.contains(SegmentFlags::FIN)
    }

    pub fn rst(&self) -> bool {
        self.flags.contains(SegmentFlags::RST)
    }

    /// How many sequence numbers this segment occupies. SYN and FIN
    /// each take one, in addition to the payload bytes.
    pub fn sequence_length(&self) -> u64 {
        self.syn() as u64 + self.payload.len() as u64 + self.fin() as u64
    }
}

/// The answer from the receiver half back to the peer's sender half:
/// the cumulative acknowledgment (absent until a SYN has been seen),
/// the advertised window, and the reset flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TcpAck {
    pub ackno: Option<Wrap32>,
    pub window_size: u16,
    pub rst: bool,
}
