//! A user-space TCP/IP data-transport core: a bounded byte stream, a
//! stream reassembler, TCP sender/receiver state machines, and the
//! link-layer glue (ARP resolution, longest-prefix-match routing) to
//! move IPv4 datagrams over a simulated Ethernet link.
//!
//! Nothing here touches a real NIC or a clock. Frames enter through
//! explicit calls and time advances only through `tick`, so every
//! component is a deterministic state object.

pub mod error;
pub mod ip;
pub mod link;
pub mod router;
pub mod stream;
pub mod tcp;

pub use error::{NetError, Result};
pub use ip::InternetDatagram;
pub use link::ethernet::{EthernetFrame, MacAddr};
pub use link::interface::{NetworkInterface, OutputPort};
pub use router::Router;
pub use stream::ByteStream;
pub use tcp::reassembler::Reassembler;
pub use tcp::receiver::TcpReceiver;
pub use tcp::segment::{SegmentFlags, TcpAck, TcpSegment};
pub use tcp::sender::TcpSender;
pub use tcp::sequence::Wrap32;
