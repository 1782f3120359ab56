use thiserror::Error;

/// Errors surfaced by the stack's fallible operations.
///
/// Stream-level failures are deliberately not here: a broken
/// [`ByteStream`](crate::stream::ByteStream) carries a sticky in-band
/// error flag instead, because the peer learns about it through a RST
/// segment rather than a return value.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("invalid interface index: {0}")]
    InvalidInterface(usize),

    #[error("malformed ARP message")]
    MalformedArp,

    #[error("malformed IPv4 datagram: {0}")]
    MalformedDatagram(String),

    #[error("failed to serialize IPv4 datagram: {0}")]
    SerializeDatagram(String),
}

pub type Result<T> = std::result::Result<T, NetError>;
