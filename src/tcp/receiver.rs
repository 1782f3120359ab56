//! The receiving half of a connection.

use super::reassembler::Reassembler;
use super::segment::{TcpAck, TcpSegment};
use super::sequence::Wrap32;
use crate::stream::ByteStream;

/// Turns incoming segments into the reassembled inbound stream and
/// reports the cumulative ack and advertised window back to the peer.
///
/// The SYN occupies absolute seqno 0 and the payload starts at stream
/// index 0, so the two index spaces are offset by one (plus one more
/// for the FIN once the whole stream has been reassembled).
pub struct TcpReceiver {
    isn: Option<Wrap32>,
    reassembler: Reassembler,
}

impl TcpReceiver {
    pub fn new(reassembler: Reassembler) -> Self {
        TcpReceiver {
            isn: None,
            reassembler,
        }
    }

    pub fn receive(&mut self, segment: &TcpSegment) {
        if segment.rst() {
            self.reassembler.stream_mut().set_error();
            return;
        }

        if segment.syn() && self.isn.is_none() {
            self.isn = Some(segment.seqno);
        }
        // No clue where the stream starts until a SYN arrives.
        let Some(isn) = self.isn else { return };

        let checkpoint = self.reassembler.stream().bytes_pushed();
        let abs_seqno = segment.seqno.unwrap(isn, checkpoint);
        if !segment.syn() && abs_seqno == 0 {
            // claims the SYN's slot but carries no stream byte
            return;
        }
        let stream_index = abs_seqno + segment.syn() as u64 - 1;
        self.reassembler
            .insert(stream_index, &segment.payload, segment.fin());
    }

    /// The ack/window message to hand back to the peer's sender.
    pub fn send(&self) -> TcpAck {
        let stream = self.reassembler.stream();
        let ackno = self.isn.map(|isn| {
            let mut abs_ackno = stream.bytes_pushed() + 1;
            if stream.is_closed() {
                abs_ackno += 1;
            }
            Wrap32::wrap(abs_ackno, isn)
        });
        TcpAck {
            ackno,
            window_size: stream.available_capacity().min(u16::MAX as usize) as u16,
            rst: stream.has_error(),
        }
    }

    pub fn stream(&self) -> &ByteStream {
        self.reassembler.stream()
    }

    pub fn stream_mut(&mut self) -> &mut ByteStream {
        self.reassembler.stream_mut()
    }

    pub fn count_bytes_pending(&self) -> u64 {
        self.reassembler.count_bytes_pending()
    }
}
