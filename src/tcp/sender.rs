//! The sending half of a connection.

use std::collections::VecDeque;

use super::segment::{SegmentFlags, TcpAck, TcpSegment};
use super::sequence::Wrap32;
use crate::stream::{ByteStream, Writer};

/// Largest payload carried by a single segment.
pub const MAX_PAYLOAD_SIZE: usize = 1452;

/// Reads the outbound [`ByteStream`] and produces segments under the
/// peer's advertised window, retransmitting on timeout with
/// exponential backoff.
///
/// The caller owns pacing: `push` is invoked whenever the stream or
/// the window may have changed, `receive` delivers the peer's acks,
/// and `tick` advances the retransmission timer. Segments leave
/// through the `transmit` function passed into `push` and `tick`, so
/// the sender stays ignorant of the framing below it.
pub struct TcpSender {
    input: ByteStream,
    isn: Wrap32,
    /// Absolute seqno of the next byte to be sent.
    next_abs: u64,
    /// Highest cumulative ack seen so far.
    acked_abs: u64,
    window_size: u16,
    syn_sent: bool,
    fin_sent: bool,
    initial_rto_ms: u64,
    current_rto_ms: u64,
    timer_running: bool,
    timer_elapsed_ms: u64,
    consecutive_retx: u64,
    /// Sent but not yet fully acknowledged, in transmission order.
    outstanding: VecDeque<TcpSegment>,
}

impl TcpSender {
    /// The peer's window is taken to be one sequence number until the
    /// first ack says otherwise.
    pub fn new(input: ByteStream, isn: Wrap32, initial_rto_ms: u64) -> Self {
        TcpSender {
            input,
            isn,
            next_abs: 0,
            acked_abs: 0,
            window_size: 1,
            syn_sent: false,
            fin_sent: false,
            initial_rto_ms,
            current_rto_ms: initial_rto_ms,
            timer_running: false,
            timer_elapsed_ms: 0,
            consecutive_retx: 0,
            outstanding: VecDeque::new(),
        }
    }

    /// Produce as many segments as the stream and the window allow.
    ///
    /// The first segment ever sent carries the SYN; the segment that
    /// drains a closed stream carries the FIN, window permitting. A
    /// zero window is probed as if it were one sequence number wide.
    pub fn push(&mut self, mut transmit: impl FnMut(&TcpSegment)) {
        if self.input.has_error() {
            transmit(&self.make_empty_message());
            return;
        }

        loop {
            let window = u64::from(self.window_size).max(1);
            let in_flight = self.sequence_numbers_in_flight();
            if in_flight >= window {
                return;
            }
            let mut space = window - in_flight;

            let mut flags = SegmentFlags::empty();
            let syn_here = !self.syn_sent;
            if syn_here {
                flags |= SegmentFlags::SYN;
                space -= 1;
            }

            let take = MAX_PAYLOAD_SIZE
                .min(space as usize)
                .min(self.input.bytes_buffered());
            let payload = self.input.reader().read(take);
            space -= payload.len() as u64;

            // The FIN needs a free sequence number in the window,
            // except on the opening segment, where a stream that is
            // already closed and drained ends the moment it starts.
            if self.input.is_closed()
                && self.input.bytes_buffered() == 0
                && !self.fin_sent
                && (syn_here || space >= 1)
            {
                flags |= SegmentFlags::FIN;
            }

            let segment = TcpSegment {
                seqno: Wrap32::wrap(self.next_abs, self.isn),
                flags,
                payload,
            };
            if segment.sequence_length() == 0 {
                return;
            }

            self.syn_sent |= segment.syn();
            self.fin_sent |= segment.fin();
            self.next_abs += segment.sequence_length();
            if !self.timer_running {
                self.start_timer();
            }
            transmit(&segment);
            self.outstanding.push_back(segment);

            if self.fin_sent {
                return;
            }
        }
    }

    /// An empty segment at the current seqno, suitable for probing or
    /// pure acks. Reports RST while the outbound stream is broken.
    pub fn make_empty_message(&self) -> TcpSegment {
        let mut flags = SegmentFlags::empty();
        if self.input.has_error() {
            flags |= SegmentFlags::RST;
        }
        TcpSegment {
            seqno: Wrap32::wrap(self.next_abs, self.isn),
            flags,
            payload: Vec::new(),
        }
    }

    /// Process an ack/window message from the peer's receiver.
    pub fn receive(&mut self, msg: &TcpAck) {
        if msg.rst {
            self.input.set_error();
            return;
        }

        self.window_size = msg.window_size;

        let Some(ackno) = msg.ackno else { return };
        let abs_ack = ackno.unwrap(self.isn, self.next_abs);
        if abs_ack > self.next_abs {
            // acknowledges something we never sent
            return;
        }

        let progress = abs_ack > self.acked_abs;
        if progress {
            self.acked_abs = abs_ack;
        }

        while let Some(front) = self.outstanding.front() {
            let start = front.seqno.unwrap(self.isn, self.next_abs);
            if start + front.sequence_length() <= abs_ack {
                self.outstanding.pop_front();
            } else {
                break;
            }
        }

        if progress {
            self.current_rto_ms = self.initial_rto_ms;
            self.consecutive_retx = 0;
            if self.outstanding.is_empty() {
                self.timer_running = false;
            } else {
                self.start_timer();
            }
        }
    }

    /// Advance the retransmission timer by `ms_since_last_tick`
    /// milliseconds. On expiry the earliest outstanding segment goes
    /// out again; the timeout doubles only when the peer has window,
    /// since a zero-window probe timing out says nothing about the
    /// network.
    pub fn tick(&mut self, ms_since_last_tick: u64, mut transmit: impl FnMut(&TcpSegment)) {
        self.timer_elapsed_ms += ms_since_last_tick;
        if !self.timer_running || self.timer_elapsed_ms < self.current_rto_ms {
            return;
        }

        let Some(front) = self.outstanding.front() else {
            return;
        };
        transmit(front);
        if self.window_size > 0 {
            self.consecutive_retx += 1;
            self.current_rto_ms *= 2;
        }
        self.start_timer();
    }

    /// How many sequence numbers are in flight, SYN and FIN included.
    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.outstanding.iter().map(TcpSegment::sequence_length).sum()
    }

    pub fn consecutive_retransmissions(&self) -> u64 {
        self.consecutive_retx
    }

    /// Write half of the outbound stream, for the application to feed.
    pub fn writer(&mut self) -> Writer<'_> {
        self.input.writer()
    }

    pub fn stream(&self) -> &ByteStream {
        &self.input
    }

    pub fn stream_mut(&mut self) -> &mut ByteStream {
        &mut self.input
    }

    fn start_timer(&mut self) {
        self.timer_running = true;
        self.timer_elapsed_ms = 0;
    }
}
