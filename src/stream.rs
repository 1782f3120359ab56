//! A bounded in-memory byte pipe with a producer half and a consumer
//! half.

use std::collections::VecDeque;

/// A FIFO of bytes with fixed capacity. The writer pushes bytes in and
/// eventually closes the stream; the reader peeks and pops them out.
/// Writes beyond the available capacity are truncated, so callers that
/// care about backpressure must check `available_capacity` (or the
/// count returned by `push`) themselves.
pub struct ByteStream {
    buf: VecDeque<u8>,
    capacity: usize,
    bytes_pushed: u64,
    bytes_popped: u64,
    closed: bool,
    error: bool,
}

impl ByteStream {
    pub fn new(capacity: usize) -> Self {
        ByteStream {
            buf: VecDeque::with_capacity(capacity),
            capacity,
            bytes_pushed: 0,
            bytes_popped: 0,
            closed: false,
            error: false,
        }
    }

    /// The producer half.
    pub fn writer(&mut self) -> Writer<'_> {
        Writer { stream: self }
    }

    /// The consumer half.
    pub fn reader(&mut self) -> Reader<'_> {
        Reader { stream: self }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bytes_buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn available_capacity(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Total bytes ever accepted by `push`.
    pub fn bytes_pushed(&self) -> u64 {
        self.bytes_pushed
    }

    /// Total bytes ever removed by `pop`.
    pub fn bytes_popped(&self) -> u64 {
        self.bytes_popped
    }

    /// The writer has declared the end of input.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closed and fully drained.
    pub fn is_finished(&self) -> bool {
        self.closed && self.buf.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Mark the stream as unrecoverably broken. One-way.
    pub fn set_error(&mut self) {
        self.error = true;
    }
}

/// Mutating view over the write half of a [`ByteStream`].
pub struct Writer<'a> {
    stream: &'a mut ByteStream,
}

impl Writer<'_> {
    /// Append as much of `data` as fits, returning how many bytes were
    /// accepted. Pushing to a closed stream is a no-op.
    pub fn push(&mut self, data: &[u8]) -> usize {
        if self.stream.closed {
            return 0;
        }
        let len = data.len().min(self.stream.available_capacity());
        self.stream.buf.extend(&data[..len]);
        self.stream.bytes_pushed += len as u64;
        len
    }

    /// Declare the end of input. Buffered bytes remain readable.
    pub fn close(&mut self) {
        self.stream.closed = true;
    }

    pub fn set_error(&mut self) {
        self.stream.set_error();
    }

    pub fn is_closed(&self) -> bool {
        self.stream.closed
    }

    pub fn available_capacity(&self) -> usize {
        self.stream.available_capacity()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.stream.bytes_pushed
    }
}

/// Mutating view over the read half of a [`ByteStream`].
pub struct Reader<'a> {
    stream: &'a mut ByteStream,
}

impl Reader<'_> {
    /// A view of the longest contiguous run at the front of the buffer.
    /// Empty iff the stream is empty.
    pub fn peek(&self) -> &[u8] {
        self.stream.buf.as_slices().0
    }

    /// Drop up to `n` bytes from the front.
    pub fn pop(&mut self, n: usize) {
        let n = n.min(self.stream.buf.len());
        self.stream.buf.drain(..n);
        self.stream.bytes_popped += n as u64;
    }

    /// Pop up to `n` bytes and return them.
    pub fn read(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.stream.buf.len());
        let out: Vec<u8> = self.stream.buf.drain(..n).collect();
        self.stream.bytes_popped += n as u64;
        out
    }

    pub fn is_finished(&self) -> bool {
        self.stream.is_finished()
    }

    pub fn has_error(&self) -> bool {
        self.stream.error
    }

    pub fn bytes_buffered(&self) -> usize {
        self.stream.buf.len()
    }

    pub fn bytes_popped(&self) -> u64 {
        self.stream.bytes_popped
    }
}
