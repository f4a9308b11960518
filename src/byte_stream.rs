//! Bounded in-memory byte FIFO shared by both halves of the endpoint.
//!
//! A [`ByteStream`] is the hand-off point between the protocol core and the
//! application: the sender drains one that the application writes into, and
//! the reassembler fills one that the application reads from. It enforces a
//! fixed capacity, signals end-of-input via [`ByteStream::close`], and
//! carries a sticky [`StreamError`] that poisons the connection.
//!
//! All operations are infallible: a push that does not fit is truncated,
//! a pop past the buffered bytes drains what is there. Callers observe the
//! counters to find out what actually happened.

use std::collections::VecDeque;

use thiserror::Error;

/// Reason a stream was torn down. Sticky: the first error recorded wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The peer reset the connection.
    #[error("connection reset by peer")]
    PeerReset,
    /// Too many consecutive retransmissions without an acknowledgment.
    #[error("retransmission limit exceeded")]
    RetransmitLimit,
}

/// A byte FIFO with fixed capacity, an end-of-input marker, and a sticky
/// error flag.
#[derive(Debug)]
pub struct ByteStream {
    capacity: usize,
    buf: VecDeque<u8>,
    bytes_pushed: u64,
    bytes_popped: u64,
    closed: bool,
    error: Option<StreamError>,
}

impl ByteStream {
    /// Create an empty stream holding at most `capacity` bytes at a time.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
            bytes_pushed: 0,
            bytes_popped: 0,
            closed: false,
            error: None,
        }
    }

    /// Append as much of `data` as fits; returns the number of bytes
    /// accepted. A closed stream accepts nothing.
    pub fn push(&mut self, data: &[u8]) -> usize {
        if self.closed {
            return 0;
        }
        let n = data.len().min(self.available_capacity());
        self.buf.extend(data[..n].iter().copied());
        self.bytes_pushed += n as u64;
        n
    }

    /// The longest contiguous run of buffered bytes starting at the head.
    ///
    /// May be shorter than [`ByteStream::bytes_buffered`] when the ring
    /// storage wraps; peek again after popping to see the rest.
    pub fn peek(&self) -> &[u8] {
        self.buf.as_slices().0
    }

    /// Discard up to `n` bytes from the head.
    pub fn pop(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.drain(..n);
        self.bytes_popped += n as u64;
    }

    /// Mark that no further bytes will ever be pushed. Idempotent.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Record a terminal error. The first recorded reason is kept.
    pub fn set_error(&mut self, error: StreamError) {
        self.error.get_or_insert(error);
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Room left for new bytes right now.
    pub fn available_capacity(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Bytes currently buffered (pushed but not yet popped).
    pub fn bytes_buffered(&self) -> usize {
        self.buf.len()
    }

    /// Cumulative bytes ever accepted by [`ByteStream::push`].
    pub fn bytes_pushed(&self) -> u64 {
        self.bytes_pushed
    }

    /// Cumulative bytes ever removed by [`ByteStream::pop`].
    pub fn bytes_popped(&self) -> u64 {
        self.bytes_popped
    }

    /// `true` once [`ByteStream::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closed and fully drained: the reader has seen every byte there will
    /// ever be.
    pub fn is_finished(&self) -> bool {
        self.closed && self.buf.is_empty()
    }

    /// `true` once an error has been recorded.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The recorded error, if any.
    pub fn error(&self) -> Option<StreamError> {
        self.error
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
