//! Receive-side protocol logic.
//!
//! [`TcpReceiver`] turns inbound [`Segment`]s into [`Reassembler`] inserts
//! and answers with the cumulative acknowledgment and advertised window.
//! Its one piece of translation work is sequence-number unwrapping: wire
//! seqnos are 32-bit and relative to the peer's ISN, stream offsets are
//! 64-bit and absolute, and the write frontier of the inbound stream is the
//! checkpoint that disambiguates the mapping.
//!
//! This module only manages state; moving segments between peers is the
//! caller's responsibility (same pattern as [`crate::sender`]).

use crate::byte_stream::{ByteStream, StreamError};
use crate::config::MAX_WINDOW_SIZE;
use crate::reassembler::Reassembler;
use crate::segment::{AckSegment, Segment};
use crate::seqno::SeqNum;

/// Receive-side state for one connection.
#[derive(Debug)]
pub struct TcpReceiver {
    reassembler: Reassembler,
    /// The peer's ISN, captured from the first SYN. `None` until then; no
    /// segment is meaningful before it.
    zero_point: Option<SeqNum>,
}

impl TcpReceiver {
    /// Construct a receiver delivering into `reassembler`.
    pub fn new(reassembler: Reassembler) -> Self {
        Self {
            reassembler,
            zero_point: None,
        }
    }

    /// Process one inbound segment.
    pub fn receive(&mut self, segment: &Segment) {
        if segment.rst {
            log::warn!("[rcv] ← RST; poisoning inbound stream");
            self.reassembler
                .output_mut()
                .set_error(StreamError::PeerReset);
            return;
        }

        if segment.syn {
            log::debug!("[rcv] ← SYN isn={}", segment.seqno);
            self.zero_point = Some(segment.seqno);
        }
        let Some(zero_point) = self.zero_point else {
            return;
        };

        // A SYN's payload starts the stream at offset zero. Any other
        // segment's offset comes from unwrapping against the write
        // frontier; the `- 1` converts from sequence space (where the SYN
        // occupies slot zero) to stream space. A stale seqno that lands at
        // the SYN slot itself underflows far past the window and is
        // clipped away by the reassembler.
        let index = if segment.syn {
            0
        } else {
            let checkpoint = self.reassembler.output().bytes_pushed() + 1;
            segment
                .seqno
                .unwrap(zero_point, checkpoint)
                .wrapping_sub(1)
        };

        self.reassembler.insert(index, &segment.payload, segment.fin);
    }

    /// The receiver's half of the conversation: cumulative ack, advertised
    /// window, and the mirror of the inbound stream's error state.
    pub fn send(&self) -> AckSegment {
        let stream = self.reassembler.output();
        let window_size = stream
            .available_capacity()
            .min(MAX_WINDOW_SIZE as usize) as u16;

        // The ackno counts the SYN slot ahead of the stream, and the FIN
        // slot once the whole stream has been reassembled and closed.
        let ackno = self.zero_point.map(|zero_point| {
            zero_point + (stream.bytes_pushed() + 1 + u64::from(stream.is_closed()))
        });

        AckSegment {
            ackno,
            window_size,
            rst: stream.has_error(),
        }
    }

    /// Borrow the reassembler.
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// Borrow the inbound stream.
    pub fn stream(&self) -> &ByteStream {
        self.reassembler.output()
    }

    /// Borrow the inbound stream mutably (the application reads from it).
    pub fn stream_mut(&mut self) -> &mut ByteStream {
        self.reassembler.output_mut()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
