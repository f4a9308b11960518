//! Send-side protocol logic: segmentation, windowing, retransmission.
//!
//! [`TcpSender`] drains an application [`ByteStream`] into [`Segment`]s
//! subject to the peer's advertised window, keeps every unacknowledged
//! segment in a retransmit queue, and runs a single [`RetransmitTimer`]
//! over the oldest of them.
//!
//! # Protocol contract
//!
//! - ACKs are **cumulative**: an ackno of `K` confirms every sequence slot
//!   below `K`.
//! - At most one segment ever carries SYN and at most one carries FIN.
//! - A zero advertised window is probed with a single phantom slot, so one
//!   segment keeps the conversation alive until the window reopens.
//! - On timeout only the **oldest** outstanding segment is re-sent, byte
//!   for byte.
//!
//! This module only manages state; all segment delivery goes through the
//! caller-supplied `transmit` callback, which is invoked synchronously
//! from [`TcpSender::push`] and [`TcpSender::tick`] and must not re-enter
//! the sender.

use std::collections::VecDeque;

use crate::byte_stream::{ByteStream, StreamError};
use crate::config::{MAX_PAYLOAD_SIZE, MAX_RETX_ATTEMPTS};
use crate::segment::{AckSegment, Segment};
use crate::seqno::SeqNum;
use crate::timer::RetransmitTimer;

// ---------------------------------------------------------------------------
// Outstanding
// ---------------------------------------------------------------------------

/// A single in-flight segment occupying one slot in the retransmit queue.
#[derive(Debug)]
struct Outstanding {
    /// Absolute sequence number of the segment's first slot.
    start: u64,
    /// The segment exactly as first transmitted.
    segment: Segment,
}

impl Outstanding {
    /// First absolute sequence number after this segment.
    fn end(&self) -> u64 {
        self.start + self.segment.sequence_length()
    }
}

// ---------------------------------------------------------------------------
// TcpSender
// ---------------------------------------------------------------------------

/// Send-side state for one connection.
///
/// # Sequence-number layout
///
/// ```text
///  send_base               next_seqno
///      │                       │
///  ────┼───────────────────────┼──────────────────▶ absolute seq space
///      │ ◀── outstanding ───▶  │ ◀── sendable ──▶
/// ```
#[derive(Debug)]
pub struct TcpSender {
    /// Application bytes waiting to be segmented.
    input: ByteStream,
    /// Our initial sequence number; absolute slot zero wraps to this.
    isn: SeqNum,
    /// Absolute sequence number of the next new slot to transmit.
    next_seqno: u64,
    /// Greatest cumulative ackno accepted so far (left window edge).
    send_base: u64,
    /// Sent-but-unacknowledged segments, oldest first.
    outstanding: VecDeque<Outstanding>,
    /// Peer's advertised window. Starts at 1: before the first ack the
    /// sender allows itself exactly the SYN.
    peer_window: u16,
    timer: RetransmitTimer,
    consecutive_retransmissions: u64,
    syn_sent: bool,
    fin_sent: bool,
}

impl TcpSender {
    /// Construct a sender draining `input`, numbering slots from `isn`,
    /// with the given initial retransmission timeout.
    pub fn new(input: ByteStream, isn: SeqNum, initial_rto_ms: u64) -> Self {
        Self {
            input,
            isn,
            next_seqno: 0,
            send_base: 0,
            outstanding: VecDeque::new(),
            peer_window: 1,
            timer: RetransmitTimer::new(initial_rto_ms),
            consecutive_retransmissions: 0,
            syn_sent: false,
            fin_sent: false,
        }
    }

    // -----------------------------------------------------------------------
    // Outbound path
    // -----------------------------------------------------------------------

    /// Emit as many segments as the window allows, draining the outbound
    /// stream. The SYN rides the first segment ever sent; the FIN rides
    /// the first segment with room for it after the stream finishes.
    pub fn push(&mut self, mut transmit: impl FnMut(&Segment)) {
        if self.input.has_error() {
            let mut rst = Segment::empty(SeqNum::wrap(self.next_seqno, self.isn));
            rst.rst = true;
            log::warn!("[send] → RST seq={}", rst.seqno);
            transmit(&rst);
            return;
        }

        loop {
            // A zero window is probed as if it held a single slot.
            let window = u64::from(self.peer_window).max(1);
            let remaining = (self.send_base + window).saturating_sub(self.next_seqno);
            if remaining == 0 {
                break;
            }

            let syn = !self.syn_sent;
            let limit = (remaining - u64::from(syn)).min(MAX_PAYLOAD_SIZE as u64);
            let payload = self.read_payload(limit as usize);

            let used = u64::from(syn) + payload.len() as u64;
            let fin = self.input.is_finished() && !self.fin_sent && used < remaining;
            if used == 0 && !fin {
                break;
            }

            let segment = Segment {
                seqno: SeqNum::wrap(self.next_seqno, self.isn),
                syn,
                payload,
                fin,
                rst: false,
            };
            log::debug!(
                "[send] → seq={} len={} syn={} fin={} in_flight={}",
                segment.seqno,
                segment.sequence_length(),
                segment.syn,
                segment.fin,
                self.next_seqno - self.send_base
            );
            transmit(&segment);

            self.next_seqno += segment.sequence_length();
            self.syn_sent |= syn;
            self.fin_sent |= fin;
            self.outstanding.push_back(Outstanding {
                start: self.next_seqno - segment.sequence_length(),
                segment,
            });
            if !self.timer.is_running() {
                self.timer.start();
            }
        }
    }

    /// An empty segment carrying the current `next_seqno`, for answering a
    /// peer when there is no new data to send. Mirrors the outbound
    /// stream's error state into RST.
    pub fn make_empty_message(&self) -> Segment {
        let mut segment = Segment::empty(SeqNum::wrap(self.next_seqno, self.isn));
        segment.rst = self.input.has_error();
        segment
    }

    // -----------------------------------------------------------------------
    // Inbound path (acks and windows)
    // -----------------------------------------------------------------------

    /// Process a cumulative acknowledgment from the peer.
    ///
    /// Segments wholly below the ackno leave the retransmit queue; the
    /// first new acknowledgment restores the initial RTO, clears the
    /// retransmission counter, and re-arms (or stops) the timer. An ackno
    /// for slots never sent is ignored, though its window update stands.
    pub fn receive(&mut self, ack: &AckSegment) {
        if ack.rst {
            log::warn!("[send] ← RST; poisoning outbound stream");
            self.input.set_error(StreamError::PeerReset);
        }
        self.peer_window = ack.window_size;

        let Some(ackno) = ack.ackno else {
            return;
        };
        let acked = ackno.unwrap(self.isn, self.next_seqno);
        if acked > self.next_seqno {
            log::debug!(
                "[send] ← ack {acked} beyond next_seqno {}; ignored",
                self.next_seqno
            );
            return;
        }

        let mut newly_acked = false;
        while let Some(front) = self.outstanding.front() {
            if front.end() > acked {
                break;
            }
            self.outstanding.pop_front();
            newly_acked = true;
        }
        if acked > self.send_base {
            self.send_base = acked;
        }

        if newly_acked {
            self.timer.reset();
            self.consecutive_retransmissions = 0;
            if self.outstanding.is_empty() {
                self.timer.stop();
            } else {
                self.timer.start();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Report that `ms_since_last_tick` milliseconds have passed.
    ///
    /// On RTO expiry the oldest outstanding segment is re-sent verbatim.
    /// The RTO doubles and the retransmission counter climbs only when the
    /// peer's window is open; probing a closed window is not treated as
    /// loss. Crossing [`MAX_RETX_ATTEMPTS`] poisons the outbound stream.
    pub fn tick(&mut self, ms_since_last_tick: u64, mut transmit: impl FnMut(&Segment)) {
        if !self.timer.tick(ms_since_last_tick) {
            return;
        }
        let Some(oldest) = self.outstanding.front() else {
            return;
        };

        log::debug!(
            "[send] timeout — retransmitting seq={} len={}",
            oldest.segment.seqno,
            oldest.segment.sequence_length()
        );
        transmit(&oldest.segment);

        if self.peer_window > 0 {
            self.timer.back_off();
            self.consecutive_retransmissions += 1;
            if self.consecutive_retransmissions >= MAX_RETX_ATTEMPTS {
                log::warn!(
                    "[send] {} consecutive retransmissions; giving up",
                    self.consecutive_retransmissions
                );
                self.input.set_error(StreamError::RetransmitLimit);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Observables
    // -----------------------------------------------------------------------

    /// Sequence slots sent but not yet cumulatively acknowledged.
    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.outstanding
            .iter()
            .map(|o| o.segment.sequence_length())
            .sum()
    }

    /// Consecutive retransmissions since the last new acknowledgment.
    pub fn consecutive_retransmissions(&self) -> u64 {
        self.consecutive_retransmissions
    }

    /// Borrow the outbound stream.
    pub fn stream(&self) -> &ByteStream {
        &self.input
    }

    /// Borrow the outbound stream mutably (the application writes to it).
    pub fn stream_mut(&mut self) -> &mut ByteStream {
        &mut self.input
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Pull up to `limit` bytes off the outbound stream.
    fn read_payload(&mut self, limit: usize) -> Vec<u8> {
        let mut payload = Vec::with_capacity(limit.min(self.input.bytes_buffered()));
        while payload.len() < limit {
            let chunk = self.input.peek();
            if chunk.is_empty() {
                break;
            }
            let take = chunk.len().min(limit - payload.len());
            payload.extend_from_slice(&chunk[..take]);
            self.input.pop(take);
        }
        payload
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RTO: u64 = 1000;

    fn sender(capacity: usize) -> TcpSender {
        TcpSender::new(ByteStream::new(capacity), SeqNum::new(0), RTO)
    }

    /// Run `push` and collect everything it transmits.
    fn push_all(s: &mut TcpSender) -> Vec<Segment> {
        let mut sent = Vec::new();
        s.push(|seg| sent.push(seg.clone()));
        sent
    }

    fn tick_all(s: &mut TcpSender, ms: u64) -> Vec<Segment> {
        let mut sent = Vec::new();
        s.tick(ms, |seg| sent.push(seg.clone()));
        sent
    }

    fn ack(ackno: u32, window_size: u16) -> AckSegment {
        AckSegment {
            ackno: Some(SeqNum::new(ackno)),
            window_size,
            rst: false,
        }
    }

    fn window_only(window_size: u16) -> AckSegment {
        AckSegment {
            ackno: None,
            window_size,
            rst: false,
        }
    }

    #[test]
    fn first_push_sends_syn() {
        let mut s = sender(16);
        let sent = push_all(&mut s);

        assert_eq!(sent.len(), 1);
        assert!(sent[0].syn);
        assert_eq!(sent[0].seqno, SeqNum::new(0));
        assert_eq!(sent[0].sequence_length(), 1);
        assert_eq!(s.sequence_numbers_in_flight(), 1);

        // The default window of one slot is now full.
        assert!(push_all(&mut s).is_empty());
    }

    #[test]
    fn syn_and_fin_share_a_segment_on_an_empty_stream() {
        let mut s = sender(16);
        s.stream_mut().close();
        s.receive(&window_only(10));

        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].syn);
        assert!(sent[0].fin);
        assert!(sent[0].payload.is_empty());
        assert_eq!(sent[0].sequence_length(), 2);
        assert_eq!(s.sequence_numbers_in_flight(), 2);

        s.receive(&ack(2, 10));
        assert_eq!(s.sequence_numbers_in_flight(), 0);
        assert!(push_all(&mut s).is_empty(), "SYN and FIN are sent once");
    }

    #[test]
    fn data_rides_the_syn_segment() {
        let mut s = sender(16);
        s.stream_mut().push(b"hello");
        s.receive(&window_only(64));

        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].syn);
        assert_eq!(sent[0].payload, b"hello");
        assert_eq!(s.sequence_numbers_in_flight(), 6);
    }

    #[test]
    fn push_respects_the_advertised_window() {
        let mut s = sender(64);
        s.stream_mut().push(b"abcdefghij");
        s.receive(&window_only(4));

        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].syn);
        assert_eq!(sent[0].payload, b"abc", "SYN takes one of four slots");

        // Acking everything reopens the window for the rest.
        s.receive(&ack(4, 4));
        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload, b"defg");
    }

    #[test]
    fn payload_splits_at_max_payload_size() {
        let mut s = sender(4096);
        s.stream_mut().push(&vec![b'x'; 2000]);
        s.receive(&window_only(u16::MAX));

        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].payload.len(), MAX_PAYLOAD_SIZE);
        assert_eq!(sent[1].payload.len(), 2000 - MAX_PAYLOAD_SIZE);
        assert_eq!(sent[1].seqno, SeqNum::new(1 + MAX_PAYLOAD_SIZE as u32));
    }

    #[test]
    fn fin_waits_for_window_space() {
        let mut s = sender(16);
        s.stream_mut().push(b"abc");
        s.stream_mut().close();
        s.receive(&window_only(4));

        // SYN + 3 bytes exhaust the window; no room for FIN yet.
        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].fin);

        s.receive(&ack(4, 4));
        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].fin);
        assert!(sent[0].payload.is_empty());
        assert_eq!(sent[0].seqno, SeqNum::new(4));
    }

    #[test]
    fn retransmission_backs_off_exponentially() {
        let mut s = sender(16);
        s.stream_mut().push(b"data");
        s.receive(&window_only(16));
        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);

        assert!(tick_all(&mut s, RTO - 1).is_empty());
        let retx = tick_all(&mut s, 1);
        assert_eq!(retx, sent, "oldest segment re-sent verbatim");
        assert_eq!(s.consecutive_retransmissions(), 1);

        // RTO has doubled to 2000.
        assert!(tick_all(&mut s, 1999).is_empty());
        let retx = tick_all(&mut s, 1);
        assert_eq!(retx, sent);
        assert_eq!(s.consecutive_retransmissions(), 2);

        // A new ack restores the initial RTO and clears the counter.
        s.receive(&ack(5, 16));
        assert_eq!(s.consecutive_retransmissions(), 0);
        assert_eq!(s.sequence_numbers_in_flight(), 0);
        assert!(tick_all(&mut s, 10 * RTO).is_empty(), "timer stopped");
    }

    #[test]
    fn ack_restarts_the_timer_for_the_next_oldest_segment() {
        let mut s = sender(16);
        s.stream_mut().push(b"ab");
        s.receive(&window_only(16));
        push_all(&mut s);

        s.stream_mut().push(b"cd");
        assert_eq!(push_all(&mut s).len(), 1);

        // Partial progress: the first segment (SYN + "ab") is acked after
        // most of an RTO has elapsed.
        tick_all(&mut s, RTO - 1);
        s.receive(&ack(3, 16));
        assert_eq!(s.sequence_numbers_in_flight(), 2);

        // The restarted timer counts a fresh RTO for the second segment.
        assert!(tick_all(&mut s, RTO - 1).is_empty());
        assert_eq!(tick_all(&mut s, 1).len(), 1);
    }

    #[test]
    fn zero_window_sends_a_single_probe() {
        let mut s = sender(16);
        push_all(&mut s); // SYN goes out under the default one-slot window
        s.receive(&ack(1, 0));
        s.stream_mut().push(b"xyz");

        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload, b"x", "one probe byte");
        assert_eq!(s.sequence_numbers_in_flight(), 1);
        assert!(push_all(&mut s).is_empty(), "only one probe at a time");
    }

    #[test]
    fn zero_window_probe_does_not_back_off() {
        let mut s = sender(16);
        push_all(&mut s);
        s.receive(&ack(1, 0));
        s.stream_mut().push(b"xyz");
        push_all(&mut s);

        for _ in 0..20 {
            let retx = tick_all(&mut s, RTO);
            assert_eq!(retx.len(), 1, "probe re-sent every initial RTO");
        }
        assert_eq!(s.consecutive_retransmissions(), 0);
        assert!(!s.stream().has_error());

        // Once the window opens the probe is acked and data flows again.
        s.receive(&ack(2, 16));
        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload, b"yz");
    }

    #[test]
    fn too_many_retransmissions_poison_the_stream() {
        let mut s = sender(16);
        s.stream_mut().push(b"data");
        s.receive(&window_only(16));
        push_all(&mut s);

        let mut rto = RTO;
        for n in 1..=MAX_RETX_ATTEMPTS {
            assert!(!s.stream().has_error());
            assert_eq!(tick_all(&mut s, rto).len(), 1);
            assert_eq!(s.consecutive_retransmissions(), n);
            rto *= 2;
        }
        assert!(s.stream().has_error());
        assert_eq!(s.stream().error(), Some(StreamError::RetransmitLimit));

        // A poisoned stream turns push into a naked RST.
        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].rst);
        assert_eq!(sent[0].sequence_length(), 0);
        assert!(s.make_empty_message().rst);
    }

    #[test]
    fn ack_of_unsent_slots_is_ignored_but_window_sticks() {
        let mut s = sender(16);
        push_all(&mut s); // SYN, next_seqno = 1

        s.receive(&ack(5, 32));
        assert_eq!(s.sequence_numbers_in_flight(), 1, "bogus ack ignored");

        // The window update from the bogus ack still applies.
        s.stream_mut().push(b"ab");
        s.receive(&ack(1, 32));
        let sent = push_all(&mut s);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload, b"ab");
    }

    #[test]
    fn duplicate_acks_do_not_reset_the_backoff() {
        let mut s = sender(16);
        push_all(&mut s);
        s.receive(&ack(1, 16));
        s.stream_mut().push(b"ab");
        push_all(&mut s);

        tick_all(&mut s, RTO);
        assert_eq!(s.consecutive_retransmissions(), 1);

        // Re-acking old data must not touch the timer or the counter.
        s.receive(&ack(1, 16));
        assert_eq!(s.consecutive_retransmissions(), 1);
        assert!(tick_all(&mut s, RTO).is_empty(), "doubled RTO still in force");
        assert_eq!(tick_all(&mut s, RTO).len(), 1);
    }

    #[test]
    fn make_empty_message_carries_next_seqno() {
        let mut s = sender(16);
        assert_eq!(s.make_empty_message().seqno, SeqNum::new(0));
        assert_eq!(s.make_empty_message().sequence_length(), 0);

        push_all(&mut s); // SYN
        assert_eq!(s.make_empty_message().seqno, SeqNum::new(1));
    }

    #[test]
    fn rst_from_peer_poisons_the_outbound_stream() {
        let mut s = sender(16);
        s.receive(&AckSegment {
            ackno: None,
            window_size: 0,
            rst: true,
        });
        assert!(s.stream().has_error());
        assert_eq!(s.stream().error(), Some(StreamError::PeerReset));
    }

    #[test]
    fn in_flight_matches_the_unacked_span() {
        let mut s = sender(64);
        s.stream_mut().push(b"abcdefgh");
        s.receive(&window_only(6));

        push_all(&mut s);
        assert_eq!(s.sequence_numbers_in_flight(), 6);

        s.receive(&ack(6, 6));
        push_all(&mut s);
        assert_eq!(s.sequence_numbers_in_flight(), 3);
    }
}
