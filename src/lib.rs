//! `tcp-endpoint` — the protocol core of a user-space TCP endpoint.
//!
//! # Architecture
//!
//! ```text
//!  peer ──segments──▶ ┌─────────────┐    ┌─────────────┐    ┌────────────┐
//!                     │ TcpReceiver │───▶│ Reassembler │───▶│ ByteStream │──▶ app
//!                     └─────────────┘    └─────────────┘    └────────────┘
//!
//!  app ──▶ ┌────────────┐    ┌───────────┐
//!          │ ByteStream │───▶│ TcpSender │──segments──▶ peer
//!          └────────────┘    └─────┬─────┘
//!                                  │
//!  peer ──acks / windows───────────┘
//! ```
//!
//! Two independent pipelines, one per direction, glued together by the
//! wrap-around sequence-number arithmetic in [`seqno`]. The core is
//! single-threaded and cooperative: no operation blocks and no I/O happens
//! anywhere in this crate. Segments arrive as already-parsed value objects
//! and leave through a caller-supplied transmit callback; the embedder owns
//! sockets, framing, checksums, and the clock that drives
//! [`sender::TcpSender::tick`].
//!
//! Each module has a single responsibility:
//! - [`seqno`]       — wrap-around 32-bit sequence-number arithmetic
//! - [`byte_stream`] — bounded byte FIFO with end-of-input and error signals
//! - [`reassembler`] — out-of-order substring buffering, in-order delivery
//! - [`segment`]     — message value types exchanged between peers
//! - [`receiver`]    — inbound segments → reassembler, acks and windows out
//! - [`sender`]      — outbound stream → segments, retransmit queue, RTO timer
//! - [`timer`]       — the tick-driven retransmission timer
//! - [`config`]      — protocol constants

pub mod byte_stream;
pub mod config;
pub mod reassembler;
pub mod receiver;
pub mod segment;
pub mod sender;
pub mod seqno;
pub mod timer;
