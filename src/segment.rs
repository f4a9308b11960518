//! Message value types exchanged between peers.
//!
//! Every message is either a [`Segment`] (sender → receiver: a patch of
//! sequence space carrying payload bytes plus SYN/FIN/RST flags) or an
//! [`AckSegment`] (receiver → sender: cumulative acknowledgment, advertised
//! window, RST). Both are already-parsed value objects; framing, checksums,
//! and byte layout live with the embedder.
//!
//! No I/O happens here — this is pure data.

use crate::seqno::SeqNum;

/// One sender-to-receiver message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Sequence number of the first slot this segment occupies (the SYN
    /// slot when `syn` is set, otherwise the first payload byte).
    pub seqno: SeqNum,
    /// Start of stream; occupies one sequence slot.
    pub syn: bool,
    /// Application bytes.
    pub payload: Vec<u8>,
    /// End of stream; occupies one sequence slot.
    pub fin: bool,
    /// The connection is dead.
    pub rst: bool,
}

impl Segment {
    /// A flagless, payloadless segment at `seqno`.
    pub fn empty(seqno: SeqNum) -> Self {
        Self {
            seqno,
            syn: false,
            payload: Vec::new(),
            fin: false,
            rst: false,
        }
    }

    /// Number of sequence slots this segment occupies: one per payload
    /// byte, plus one each for SYN and FIN.
    pub fn sequence_length(&self) -> u64 {
        u64::from(self.syn) + self.payload.len() as u64 + u64::from(self.fin)
    }
}

/// One receiver-to-sender message: what the receiver expects next and how
/// much it can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckSegment {
    /// Next sequence number the receiver expects. `None` until the peer's
    /// SYN has been seen.
    pub ackno: Option<SeqNum>,
    /// Advertised receive window in bytes.
    pub window_size: u16,
    /// The connection is dead.
    pub rst: bool,
}
