//! Protocol constants.
//!
//! Run-time parameters (stream capacity, initial RTO) are constructor
//! arguments on the components that need them; what lives here are the
//! compile-time constants of the protocol itself.

/// Most payload bytes one segment may carry. Sized so a segment fits a
/// 1500-byte MTU after IP and TCP headers with room for options.
pub const MAX_PAYLOAD_SIZE: usize = 1452;

/// Consecutive retransmissions of the same segment after which the
/// connection is declared dead.
pub const MAX_RETX_ATTEMPTS: u64 = 8;

/// Cap on the advertised receive window; the wire field is 16 bits wide.
pub const MAX_WINDOW_SIZE: u16 = u16::MAX;
