//! Wrap-around 32-bit sequence numbers.
//!
//! Sequence and acknowledgment numbers on the wire are 32 bits wide, while
//! the byte streams they describe are effectively unbounded. [`SeqNum`]
//! carries the 32-bit wire representation: [`SeqNum::wrap`] maps a 64-bit
//! absolute stream position onto the ring, and [`SeqNum::unwrap`] maps a
//! wire value back using a caller-supplied checkpoint to pick among the
//! infinitely many candidates.
//!
//! The checkpoint is the last known absolute position on the same direction
//! of the connection (the receiver uses its write frontier, the sender its
//! next unsent sequence number). The true value is always within 2³¹ of it,
//! so the nearest candidate is unambiguous.

use std::fmt;
use std::ops::Add;

/// A 32-bit sequence number on the wire, relative to an arbitrary initial
/// sequence number (ISN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqNum {
    raw: u32,
}

impl SeqNum {
    /// Wrap a raw 32-bit wire value.
    pub fn new(raw: u32) -> Self {
        Self { raw }
    }

    /// The raw 32-bit wire value.
    pub fn raw(self) -> u32 {
        self.raw
    }

    /// Map the absolute stream position `n` onto the ring anchored at
    /// `zero_point`.
    pub fn wrap(n: u64, zero_point: SeqNum) -> SeqNum {
        zero_point + n
    }

    /// Map this wire value back to the unique absolute position nearest
    /// `checkpoint`.
    ///
    /// Of the two candidates `checkpoint + fwd` and `checkpoint − back`
    /// (ring distances in `[0, 2³²)`), the closer one wins. A tie goes
    /// forward, and a backward candidate that would underflow below zero is
    /// never chosen.
    pub fn unwrap(self, zero_point: SeqNum, checkpoint: u64) -> u64 {
        let target = self.raw.wrapping_sub(zero_point.raw);
        let fwd = u64::from(target.wrapping_sub(checkpoint as u32));
        let back = u64::from((checkpoint as u32).wrapping_sub(target));

        if fwd <= back {
            checkpoint.wrapping_add(fwd)
        } else if checkpoint >= back {
            checkpoint - back
        } else {
            checkpoint.wrapping_add(fwd)
        }
    }
}

/// The point `rhs` slots past `self`, modulo 2³².
impl Add<u64> for SeqNum {
    type Output = SeqNum;

    fn add(self, rhs: u64) -> Self::Output {
        SeqNum {
            raw: self.raw.wrapping_add(rhs as u32),
        }
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_modular_addition() {
        assert_eq!(SeqNum::wrap(3, SeqNum::new(0)), SeqNum::new(3));
        assert_eq!(SeqNum::wrap(3, SeqNum::new(u32::MAX)), SeqNum::new(2));
        assert_eq!(
            SeqNum::wrap(1u64 << 32, SeqNum::new(7)),
            SeqNum::new(7),
            "wrapping a full ring lands back on the zero point"
        );
        assert_eq!(SeqNum::wrap(5, SeqNum::new(u32::MAX - 2)), SeqNum::new(2));
    }

    #[test]
    fn unwrap_near_small_checkpoints() {
        let zero = SeqNum::new(u32::MAX - 2);
        let wrapped = SeqNum::wrap(5, zero);
        assert_eq!(wrapped, SeqNum::new(2));

        // Nearest to 4 is 5 itself.
        assert_eq!(wrapped.unwrap(zero, 4), 5);
        // Nearest to 0 is still 5: the backward candidate would be negative.
        assert_eq!(wrapped.unwrap(zero, 0), 5);
    }

    #[test]
    fn unwrap_picks_nearest_ring_turn() {
        let zero = SeqNum::new(0);
        let wrapped = SeqNum::new(17);

        assert_eq!(wrapped.unwrap(zero, 16), 17);
        assert_eq!(wrapped.unwrap(zero, (1u64 << 32) - 1), (1u64 << 32) + 17);
        assert_eq!(wrapped.unwrap(zero, 3 * (1u64 << 32)), 3 * (1u64 << 32) + 17);
    }

    #[test]
    fn unwrap_ties_go_forward() {
        let zero = SeqNum::new(0);
        let half = 1u64 << 31;
        // Both candidates are exactly 2³¹ away from the checkpoint.
        let wrapped = SeqNum::wrap(half, zero);
        assert_eq!(wrapped.unwrap(zero, 0), half);
        assert_eq!(wrapped.unwrap(zero, 1u64 << 32), (1u64 << 32) + half);
    }

    #[test]
    fn unwrap_inverts_wrap_near_checkpoint() {
        let zeros = [SeqNum::new(0), SeqNum::new(1 << 31), SeqNum::new(u32::MAX)];
        let positions = [
            0u64,
            1,
            (1 << 31) - 1,
            1 << 31,
            (1 << 32) - 1,
            1 << 32,
            (1 << 32) + 1,
            (5 << 32) + 12345,
        ];
        for &zero in &zeros {
            for &n in &positions {
                let wrapped = SeqNum::wrap(n, zero);
                assert_eq!(wrapped.unwrap(zero, n), n, "round trip of {n} via {zero}");
            }
        }
    }

    #[test]
    fn unwrap_tolerates_distant_checkpoint() {
        let zero = SeqNum::new(42);
        let n = (7u64 << 32) + 1000;
        let wrapped = SeqNum::wrap(n, zero);
        // Any checkpoint within 2³¹ of the true value recovers it.
        assert_eq!(wrapped.unwrap(zero, n - ((1 << 31) - 1)), n);
        assert_eq!(wrapped.unwrap(zero, n + ((1 << 31) - 1)), n);
    }

    #[test]
    fn add_wraps_raw_value() {
        assert_eq!((SeqNum::new(u32::MAX) + 1).raw(), 0);
        assert_eq!((SeqNum::new(10) + (1u64 << 32)).raw(), 10);
    }
}
