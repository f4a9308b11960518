//! The tick-driven retransmission timer.
//!
//! Reliable delivery requires that unacknowledged segments are re-sent if
//! no ACK arrives within a bounded time. [`RetransmitTimer`] tracks the
//! single retransmission timeout (RTO) covering the oldest outstanding
//! segment. It owns no clock: the embedder reports elapsed milliseconds
//! through [`RetransmitTimer::tick`] and the timer answers whether the
//! deadline passed.
//!
//! The RTO doubles on each [`RetransmitTimer::back_off`] (exponential
//! back-off, RFC 6298 §5.5) and snaps back to the initial value on
//! [`RetransmitTimer::reset`] when new data is acknowledged.

/// A retransmission timer: either idle or counting up toward the current
/// RTO.
#[derive(Debug)]
pub struct RetransmitTimer {
    /// RTO restored by [`RetransmitTimer::reset`].
    initial_rto_ms: u64,
    /// Current RTO; doubles on [`RetransmitTimer::back_off`].
    rto_ms: u64,
    /// Milliseconds accumulated since the timer was last armed or expired.
    elapsed_ms: u64,
    running: bool,
}

impl RetransmitTimer {
    /// Construct an idle timer with the given initial RTO.
    pub fn new(initial_rto_ms: u64) -> Self {
        Self {
            initial_rto_ms,
            rto_ms: initial_rto_ms,
            elapsed_ms: 0,
            running: false,
        }
    }

    /// `true` while the timer is armed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The current RTO in milliseconds.
    pub fn rto_ms(&self) -> u64 {
        self.rto_ms
    }

    /// Arm the timer, counting from zero at the current RTO.
    pub fn start(&mut self) {
        self.running = true;
        self.elapsed_ms = 0;
    }

    /// Disarm the timer.
    pub fn stop(&mut self) {
        self.running = false;
        self.elapsed_ms = 0;
    }

    /// Restore the initial RTO and restart the count. Called when new data
    /// is acknowledged.
    pub fn reset(&mut self) {
        self.rto_ms = self.initial_rto_ms;
        self.elapsed_ms = 0;
    }

    /// Double the RTO after a loss.
    pub fn back_off(&mut self) {
        self.rto_ms = self.rto_ms.saturating_mul(2);
    }

    /// Advance the timer by `ms` milliseconds. Returns `true` exactly when
    /// the deadline expires; the count then restarts from zero at the
    /// current RTO. An idle timer ignores ticks.
    pub fn tick(&mut self, ms: u64) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(ms);
        if self.elapsed_ms >= self.rto_ms {
            self.elapsed_ms = 0;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
