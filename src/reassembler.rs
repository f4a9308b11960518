//! Out-of-order substring buffering and in-order delivery.
//!
//! Substrings of the inbound stream can arrive in any order, duplicated,
//! and partially overlapping. The [`Reassembler`] accepts each one tagged
//! with its absolute offset, buffers whatever cannot be delivered yet, and
//! pushes the longest contiguous prefix into its output [`ByteStream`].
//!
//! Storage is bounded by the window the output stream implies: bytes at or
//! past `frontier + available_capacity` are dropped and must be re-sent by
//! the peer, bytes below the frontier are already delivered and dropped
//! silently.
//!
//! ```text
//!        frontier (bytes_pushed)        window_end
//!            │                              │
//!  ──────────┼──────────────────────────────┼──────────▶ stream offset
//!  delivered │  buffered fragments, gaps    │ dropped
//! ```

use std::collections::BTreeMap;

use crate::byte_stream::ByteStream;

/// Reassembles arbitrarily fragmented substrings into an output stream.
#[derive(Debug)]
pub struct Reassembler {
    output: ByteStream,
    /// Pending fragments keyed by absolute offset. Pairwise disjoint and
    /// non-touching; every byte lies in `[frontier, window_end)`.
    fragments: BTreeMap<u64, Vec<u8>>,
    /// Set once the substring containing the final byte has been seen.
    end_seen: bool,
}

impl Reassembler {
    /// Construct a reassembler delivering into `output`.
    pub fn new(output: ByteStream) -> Self {
        Self {
            output,
            fragments: BTreeMap::new(),
            end_seen: false,
        }
    }

    /// Accept the substring `data` whose first byte sits at absolute offset
    /// `first_index`; `is_last` marks the substring containing the end of
    /// the stream.
    ///
    /// Delivers whatever prefix becomes contiguous, and closes the output
    /// stream once the end has been seen and every byte before it is
    /// delivered.
    pub fn insert(&mut self, first_index: u64, data: &[u8], is_last: bool) {
        let frontier = self.output.bytes_pushed();
        let window_end = frontier + self.output.available_capacity() as u64;
        let data_end = first_index.saturating_add(data.len() as u64);

        if is_last && data_end <= window_end {
            self.end_seen = true;
        }

        // Clip to the live window; out-of-window bytes will be re-sent.
        let start = first_index.max(frontier);
        let end = data_end.min(window_end);
        if start < end {
            let clipped = &data[(start - first_index) as usize..(end - first_index) as usize];
            self.store(start, clipped);
            self.deliver();
        }

        if self.end_seen && self.fragments.is_empty() {
            self.output.close();
        }
    }

    /// Total bytes buffered but not yet delivered downstream.
    pub fn bytes_pending(&self) -> u64 {
        self.fragments.values().map(|frag| frag.len() as u64).sum()
    }

    /// Borrow the output stream.
    pub fn output(&self) -> &ByteStream {
        &self.output
    }

    /// Borrow the output stream mutably (the application reads from it).
    pub fn output_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }

    /// Insert a clipped fragment, coalescing it with every stored fragment
    /// it overlaps or touches. On overlap, bytes that arrived earlier win.
    fn store(&mut self, start: u64, data: &[u8]) {
        let end = start + data.len() as u64;

        // The merge interval opens at the last stored fragment reaching
        // `start`, if any. No earlier fragment can reach it: stored
        // fragments never touch one another.
        let mut merged_start = start;
        if let Some((&left_start, left)) = self.fragments.range(..=start).next_back() {
            if left_start + left.len() as u64 >= start {
                merged_start = left_start;
            }
        }

        // Absorb every fragment starting inside the merge interval. Only
        // the last of them can extend past `end`, and nothing can touch
        // that extension: stored fragments never touch one another.
        let keys: Vec<u64> = self
            .fragments
            .range(merged_start..=end)
            .map(|(&key, _)| key)
            .collect();
        let mut merged_end = end;
        let mut absorbed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(frag) = self.fragments.remove(&key) {
                merged_end = merged_end.max(key + frag.len() as u64);
                absorbed.push((key, frag));
            }
        }

        // Lay the new bytes down first, then the absorbed fragments on
        // top, so previously stored bytes survive any overlap.
        let mut merged = vec![0u8; (merged_end - merged_start) as usize];
        let at = (start - merged_start) as usize;
        merged[at..at + data.len()].copy_from_slice(data);
        for (key, frag) in &absorbed {
            let at = (key - merged_start) as usize;
            merged[at..at + frag.len()].copy_from_slice(frag);
        }

        self.fragments.insert(merged_start, merged);
    }

    /// Push the contiguous run at the frontier into the output stream.
    fn deliver(&mut self) {
        while let Some(entry) = self.fragments.first_entry() {
            let key = *entry.key();
            if key != self.output.bytes_pushed() {
                break;
            }
            let frag = entry.remove();
            let written = self.output.push(&frag);
            if written < frag.len() {
                // Output full: re-key the unwritten tail at the new frontier.
                self.fragments
                    .insert(key + written as u64, frag[written..].to_vec());
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
