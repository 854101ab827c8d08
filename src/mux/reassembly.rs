//! Per-stream reassembly buffer
//!
//! DATA frames for one stream may arrive in any order. The buffer holds
//! chunks that arrived ahead of the write cursor and releases them the
//! moment they become contiguous, so bytes reach the consumer socket in
//! ascending offset order with no gaps and no duplicates.

use bytes::Bytes;
use std::collections::BTreeMap;

/// Reorders out-of-sequence chunks into a gapless byte stream
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    /// Bytes delivered to the consumer so far
    write_cursor: u64,
    /// Chunks received ahead of the cursor, keyed by their starting offset
    pending: BTreeMap<u64, Bytes>,
}

impl ReassemblyBuffer {
    /// Create an empty buffer with the cursor at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write cursor
    pub fn write_cursor(&self) -> u64 {
        self.write_cursor
    }

    /// Number of chunks waiting for a gap to fill
    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    /// Insert a chunk at the given offset and return every chunk that is
    /// now deliverable, in ascending order.
    ///
    /// A chunk whose offset is below the cursor, or that duplicates an
    /// offset already pending, is discarded. The cursor advances by
    /// exactly the length of each returned chunk.
    pub fn insert(&mut self, offset: u64, payload: Bytes) -> Vec<Bytes> {
        if payload.is_empty() {
            return Vec::new();
        }

        if offset < self.write_cursor {
            // Replayed chunk; offsets are assigned from a monotone read
            // cursor on the sending side, so partial overlap cannot occur.
            return Vec::new();
        }

        if offset > self.write_cursor {
            self.pending.entry(offset).or_insert(payload);
            return Vec::new();
        }

        let mut ready = Vec::new();
        self.write_cursor += payload.len() as u64;
        ready.push(payload);

        // Drain pending chunks that the advanced cursor made contiguous
        while let Some(entry) = self.pending.first_entry() {
            let key = *entry.key();
            if key < self.write_cursor {
                // Duplicate that was buffered before its twin arrived
                entry.remove();
            } else if key == self.write_cursor {
                let chunk = entry.remove();
                self.write_cursor += chunk.len() as u64;
                ready.push(chunk);
            } else {
                break;
            }
        }

        ready
    }
}
