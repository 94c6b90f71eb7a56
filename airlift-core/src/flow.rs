//! Flow control
//!
//! A counter gate: after every `interval` accepted chunks the session sends
//! one acknowledgment so the client can stop queueing writes faster than
//! flash can absorb them. Correctness never depends on it.

/// Chunk counter gating periodic acknowledgments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowControl {
    interval: u32,
    chunk_count: u32,
}

impl FlowControl {
    /// Create a gate acknowledging every `interval` chunks (0 = never)
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            chunk_count: 0,
        }
    }

    /// Record one accepted chunk
    ///
    /// Returns true when an acknowledgment is due.
    pub fn on_chunk(&mut self) -> bool {
        self.chunk_count = self.chunk_count.wrapping_add(1);
        self.interval != 0 && self.chunk_count % self.interval == 0
    }

    /// Chunks accepted since the last reset
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    pub fn reset(&mut self) {
        self.chunk_count = 0;
    }
}
