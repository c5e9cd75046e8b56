//! Frame Gate: fixed-interval admission for incoming frames
//!
//! Freshness over completeness: a frame arriving before the interval has
//! elapsed is dropped, never queued.

use crate::ANALYSIS_INTERVAL_MS;

#[derive(Debug, Clone)]
pub struct FrameGate {
    interval_ms: u64,
    last_admitted_ms: Option<u64>,
    dropped: u64,
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new(ANALYSIS_INTERVAL_MS)
    }
}

impl FrameGate {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_admitted_ms: None,
            dropped: 0,
        }
    }

    /// Admit the frame at `timestamp_ms`, or drop it
    pub fn admit(&mut self, timestamp_ms: u64) -> bool {
        let admit = match self.last_admitted_ms {
            None => true,
            Some(last) => timestamp_ms >= last && timestamp_ms - last >= self.interval_ms,
        };
        if admit {
            self.last_admitted_ms = Some(timestamp_ms);
        } else {
            self.dropped += 1;
        }
        admit
    }

    /// Frames dropped since the last reset
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.last_admitted_ms = None;
        self.dropped = 0;
    }
}
