//! Wire Statistics
//!
//! Counts inbound binary frames per connection between two reports. Owned by
//! the connection task, so plain integers suffice; the only reset is the
//! read-and-reset in `take_snapshot`.

use std::time::{Duration, Instant};

/// Counters accumulated since the last snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireSnapshot {
    /// Frames received.
    pub frames: u64,
    /// Bytes received.
    pub bytes: u64,
    /// Largest single frame in bytes.
    pub max_frame: u64,
    /// Time covered by this snapshot.
    pub elapsed: Duration,
}

impl WireSnapshot {
    /// Average frame size in bytes.
    #[must_use]
    pub fn avg_frame(&self) -> u64 {
        self.bytes.checked_div(self.frames).unwrap_or(0)
    }

    /// Frames per second over the snapshot period.
    #[must_use]
    pub fn frames_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let frames = self.frames as f64;
            frames / secs
        } else {
            0.0
        }
    }
}

/// Per-connection frame counters.
#[derive(Debug)]
pub struct WireStats {
    frames: u64,
    bytes: u64,
    max_frame: u64,
    since: Instant,
}

impl Default for WireStats {
    fn default() -> Self {
        Self::new()
    }
}

impl WireStats {
    /// Start counting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: 0,
            bytes: 0,
            max_frame: 0,
            since: Instant::now(),
        }
    }

    /// Count one frame of `len` bytes.
    pub fn record(&mut self, len: usize) {
        let len = u64::try_from(len).unwrap_or(u64::MAX);
        self.frames += 1;
        self.bytes = self.bytes.saturating_add(len);
        self.max_frame = self.max_frame.max(len);
    }

    /// Read the counters and start a new period.
    pub fn take_snapshot(&mut self) -> WireSnapshot {
        let now = Instant::now();
        let snapshot = WireSnapshot {
            frames: self.frames,
            bytes: self.bytes,
            max_frame: self.max_frame,
            elapsed: now.duration_since(self.since),
        };
        self.frames = 0;
        self.bytes = 0;
        self.max_frame = 0;
        self.since = now;
        snapshot
    }
}
