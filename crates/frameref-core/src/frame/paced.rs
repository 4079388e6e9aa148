#![forbid(unsafe_code)]

//! Interval-paced frame host for native event loops.
//!
//! [`PacedFrames`] stands in for a display-refresh callback where the host
//! has none: queued callbacks fire together on the first poll that lands at
//! least one [`FrameConfig::interval`] after the previous frame.

use std::cell::Cell;
use std::env;

use web_time::{Duration, Instant};

use super::{FrameCallback, FrameHandle, FrameQueue, FrameScheduler};
use crate::error::{FrameRefError, Result};

/// Environment variable overriding the frame interval, in milliseconds.
pub const FRAME_INTERVAL_ENV: &str = "FRAMEREF_FRAME_INTERVAL_MS";

/// Pacing configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameConfig {
    /// Minimum spacing between two frames.
    pub interval: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        // 60 Hz.
        Self {
            interval: Duration::from_micros(16_667),
        }
    }
}

impl FrameConfig {
    /// Config with an explicit interval.
    #[must_use]
    pub const fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Read [`FRAME_INTERVAL_ENV`], falling back to the default when unset.
    ///
    /// # Errors
    ///
    /// [`FrameRefError::InvalidConfig`] if the variable is set but is not a
    /// positive, finite number of milliseconds.
    pub fn from_env() -> Result<Self> {
        match env::var(FRAME_INTERVAL_ENV) {
            Ok(val) => Self::parse_interval_ms(&val),
            Err(_) => Ok(Self::default()),
        }
    }

    fn parse_interval_ms(val: &str) -> Result<Self> {
        let invalid = || FrameRefError::InvalidConfig {
            name: FRAME_INTERVAL_ENV,
            value: val.to_string(),
        };
        let ms: f64 = val.trim().parse().map_err(|_| invalid())?;
        if !ms.is_finite() || ms <= 0.0 {
            return Err(invalid());
        }
        let micros = (ms * 1000.0).round().max(1.0) as u64;
        Ok(Self::with_interval(Duration::from_micros(micros)))
    }
}

/// Frame host that fires at most once per configured interval.
#[derive(Debug)]
pub struct PacedFrames {
    queue: FrameQueue,
    config: FrameConfig,
    last_frame: Cell<Option<Instant>>,
}

impl Default for PacedFrames {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl PacedFrames {
    /// Create a host with the given pacing.
    #[must_use]
    pub fn new(config: FrameConfig) -> Self {
        Self {
            queue: FrameQueue::new(),
            config,
            last_frame: Cell::new(None),
        }
    }

    /// The pacing in use.
    #[must_use]
    pub fn config(&self) -> FrameConfig {
        self.config
    }

    /// Callbacks waiting for a frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Frames fired so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.queue.frame_index()
    }

    /// Earliest instant at which the next frame may fire, if anything is
    /// pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.queue.is_empty() {
            return None;
        }
        Some(match self.last_frame.get() {
            Some(last) => last + self.config.interval,
            None => Instant::now(),
        })
    }

    /// Fire a frame if one is due at `now`. Returns the callbacks run.
    pub fn poll(&self, now: Instant) -> usize {
        if self.queue.is_empty() {
            return 0;
        }
        if let Some(last) = self.last_frame.get()
            && now.duration_since(last) < self.config.interval
        {
            return 0;
        }
        self.last_frame.set(Some(now));
        self.queue.run_frame()
    }

    /// Sleep until the next frame is due, then fire it.
    ///
    /// Returns immediately with `0` when nothing is pending.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn wait_and_run(&self) -> usize {
        let Some(deadline) = self.next_deadline() else {
            return 0;
        };
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        let now = Instant::now().max(deadline);
        self.poll(now)
    }
}

impl FrameScheduler for PacedFrames {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        self.queue.push(callback)
    }

    fn cancel(&self, handle: FrameHandle) {
        self.queue.cancel(handle);
    }
}
