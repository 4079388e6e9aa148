#![forbid(unsafe_code)]

//! Deterministic frame host for tests and headless drivers.

use super::{FrameCallback, FrameHandle, FrameQueue, FrameScheduler};

/// A frame host whose ticks are advanced by hand.
///
/// Nothing fires until [`tick`](Self::tick) is called, which makes batching
/// and phase ordering observable without real timing.
///
/// ```
/// use std::rc::Rc;
/// use frameref_core::frame::{FrameScheduler, ManualFrames};
///
/// let frames = Rc::new(ManualFrames::new());
/// frames.request(Box::new(|| println!("tick")));
/// assert_eq!(frames.pending(), 1);
/// assert_eq!(frames.tick(), 1);
/// assert_eq!(frames.pending(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ManualFrames {
    queue: FrameQueue,
}

impl ManualFrames {
    /// Create a host with no pending frames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one frame. Returns the number of callbacks that ran.
    pub fn tick(&self) -> usize {
        self.queue.run_frame()
    }

    /// Tick until nothing is pending or `max_ticks` frames have run.
    ///
    /// Returns the number of frames run.
    pub fn run_until_idle(&self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && !self.queue.is_empty() {
            self.queue.run_frame();
            ticks += 1;
        }
        ticks
    }

    /// Callbacks waiting for the next tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Frames fired so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.queue.frame_index()
    }
}

impl FrameScheduler for ManualFrames {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        self.queue.push(callback)
    }

    fn cancel(&self, handle: FrameHandle) {
        self.queue.cancel(handle);
    }
}
