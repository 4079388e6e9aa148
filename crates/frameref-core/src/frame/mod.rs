#![forbid(unsafe_code)]

//! Frame-tick scheduling.
//!
//! Everything in this crate that defers work does so through the
//! [`FrameScheduler`] port: a host primitive with `request(callback) -> handle`
//! and `cancel(handle)` semantics, roughly aligned to a display refresh.
//!
//! - [`FrameQueue`]: the shared bookkeeping used by every bundled host.
//! - [`ManualFrames`]: deterministic host for tests; frames fire only when
//!   [`ManualFrames::tick`] is called.
//! - [`PacedFrames`]: native host that fires at most one frame per
//!   configured interval.
//! - [`FrameCoalescer`]: one pending-frame slot. Scheduling cancels whatever
//!   the slot still holds, so N schedules before a tick collapse into one.
//!
//! # Invariants
//!
//! 1. A callback requested during a frame never runs in that same frame.
//! 2. Callbacks of one frame run in request order.
//! 3. Cancelling a handle that already fired (or was never issued) is a no-op.

mod coalesce;
mod manual;
mod paced;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

pub use coalesce::FrameCoalescer;
pub use manual::ManualFrames;
pub use paced::{FRAME_INTERVAL_ENV, FrameConfig, PacedFrames};

/// Opaque identifier of a requested frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Wrap a raw host identifier.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Work deferred to a frame tick.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Host frame-tick primitive.
///
/// `request` must never run the callback synchronously; it fires on a later
/// turn of the host loop. `cancel` must tolerate handles that already fired.
pub trait FrameScheduler {
    /// Queue `callback` for the next frame tick.
    fn request(&self, callback: FrameCallback) -> FrameHandle;

    /// Drop a queued callback before it fires.
    fn cancel(&self, handle: FrameHandle);
}

/// Shared, single-threaded handle to a host scheduler.
pub type SharedScheduler = Rc<dyn FrameScheduler>;

/// Ordered queue of frame callbacks.
///
/// Building block for host schedulers: hosts call [`push`](Self::push) from
/// `request`, [`cancel`](Self::cancel) from `cancel`, and
/// [`run_frame`](Self::run_frame) from their tick source.
#[derive(Default)]
pub struct FrameQueue {
    next_id: Cell<u64>,
    frame_index: Cell<u64>,
    queued: RefCell<VecDeque<(FrameHandle, FrameCallback)>>,
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("queued", &self.len())
            .field("frame_index", &self.frame_index.get())
            .finish()
    }
}

impl FrameQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback and return its handle.
    pub fn push(&self, callback: FrameCallback) -> FrameHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let handle = FrameHandle(id);
        self.queued.borrow_mut().push_back((handle, callback));
        tracing::trace!(message = "frame.request", handle = id);
        handle
    }

    /// Remove a queued callback. Returns `true` if it was still queued.
    pub fn cancel(&self, handle: FrameHandle) -> bool {
        let mut queued = self.queued.borrow_mut();
        let before = queued.len();
        queued.retain(|(h, _)| *h != handle);
        let removed = queued.len() < before;
        if removed {
            tracing::trace!(message = "frame.cancel", handle = handle.0);
        }
        removed
    }

    /// Number of callbacks waiting for a frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queued.borrow().len()
    }

    /// Whether no callback is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queued.borrow().is_empty()
    }

    /// Number of frames run so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index.get()
    }

    /// Run one frame: every callback queued before this call, in order.
    ///
    /// The queue is not borrowed while a callback runs, so callbacks may
    /// request (next frame) or cancel (this frame or later) freely. A panic
    /// in a callback unwinds out of this call; callbacks after it stay queued.
    pub fn run_frame(&self) -> usize {
        let cutoff = self.next_id.get();
        let frame = self.frame_index.get() + 1;
        self.frame_index.set(frame);
        let mut fired = 0;
        loop {
            let next = {
                let mut queued = self.queued.borrow_mut();
                match queued.front() {
                    Some((handle, _)) if handle.0 <= cutoff => queued.pop_front(),
                    _ => None,
                }
            };
            let Some((handle, callback)) = next else {
                break;
            };
            tracing::trace!(message = "frame.fire", handle = handle.0, frame);
            callback();
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> FrameCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let make = move |n: u32| -> FrameCallback {
            let log = Rc::clone(&log_clone);
            Box::new(move || log.borrow_mut().push(n))
        };
        (log, make)
    }

    #[test]
    fn runs_in_request_order() {
        let queue = FrameQueue::new();
        let (log, make) = recorder();
        queue.push(make(1));
        queue.push(make(2));
        queue.push(make(3));
        assert_eq!(queue.run_frame(), 3);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_removes_only_target() {
        let queue = FrameQueue::new();
        let (log, make) = recorder();
        let first = queue.push(make(1));
        queue.push(make(2));
        assert!(queue.cancel(first));
        assert!(!queue.cancel(first));
        queue.run_frame();
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn requests_during_frame_wait_for_next_frame() {
        let queue = Rc::new(FrameQueue::new());
        let (log, make) = recorder();
        let queue_clone = Rc::clone(&queue);
        let late = make(2);
        queue.push(Box::new(move || {
            queue_clone.push(late);
        }));
        queue.push(make(1));

        assert_eq!(queue.run_frame(), 2);
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.run_frame(), 1);
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(queue.frame_index(), 2);
    }

    #[test]
    fn callback_can_cancel_later_callback_in_same_frame() {
        let queue = Rc::new(FrameQueue::new());
        let (log, make) = recorder();
        let victim = Rc::new(Cell::new(None));
        let queue_clone = Rc::clone(&queue);
        let victim_clone = Rc::clone(&victim);
        queue.push(Box::new(move || {
            if let Some(handle) = victim_clone.get() {
                queue_clone.cancel(handle);
            }
        }));
        victim.set(Some(queue.push(make(7))));

        assert_eq!(queue.run_frame(), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn handle_display() {
        assert_eq!(FrameHandle::from_raw(9).to_string(), "frame#9");
        assert_eq!(FrameHandle::from_raw(9).raw(), 9);
    }
}
