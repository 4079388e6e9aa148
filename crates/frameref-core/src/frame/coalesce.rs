#![forbid(unsafe_code)]

//! Single-slot frame coalescing.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::{FrameHandle, SharedScheduler};

#[derive(Default)]
struct PendingSlot {
    handle: Cell<Option<FrameHandle>>,
    /// Bumped on every schedule; a firing callback only clears the slot if
    /// it is still the latest one.
    generation: Cell<u64>,
}

/// One pending-frame slot over a host scheduler.
///
/// Every [`schedule`](Self::schedule) cancels the callback the slot still
/// holds and requests a new one, so any number of schedules before a tick
/// produce exactly one callback: the last one requested.
///
/// Cloning shares the slot.
#[derive(Clone)]
pub struct FrameCoalescer {
    scheduler: SharedScheduler,
    slot: Rc<PendingSlot>,
}

impl fmt::Debug for FrameCoalescer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCoalescer")
            .field("pending", &self.slot.handle.get())
            .field("generation", &self.slot.generation.get())
            .finish()
    }
}

impl FrameCoalescer {
    /// Create an empty slot on `scheduler`.
    #[must_use]
    pub fn new(scheduler: SharedScheduler) -> Self {
        Self {
            scheduler,
            slot: Rc::new(PendingSlot::default()),
        }
    }

    /// Replace whatever is pending with `work` on the next frame.
    pub fn schedule(&self, work: impl FnOnce() + 'static) {
        self.cancel();
        let generation = self.slot.generation.get().wrapping_add(1);
        self.slot.generation.set(generation);

        let slot = Rc::clone(&self.slot);
        let handle = self.scheduler.request(Box::new(move || {
            if slot.generation.get() == generation {
                slot.handle.set(None);
            }
            work();
        }));
        self.slot.handle.set(Some(handle));
    }

    /// Cancel the pending callback, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.slot.handle.take() {
            self.scheduler.cancel(previous);
        }
    }

    /// Whether a callback is waiting for a frame.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.handle.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ManualFrames;
    use std::cell::RefCell;

    fn setup() -> (Rc<ManualFrames>, FrameCoalescer) {
        let frames = Rc::new(ManualFrames::new());
        let coalescer = FrameCoalescer::new(frames.clone());
        (frames, coalescer)
    }

    #[test]
    fn many_schedules_collapse_to_last() {
        let (frames, coalescer) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for i in 0..5 {
            let seen = Rc::clone(&seen);
            coalescer.schedule(move || seen.borrow_mut().push(i));
        }
        assert_eq!(frames.pending(), 1);
        assert!(coalescer.is_pending());

        assert_eq!(frames.tick(), 1);
        assert_eq!(*seen.borrow(), vec![4]);
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn cancel_clears_slot() {
        let (frames, coalescer) = setup();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        coalescer.schedule(move || f.set(true));
        coalescer.cancel();
        assert!(!coalescer.is_pending());
        frames.tick();
        assert!(!fired.get());
    }

    #[test]
    fn schedule_from_inside_callback_lands_on_next_frame() {
        let (frames, coalescer) = setup();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let again = coalescer.clone();
        coalescer.schedule(move || {
            c.set(c.get() + 1);
            let c2 = Rc::clone(&c);
            again.schedule(move || c2.set(c2.get() + 1));
        });

        frames.tick();
        assert_eq!(count.get(), 1);
        assert!(coalescer.is_pending());
        frames.tick();
        assert_eq!(count.get(), 2);
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn separate_slots_do_not_cancel_each_other() {
        let frames = Rc::new(ManualFrames::new());
        let a = FrameCoalescer::new(frames.clone());
        let b = FrameCoalescer::new(frames.clone());
        a.schedule(|| {});
        b.schedule(|| {});
        assert_eq!(frames.pending(), 2);
    }
}
