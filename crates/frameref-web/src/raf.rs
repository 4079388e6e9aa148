#![forbid(unsafe_code)]

//! `requestAnimationFrame` frame host.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use frameref_core::error::{FrameRefError, Result};
use frameref_core::frame::{FrameCallback, FrameHandle, FrameQueue, FrameScheduler};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

type RafClosure = Closure<dyn FnMut(f64)>;

struct RafInner {
    window: web_sys::Window,
    queue: FrameQueue,
    /// Registered with every `requestAnimationFrame` call; built once.
    closure: RefCell<Option<RafClosure>>,
    /// Outstanding browser request, if any. At most one is kept in flight;
    /// every queued callback rides on it.
    armed: Cell<Option<i32>>,
}

impl RafInner {
    fn arm(&self) {
        if self.armed.get().is_some() {
            return;
        }
        let guard = self.closure.borrow();
        let Some(closure) = guard.as_ref() else {
            return;
        };
        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(id) => self.armed.set(Some(id)),
            Err(err) => {
                tracing::warn!(message = "raf.request_failed", error = ?err);
            }
        }
    }

    fn disarm(&self) {
        if let Some(id) = self.armed.take()
            && let Err(err) = self.window.cancel_animation_frame(id)
        {
            tracing::warn!(message = "raf.cancel_failed", error = ?err);
        }
    }

    fn on_frame(&self) {
        self.armed.set(None);
        self.queue.run_frame();
        if !self.queue.is_empty() {
            self.arm();
        }
    }
}

/// Frame host backed by `window.requestAnimationFrame`.
///
/// Callbacks requested between two browser frames all run on the next one,
/// in request order. Only one browser request is outstanding at a time, and
/// it is withdrawn when the last queued callback is cancelled.
pub struct RafFrames {
    inner: Rc<RafInner>,
}

impl fmt::Debug for RafFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RafFrames")
            .field("queue", &self.inner.queue)
            .field("armed", &self.inner.armed.get())
            .finish()
    }
}

impl RafFrames {
    /// Bind to the global `window`.
    ///
    /// # Errors
    ///
    /// [`FrameRefError::HostUnavailable`] outside a browser window context
    /// (for example in a worker).
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| FrameRefError::host_unavailable("window"))?;
        let inner = Rc::new(RafInner {
            window,
            queue: FrameQueue::new(),
            closure: RefCell::new(None),
            armed: Cell::new(None),
        });

        let weak: Weak<RafInner> = Rc::downgrade(&inner);
        let closure = Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
            if let Some(inner) = weak.upgrade() {
                inner.on_frame();
            }
        });
        *inner.closure.borrow_mut() = Some(closure);
        Ok(Self { inner })
    }

    /// Callbacks waiting for the next browser frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    /// Browser frames that ran callbacks so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.inner.queue.frame_index()
    }
}

impl FrameScheduler for RafFrames {
    fn request(&self, callback: FrameCallback) -> FrameHandle {
        let handle = self.inner.queue.push(callback);
        self.inner.arm();
        handle
    }

    fn cancel(&self, handle: FrameHandle) {
        if self.inner.queue.cancel(handle) && self.inner.queue.is_empty() {
            self.inner.disarm();
        }
    }
}

impl Drop for RafFrames {
    fn drop(&mut self) {
        self.inner.disarm();
        self.inner.closure.borrow_mut().take();
    }
}
