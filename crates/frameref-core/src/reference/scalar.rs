#![forbid(unsafe_code)]

//! Setter-intercepted reference around a single value.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::Reactive;
use crate::effect::{EffectOptions, EffectRegistry, IntoEffects};
use crate::frame::{FrameCoalescer, SharedScheduler};

struct ScalarInner<T: 'static> {
    value: RefCell<T>,
    effects: EffectRegistry<T>,
    frames: FrameCoalescer,
}

impl<T: Clone + 'static> ScalarInner<T> {
    fn dispatch(&self) {
        // Effects see a copy so they may write back into the reference.
        let current = self.value.borrow().clone();
        self.effects.dispatch(&current);
    }
}

/// A reference whose every `set` schedules one coalesced notification.
///
/// Cloning yields another handle to the same reference. Effects receive
/// `&T`. The value itself is never inspected: any `T` is accepted and every
/// write notifies, equal or not.
///
/// ```
/// use std::rc::Rc;
/// use frameref_core::effect::{Effect, EffectOptions};
/// use frameref_core::frame::ManualFrames;
/// use frameref_core::reference::{Reactive, ScalarRef};
///
/// let frames = Rc::new(ManualFrames::new());
/// let count = ScalarRef::new(0, frames.clone());
/// count.effect(Effect::new(|n: &i32| println!("count = {n}")), EffectOptions::new());
///
/// count.set(1);
/// count.update(|n| *n += 1);
/// assert_eq!(frames.tick(), 1);
/// assert_eq!(count.get(), 2);
/// ```
pub struct ScalarRef<T: 'static> {
    inner: Rc<ScalarInner<T>>,
}

impl<T: 'static> Clone for ScalarRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ScalarRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarRef")
            .field("value", &self.inner.value.borrow())
            .field("effects", &self.inner.effects)
            .field("frames", &self.inner.frames)
            .finish()
    }
}

impl<T: Clone + 'static> ScalarRef<T> {
    /// Wrap `value`, scheduling notifications on `scheduler`.
    pub fn new(value: T, scheduler: SharedScheduler) -> Self {
        Self {
            inner: Rc::new(ScalarInner {
                value: RefCell::new(value),
                effects: EffectRegistry::new(),
                frames: FrameCoalescer::new(scheduler),
            }),
        }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes this same reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` and reschedule the notification.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.schedule();
    }

    /// Modify the value in place and reschedule the notification.
    ///
    /// # Panics
    ///
    /// Panics if `f` reads or writes this same reference.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.schedule();
    }

    fn schedule(&self) {
        let weak: Weak<ScalarInner<T>> = Rc::downgrade(&self.inner);
        self.inner.frames.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch();
            }
        });
    }
}

impl<T: Clone + 'static> Reactive for ScalarRef<T> {
    type View = T;

    fn effect(&self, effects: impl IntoEffects<T>, options: EffectOptions) {
        let added = self.inner.effects.register(effects, options.name.as_deref());
        if options.first_call && !added.is_empty() {
            let current = self.get();
            for effect in &added {
                effect.call(&current);
            }
        }
    }

    fn call_effects(&self) {
        self.inner.dispatch();
    }

    fn is_effect_exist(&self, effects: impl IntoEffects<T>) -> bool {
        self.inner.effects.is_registered(effects)
    }

    fn effect_names(&self) -> Vec<String> {
        self.inner.effects.names()
    }

    fn is_pending(&self) -> bool {
        self.inner.frames.is_pending()
    }
}
