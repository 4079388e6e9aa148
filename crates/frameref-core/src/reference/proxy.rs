#![forbid(unsafe_code)]

//! Facade-intercepted reference over an object or array.

use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use super::Reactive;
use crate::effect::{EffectOptions, EffectRegistry, IntoEffects};
use crate::error::{FrameRefError, Result};
use crate::facade::{Facade, Interception, WriteHook};
use crate::frame::{FrameCoalescer, SharedScheduler};
use crate::node::{Container, Node, json_kind, lock_nested};

struct ProxyInner {
    root: Container,
    interception: Interception,
    hook: WriteHook,
    effects: EffectRegistry<Facade>,
    frames: FrameCoalescer,
}

impl ProxyInner {
    fn view(&self) -> Facade {
        Facade::new(
            Rc::clone(&self.root),
            Some(Rc::clone(&self.hook)),
            self.interception,
        )
    }

    fn dispatch(&self) {
        let view = self.view();
        self.effects.dispatch(&view);
    }

    fn schedule(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.frames.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch();
            }
        });
    }
}

/// A reference whose writes go through a [`Facade`].
///
/// The [`Interception`] chosen at construction decides which nested writes
/// are observed. Effects receive the observed root facade.
#[derive(Clone)]
pub struct ProxyRef {
    inner: Rc<ProxyInner>,
}

impl fmt::Debug for ProxyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRef")
            .field("interception", &self.inner.interception)
            .field("value", &self.snapshot())
            .field("effects", &self.inner.effects)
            .field("frames", &self.inner.frames)
            .finish()
    }
}

impl ProxyRef {
    /// Track `value`, which must be an object or array.
    ///
    /// # Errors
    ///
    /// [`FrameRefError::NotAContainer`] for a leaf value.
    pub fn new(value: Value, interception: Interception, scheduler: SharedScheduler) -> Result<Self> {
        match Node::from_json(value) {
            Node::Container(root) => Ok(Self::from_container(root, interception, scheduler)),
            Node::Leaf(leaf) => Err(FrameRefError::NotAContainer {
                kind: json_kind(&leaf),
            }),
        }
    }

    pub(crate) fn from_container(
        root: Container,
        interception: Interception,
        scheduler: SharedScheduler,
    ) -> Self {
        if interception == Interception::DeepInner {
            let locked = lock_nested(&root);
            tracing::trace!(message = "proxy.locked", slots = locked);
        }
        let inner = Rc::new_cyclic(|weak: &Weak<ProxyInner>| {
            let weak = weak.clone();
            let hook: WriteHook = Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.schedule();
                }
            });
            ProxyInner {
                root,
                interception,
                hook,
                effects: EffectRegistry::new(),
                frames: FrameCoalescer::new(scheduler),
            }
        });
        Self { inner }
    }

    /// The observed root facade.
    #[must_use]
    pub fn value(&self) -> Facade {
        self.inner.view()
    }

    #[must_use]
    pub fn interception(&self) -> Interception {
        self.inner.interception
    }

    /// Deep copy of the tracked value.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.inner.root.borrow().to_json()
    }
}

impl Reactive for ProxyRef {
    type View = Facade;

    fn effect(&self, effects: impl IntoEffects<Facade>, options: EffectOptions) {
        let added = self.inner.effects.register(effects, options.name.as_deref());
        if options.first_call && !added.is_empty() {
            let view = self.inner.view();
            for effect in &added {
                effect.call(&view);
            }
        }
    }

    fn call_effects(&self) {
        self.inner.dispatch();
    }

    fn is_effect_exist(&self, effects: impl IntoEffects<Facade>) -> bool {
        self.inner.effects.is_registered(effects)
    }

    fn effect_names(&self) -> Vec<String> {
        self.inner.effects.names()
    }

    fn is_pending(&self) -> bool {
        self.inner.frames.is_pending()
    }
}
