#![forbid(unsafe_code)]

//! Phased, gated rendering over a tracked value.
//!
//! A [`RenderState`] tracks an object or array through a deep facade. Each
//! observed write, while rendering is enabled, requests a render:
//!
//! ```text
//! write ──▶ tick N:   before_render*, render groups (group order, list order)
//!                     └─▶ tick N+1: after_render*
//! ```
//!
//! Writes made while rendering is disabled still land in storage but request
//! nothing. Re-enabling does not catch up; the next write or an explicit
//! [`RenderState::force_update_render`] does.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{FrameRefError, Result};
use crate::facade::{Facade, Interception, WriteHook};
use crate::frame::{FrameCoalescer, SharedScheduler};
use crate::node::{Container, Node, json_kind};

/// A phase callback. Receives the observed root facade.
pub type PhaseCallback = Rc<dyn Fn(&Facade)>;

/// Construction input for [`RenderState`].
pub struct RenderConfig {
    pub value: Value,
    pub before_render: Vec<PhaseCallback>,
    /// Render groups, run in insertion order.
    pub render_groups: IndexMap<String, Vec<PhaseCallback>>,
    pub after_render: Vec<PhaseCallback>,
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("value", &self.value)
            .field("before_render", &self.before_render.len())
            .field("render_groups", &self.render_groups.keys().collect::<Vec<_>>())
            .field("after_render", &self.after_render.len())
            .finish()
    }
}

impl RenderConfig {
    /// Track `value` with no callbacks yet.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            before_render: Vec::new(),
            render_groups: IndexMap::new(),
            after_render: Vec::new(),
        }
    }

    #[must_use]
    pub fn before(mut self, callback: impl Fn(&Facade) + 'static) -> Self {
        self.before_render.push(Rc::new(callback));
        self
    }

    /// Append `callback` to `group`, creating the group at the end of the
    /// group order on first use.
    #[must_use]
    pub fn render(mut self, group: impl Into<String>, callback: impl Fn(&Facade) + 'static) -> Self {
        self.render_groups
            .entry(group.into())
            .or_default()
            .push(Rc::new(callback));
        self
    }

    #[must_use]
    pub fn after(mut self, callback: impl Fn(&Facade) + 'static) -> Self {
        self.after_render.push(Rc::new(callback));
        self
    }
}

struct RenderInner {
    enabled: Cell<bool>,
    root: Container,
    hook: WriteHook,
    before_render: Vec<PhaseCallback>,
    render_groups: IndexMap<String, Vec<PhaseCallback>>,
    after_render: Vec<PhaseCallback>,
    frames: FrameCoalescer,
    after_frames: FrameCoalescer,
}

impl RenderInner {
    fn view(&self) -> Facade {
        Facade::new(
            Rc::clone(&self.root),
            Some(Rc::clone(&self.hook)),
            Interception::DeepAll,
        )
    }

    fn force_update_render(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.frames.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                inner.render_tick();
            }
        });
    }

    fn render_tick(self: &Rc<Self>) {
        let view = self.view();
        tracing::trace!(
            message = "render.tick",
            before = self.before_render.len(),
            groups = self.render_groups.len()
        );
        for callback in &self.before_render {
            callback(&view);
        }
        for group in self.render_groups.values() {
            for callback in group {
                callback(&view);
            }
        }

        let weak = Rc::downgrade(self);
        self.after_frames.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                inner.after_tick();
            }
        });
    }

    fn after_tick(&self) {
        let view = self.view();
        tracing::trace!(message = "render.after", after = self.after_render.len());
        for callback in &self.after_render {
            callback(&view);
        }
    }
}

/// Render controller: a deep-tracked value, three callback phases and an
/// enable gate.
///
/// After-render runs once per settled render: a render requested before the
/// pending after-render tick fires replaces it, and only the last render of
/// such a chain is followed by `after_render`.
///
/// ```
/// use std::rc::Rc;
/// use serde_json::json;
/// use frameref_core::frame::ManualFrames;
/// use frameref_core::render::{RenderConfig, RenderState};
///
/// let frames = Rc::new(ManualFrames::new());
/// let config = RenderConfig::new(json!({"value": 3}))
///     .render("input", |v| println!("value = {}", v.get_value("value").unwrap()));
/// let state = RenderState::new(config, frames.clone()).unwrap();
///
/// state.disable_rendering();
/// for _ in 0..100 {
///     let n = state.value().get("value").and_then(|f| f.as_i64()).unwrap();
///     state.value().set("value", n + 1).unwrap();
/// }
/// state.enable_rendering();
/// state.force_update_render();
/// ```
#[derive(Clone)]
pub struct RenderState {
    inner: Rc<RenderInner>,
}

impl fmt::Debug for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderState")
            .field("enabled", &self.inner.enabled.get())
            .field("value", &self.snapshot())
            .field("frames", &self.inner.frames)
            .field("after_frames", &self.inner.after_frames)
            .finish()
    }
}

impl RenderState {
    /// Install the callbacks, start tracking `config.value` and request the
    /// first render.
    ///
    /// # Errors
    ///
    /// [`FrameRefError::NotAContainer`] if the value is not an object or
    /// array.
    pub fn new(config: RenderConfig, scheduler: SharedScheduler) -> Result<Self> {
        let RenderConfig {
            value,
            before_render,
            render_groups,
            after_render,
        } = config;
        let root = match Node::from_json(value) {
            Node::Container(root) => root,
            Node::Leaf(leaf) => {
                return Err(FrameRefError::NotAContainer {
                    kind: json_kind(&leaf),
                });
            }
        };

        let inner = Rc::new_cyclic(|weak: &Weak<RenderInner>| {
            let weak = weak.clone();
            let hook: WriteHook = Rc::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if inner.enabled.get() {
                    inner.force_update_render();
                } else {
                    tracing::debug!(message = "render.gated");
                }
            });
            RenderInner {
                enabled: Cell::new(true),
                root,
                hook,
                before_render,
                render_groups,
                after_render,
                frames: FrameCoalescer::new(Rc::clone(&scheduler)),
                after_frames: FrameCoalescer::new(scheduler),
            }
        });
        inner.force_update_render();
        Ok(Self { inner })
    }

    /// Observed accessor: writes request a render while enabled.
    #[must_use]
    pub fn value(&self) -> Facade {
        self.inner.view()
    }

    /// Unobserved accessor over the same storage: writes never render.
    #[must_use]
    pub fn raw(&self) -> Facade {
        Facade::new(Rc::clone(&self.inner.root), None, Interception::DeepAll)
    }

    pub fn enable_rendering(&self) {
        self.inner.enabled.set(true);
        tracing::debug!(message = "render.enabled");
    }

    pub fn disable_rendering(&self) {
        self.inner.enabled.set(false);
        tracing::debug!(message = "render.disabled");
    }

    #[must_use]
    pub fn is_rendering_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    /// Cancel any pending render and request a new one, regardless of the
    /// gate.
    pub fn force_update_render(&self) {
        self.inner.force_update_render();
    }

    /// Whether a render or after-render tick is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.frames.is_pending() || self.inner.after_frames.is_pending()
    }

    /// Deep copy of the tracked value.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.inner.root.borrow().to_json()
    }
}
