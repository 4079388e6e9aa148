#![forbid(unsafe_code)]

//! Reactive references.
//!
//! A reference owns a value, an [`EffectRegistry`](crate::effect::EffectRegistry)
//! and a [`FrameCoalescer`](crate::frame::FrameCoalescer). Every observed
//! write cancels the pending notification and requests a new one, so all
//! writes before a frame tick are delivered as one dispatch of the final
//! state.
//!
//! | variant     | type                                   | observed writes                 |
//! |-------------|----------------------------------------|---------------------------------|
//! | `Scalar`    | [`ScalarRef<T>`]                       | `set` / `update`                |
//! | `Shallow`   | [`ProxyRef`] + `Interception::Shallow`   | top-level properties            |
//! | `DeepAll`   | [`ProxyRef`] + `Interception::DeepAll`   | any depth                       |
//! | `DeepInner` | [`ProxyRef`] + `Interception::DeepInner` | any depth, wrapped slots locked |
//!
//! [`create_reference`] picks the variant from the value and options.

mod proxy;
mod scalar;

use serde_json::Value;

pub use proxy::ProxyRef;
pub use scalar::ScalarRef;

use crate::effect::{EffectOptions, IntoEffects};
use crate::facade::Interception;
use crate::frame::SharedScheduler;
use crate::node::Node;

/// Behavior shared by every reference variant.
pub trait Reactive {
    /// What effects receive on dispatch.
    type View: ?Sized;

    /// Register effects; see [`EffectOptions`].
    ///
    /// Effects already registered anywhere on this reference are skipped. If
    /// nothing new remains the call does nothing at all; otherwise the new
    /// effects run once immediately unless `first_call` is `false`.
    fn effect(&self, effects: impl IntoEffects<Self::View>, options: EffectOptions);

    /// Run every effect now, outside the frame cycle.
    fn call_effects(&self);

    /// Whether every given effect is registered on this reference.
    fn is_effect_exist(&self, effects: impl IntoEffects<Self::View>) -> bool;

    /// Named groups in creation order.
    fn effect_names(&self) -> Vec<String>;

    /// Whether a notification is waiting for a frame.
    fn is_pending(&self) -> bool;
}

/// How a reference intercepts writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Facade for objects and arrays, setter for everything else.
    #[default]
    Auto,
    /// Setter even for objects and arrays; only whole-value replacement is
    /// observed.
    Setter,
}

/// Options for [`create_reference`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReferenceOptions {
    pub kind: RefKind,
    /// Depth policy for facade references. Ignored for scalars.
    pub interception: Interception,
}

impl ReferenceOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn setter() -> Self {
        Self {
            kind: RefKind::Setter,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deep_all() -> Self {
        Self::default().with_interception(Interception::DeepAll)
    }

    #[must_use]
    pub fn deep_inner() -> Self {
        Self::default().with_interception(Interception::DeepInner)
    }

    #[must_use]
    pub fn with_interception(mut self, interception: Interception) -> Self {
        self.interception = interception;
        self
    }
}

/// A reference of any variant, as built by [`create_reference`].
#[derive(Clone, Debug)]
pub enum Reference {
    Scalar(ScalarRef<Value>),
    Shallow(ProxyRef),
    DeepAll(ProxyRef),
    DeepInner(ProxyRef),
}

impl Reference {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&ScalarRef<Value>> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_proxy(&self) -> Option<&ProxyRef> {
        match self {
            Self::Scalar(_) => None,
            Self::Shallow(proxy) | Self::DeepAll(proxy) | Self::DeepInner(proxy) => Some(proxy),
        }
    }

    #[must_use]
    pub fn into_scalar(self) -> Option<ScalarRef<Value>> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_proxy(self) -> Option<ProxyRef> {
        match self {
            Self::Scalar(_) => None,
            Self::Shallow(proxy) | Self::DeepAll(proxy) | Self::DeepInner(proxy) => Some(proxy),
        }
    }

    /// Deep copy of the current value.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        match self {
            Self::Scalar(scalar) => scalar.get(),
            Self::Shallow(proxy) | Self::DeepAll(proxy) | Self::DeepInner(proxy) => proxy.snapshot(),
        }
    }

    pub fn call_effects(&self) {
        match self {
            Self::Scalar(scalar) => scalar.call_effects(),
            Self::Shallow(proxy) | Self::DeepAll(proxy) | Self::DeepInner(proxy) => {
                proxy.call_effects();
            }
        }
    }

    #[must_use]
    pub fn effect_names(&self) -> Vec<String> {
        match self {
            Self::Scalar(scalar) => scalar.effect_names(),
            Self::Shallow(proxy) | Self::DeepAll(proxy) | Self::DeepInner(proxy) => {
                proxy.effect_names()
            }
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        match self {
            Self::Scalar(scalar) => scalar.is_pending(),
            Self::Shallow(proxy) | Self::DeepAll(proxy) | Self::DeepInner(proxy) => {
                proxy.is_pending()
            }
        }
    }
}

/// Wrap `value` in the reference variant selected by `options`.
///
/// Leaves, and any value when `options.kind` is [`RefKind::Setter`], become
/// [`Reference::Scalar`]. Objects and arrays otherwise become a facade
/// reference with `options.interception`.
///
/// ```
/// use std::rc::Rc;
/// use serde_json::json;
/// use frameref_core::frame::ManualFrames;
/// use frameref_core::reference::{Reference, ReferenceOptions, create_reference};
///
/// let frames = Rc::new(ManualFrames::new());
/// let r = create_reference(json!({"a": {"b": 1}}), ReferenceOptions::deep_inner(), frames.clone());
/// assert!(matches!(r, Reference::DeepInner(_)));
///
/// let s = create_reference(json!({"a": 1}), ReferenceOptions::setter(), frames);
/// assert!(matches!(s, Reference::Scalar(_)));
/// ```
pub fn create_reference(value: Value, options: ReferenceOptions, scheduler: SharedScheduler) -> Reference {
    if options.kind == RefKind::Setter {
        return Reference::Scalar(ScalarRef::new(value, scheduler));
    }
    match Node::from_json(value) {
        Node::Leaf(leaf) => Reference::Scalar(ScalarRef::new(leaf, scheduler)),
        Node::Container(root) => {
            let proxy = ProxyRef::from_container(root, options.interception, scheduler);
            match options.interception {
                Interception::Shallow => Reference::Shallow(proxy),
                Interception::DeepAll => Reference::DeepAll(proxy),
                Interception::DeepInner => Reference::DeepInner(proxy),
            }
        }
    }
}
