#![forbid(unsafe_code)]

//! Frame-coalesced reactive references.
//!
//! Wrap a value in a reference, register effects on it, and every write made
//! before the next frame tick is delivered to the effects as a single
//! dispatch of the final state.
//!
//! # Layers
//!
//! - [`frame`]: the host frame-tick port plus bundled hosts and the
//!   single-slot [`FrameCoalescer`](frame::FrameCoalescer).
//! - [`effect`]: effect handles and the de-duplicating registry.
//! - [`facade`]: intercepting views over tracked objects and arrays.
//! - [`reference`]: scalar and facade references, and the
//!   [`create_reference`](reference::create_reference) factory.
//! - [`render`]: the phased, gated [`RenderState`](render::RenderState)
//!   controller.
//!
//! Everything is single-threaded: handles are `Rc`-based and `!Send`, and
//! callbacks run on the host's frame tick.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use serde_json::json;
//! use frameref_core::effect::{Effect, EffectOptions};
//! use frameref_core::facade::Facade;
//! use frameref_core::frame::ManualFrames;
//! use frameref_core::reference::{Reactive, ReferenceOptions, create_reference};
//!
//! let frames = Rc::new(ManualFrames::new());
//! let counter = create_reference(json!({"count": 0}), ReferenceOptions::new(), frames.clone())
//!     .into_proxy()
//!     .unwrap();
//!
//! let runs = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&runs);
//! counter.effect(
//!     Effect::new(move |_: &Facade| seen.set(seen.get() + 1)),
//!     EffectOptions::new().first_call(false),
//! );
//!
//! let value = counter.value();
//! for n in 1..=3 {
//!     value.set("count", n).unwrap();
//! }
//! frames.tick();
//! assert_eq!(runs.get(), 1);
//! assert_eq!(counter.snapshot(), json!({"count": 3}));
//! ```

pub mod effect;
pub mod error;
pub mod facade;
pub mod frame;
pub mod node;
pub mod reference;
pub mod render;

pub use effect::{Effect, EffectOptions, EffectRegistry, IntoEffects};
pub use error::{FrameRefError, Result};
pub use facade::{Facade, Field, Interception, WriteOutcome};
pub use frame::{FrameCoalescer, FrameHandle, FrameScheduler, ManualFrames, SharedScheduler};
pub use node::{ContainerKind, Key};
pub use reference::{ProxyRef, Reactive, RefKind, Reference, ReferenceOptions, ScalarRef, create_reference};
pub use render::{PhaseCallback, RenderConfig, RenderState};
