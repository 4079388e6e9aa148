#![forbid(unsafe_code)]

//! frameref public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. Enable
//! the `web` feature for the browser frame host.

pub use frameref_core::{effect, error, facade, frame, node, reference, render};
pub use frameref_core::{FrameRefError, Result};

#[cfg(feature = "web")]
pub use frameref_web as web;

pub mod prelude {
    pub use frameref_core::effect::{Effect, EffectOptions};
    pub use frameref_core::facade::{Facade, Field, Interception, WriteOutcome};
    pub use frameref_core::frame::{FrameScheduler, ManualFrames, PacedFrames, SharedScheduler};
    pub use frameref_core::node::Key;
    pub use frameref_core::reference::{
        ProxyRef, Reactive, RefKind, Reference, ReferenceOptions, ScalarRef, create_reference,
    };
    pub use frameref_core::render::{RenderConfig, RenderState};
    pub use frameref_core::{FrameRefError, Result};
    pub use serde_json::{Value, json};

    #[cfg(feature = "web")]
    pub use frameref_web::{HostFrames, host_scheduler};
    #[cfg(all(feature = "web", target_arch = "wasm32"))]
    pub use frameref_web::RafFrames;
}
