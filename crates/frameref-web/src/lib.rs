#![forbid(unsafe_code)]

//! Browser frame host for frameref.
//!
//! On `wasm32` this crate provides [`RafFrames`], a
//! [`FrameScheduler`](frameref_core::frame::FrameScheduler) driven by
//! `window.requestAnimationFrame`. [`host_scheduler`] picks the right host
//! for the current target so application code can stay target-agnostic.

#[cfg(target_arch = "wasm32")]
mod raf;

use std::rc::Rc;

use frameref_core::error::Result;

#[cfg(target_arch = "wasm32")]
pub use raf::RafFrames;

/// Concrete frame host of this target. Coerces to
/// [`SharedScheduler`](frameref_core::frame::SharedScheduler).
#[cfg(target_arch = "wasm32")]
pub type HostFrames = RafFrames;

/// Concrete frame host of this target. Coerces to
/// [`SharedScheduler`](frameref_core::frame::SharedScheduler); the caller
/// drives it with `poll` or `wait_and_run`.
#[cfg(not(target_arch = "wasm32"))]
pub type HostFrames = frameref_core::frame::PacedFrames;

/// The frame host for this target: [`RafFrames`] bound to the global window.
///
/// # Errors
///
/// `HostUnavailable` without a browser window.
#[cfg(target_arch = "wasm32")]
pub fn host_scheduler() -> Result<Rc<HostFrames>> {
    Ok(Rc::new(RafFrames::new()?))
}

/// The frame host for this target: a
/// [`PacedFrames`](frameref_core::frame::PacedFrames) configured from the
/// environment.
///
/// # Errors
///
/// `InvalidConfig` for a bad frame interval override.
#[cfg(not(target_arch = "wasm32"))]
pub fn host_scheduler() -> Result<Rc<HostFrames>> {
    use frameref_core::frame::FrameConfig;

    let config = FrameConfig::from_env()?;
    tracing::debug!(message = "host.paced", interval_us = config.interval.as_micros() as u64);
    Ok(Rc::new(HostFrames::new(config)))
}
