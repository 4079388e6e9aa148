use thiserror::Error;

use crate::node::{ContainerKind, Key};

pub type Result<T> = std::result::Result<T, FrameRefError>;

/// Structural misuse of the engine.
///
/// Writes rejected by a locked slot are not errors; they surface as
/// [`WriteOutcome::Locked`](crate::facade::WriteOutcome::Locked).
#[derive(Debug, Error)]
pub enum FrameRefError {
    #[error("expected an object or array, found {kind}")]
    NotAContainer { kind: &'static str },

    #[error("key {key} does not address an entry of an {container}")]
    KeyMismatch { key: Key, container: ContainerKind },

    #[error("index {index} is out of range for an array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("push requires an array, found an {container}")]
    NotAnArray { container: ContainerKind },

    #[error("invalid configuration: {name}={value:?}")]
    InvalidConfig { name: &'static str, value: String },

    #[error("host frame source unavailable: {what}")]
    HostUnavailable { what: &'static str },
}

impl FrameRefError {
    #[must_use]
    pub fn host_unavailable(what: &'static str) -> Self {
        Self::HostUnavailable { what }
    }
}
