use thiserror::Error;

use crate::types::BoxId;

/// Error type produced by a fallible response selector.
pub type SelectorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by world and movement operations.
///
/// All of these are caller bugs; the engine never retries or swallows them.
#[derive(Debug, Error)]
pub enum CollisionError {
    /// Non-finite coordinates, negative size or an unusable response parameter.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: &'static str },
    /// The handle refers to a box that is no longer live in this world.
    #[error("box {0:?} is not live in this world")]
    DetachedBox(BoxId),
    /// The response selector failed; the call was aborted without side effects.
    #[error("response selector failed: {0}")]
    Selector(#[source] SelectorError),
}

pub type Result<T, E = CollisionError> = std::result::Result<T, E>;
