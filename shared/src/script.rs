//! Callback types handed to the world by the scripting layer.

use thiserror::Error;

use crate::scene::{NodeId, SceneError};
use crate::world::World;

/// Failure raised by a user callback. Logged at the callback boundary, never propagated.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Runtime(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl ScriptError {
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }
}

/// Called as `callback(world, this, other)` on every step `this` is touching `other`.
pub type TouchedCallback = Box<dyn FnMut(&mut World, NodeId, NodeId) -> Result<(), ScriptError>>;

/// Called once per frame with the elapsed time in seconds.
pub type UpdateCallback = Box<dyn FnMut(&mut World, f32) -> Result<(), ScriptError>>;
