//! Input delivery seam.
//!
//! The interaction protocol never touches the pointer directly: every
//! physical action goes through an [`InputBridge`] supplied by the host.
use std::sync::Arc;

use pickup_core::{EntityId, ScreenPoint};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("input bridge is unavailable")]
    Unavailable,

    #[error("targeted action is not supported by this bridge")]
    Unsupported,

    #[error("input rejected: {0}")]
    Rejected(String),
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Delivers pointer movement, clicks and targeted actions to the host.
///
/// Calls are expected to return quickly; a bridge that needs to wait for the
/// host should queue the request instead of blocking the tick loop.
pub trait InputBridge: Send + Sync {
    fn move_pointer(&self, to: ScreenPoint) -> BridgeResult<()>;

    fn click(&self, at: ScreenPoint) -> BridgeResult<()>;

    /// Interacts with `target` without moving the pointer.
    fn target_action(&self, target: EntityId) -> BridgeResult<()>;
}

impl<T: InputBridge + ?Sized> InputBridge for Arc<T> {
    fn move_pointer(&self, to: ScreenPoint) -> BridgeResult<()> {
        (**self).move_pointer(to)
    }

    fn click(&self, at: ScreenPoint) -> BridgeResult<()> {
        (**self).click(at)
    }

    fn target_action(&self, target: EntityId) -> BridgeResult<()> {
        (**self).target_action(target)
    }
}
