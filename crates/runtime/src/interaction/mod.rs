//! Interaction rounds: resumable tasks, the stepping protocol and portal
//! interference detection.

mod portal;
mod protocol;
mod task;

pub use portal::PortalDetector;
pub use protocol::{InteractionConfig, InteractionProtocol};
pub use task::{DeferReason, PickupTask, StepResult, TaskOutcome};
