//! Tunable parameters for the core state machines.
//!
//! Each struct carries its defaults as associated constants so hosts and tests
//! can refer to them by name.
use std::time::Duration;

/// Inventory allocator settings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InventoryConfig {
    /// Grid rows used when the live inventory cannot be read.
    pub fallback_rows: u32,
    /// Grid columns used when the live inventory cannot be read.
    pub fallback_cols: u32,
}

impl InventoryConfig {
    pub const DEFAULT_ROWS: u32 = 5;
    pub const DEFAULT_COLS: u32 = 12;
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            fallback_rows: Self::DEFAULT_ROWS,
            fallback_cols: Self::DEFAULT_COLS,
        }
    }
}

/// Death-awareness settings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LivenessConfig {
    /// When false the monitor still tracks state but never blocks pickups.
    pub enabled: bool,
    /// Minimum time between two liveness polls.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_duration"))]
    pub poll_interval: Duration,
    /// How long WaitingForResurrection may last before it is force-cleared.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_duration"))]
    pub resurrection_timeout: Duration,
    /// When false, pickups stay paused after a resurrection until
    /// [`crate::LivenessMonitor::resume`] is called.
    pub auto_resume: bool,
}

impl LivenessConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
    pub const DEFAULT_RESURRECTION_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            resurrection_timeout: Self::DEFAULT_RESURRECTION_TIMEOUT,
            auto_resume: true,
        }
    }
}

/// Per-target attempt limiting.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AttemptPolicy {
    /// Attempts after which a target is skipped.
    pub max_attempts: u32,
    /// Priority targets keep being attempted past `max_attempts`.
    pub priority_ignores_limit: bool,
    /// Idle time since the last attempt after which the counter resets.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_duration"))]
    pub reset_after: Duration,
    /// Clear every counter when the agent changes area.
    pub reset_on_area_change: bool,
}

impl AttemptPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_RESET_AFTER: Duration = Duration::from_secs(30);
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            priority_ignores_limit: true,
            reset_after: Self::DEFAULT_RESET_AFTER,
            reset_on_area_change: true,
        }
    }
}
