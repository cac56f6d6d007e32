//! Runtime orchestration for the proximity pickup loop.
//!
//! This crate wires the pure state machines from `pickup-core` together with
//! the rule-based filter engine, the interaction protocol and the host
//! collaborators into a per-tick loop. Consumers build a [`PickupRuntime`],
//! drive it through [`PickupRuntime::on_tick`] (or [`PickupRuntime::spawn`])
//! and control it through [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`filter`] compiles and evaluates user rules
//! - [`interaction`] turns a selected target into paced input
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`repository`] loads rule files and their metadata
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod candidates;
pub mod events;
pub mod filter;
pub mod interaction;
pub mod repository;
pub mod runtime;
pub mod selection;

mod workers;

pub use api::{BridgeError, BridgeResult, InputBridge, Result, RuntimeError, RuntimeHandle};
pub use candidates::{CandidateSource, collect_candidates};
pub use events::{Event, EventBus, FilterEvent, PickupEvent, Topic};
pub use filter::{
    FilterConfig, FilterEngine, FilterError, FilterMetrics, FilterMetricsSnapshot, FilterSet,
    ReloadReport, RetryPolicy,
};
pub use interaction::{
    DeferReason, InteractionConfig, InteractionProtocol, PickupTask, PortalDetector, StepResult,
    TaskOutcome,
};
pub use repository::{
    FileRuleSource, InMemoryRuleSource, RuleDefinition, RuleMeta, RuleMetadata, RuleSource,
    RuleSourceError,
};
pub use runtime::{
    PickupRuntime, RuntimeBuilder, RuntimeConfig, RuntimeStatus, TickKind, TickOutcome,
};
pub use selection::TargetSelector;
pub use workers::{TickLoop, TickWorker};
