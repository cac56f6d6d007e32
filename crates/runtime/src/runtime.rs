//! Per-tick pickup orchestrator.
//!
//! [`PickupRuntime`] owns every stateful component of the loop and is stepped
//! once per host tick through [`PickupRuntime::on_tick`], either directly by
//! the host or by the tick worker started with [`PickupRuntime::spawn`].
//! Collaborators are injected through [`RuntimeBuilder`]; nothing is looked
//! up globally.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::watch;

use pickup_core::{
    AttemptPolicy, CachedValue, Candidate, CandidateFlags, Clock, DeathAwareness, EntityId,
    InventoryAllocator, InventoryConfig, InventoryOracle, LivenessConfig, LivenessState,
    StatsSnapshot, SystemClock, TargetDetails, WorldOracle, WorldSnapshot,
};

use crate::api::handle::Control;
use crate::api::{InputBridge, Result, RuntimeError, RuntimeHandle};
use crate::candidates::CandidateSource;
use crate::events::{Event, EventBus, PickupEvent};
use crate::filter::{FilterConfig, FilterEngine, FilterMetricsSnapshot, Query, ReloadReport};
use crate::interaction::{
    InteractionConfig, InteractionProtocol, PickupTask, PortalDetector, StepResult,
};
use crate::repository::RuleSource;
use crate::selection::TargetSelector;
use crate::workers::{self, TickLoop, TickWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Labels farther than this are not considered at all.
    pub pickup_range: f32,
    #[serde(with = "pickup_core::serde_duration")]
    pub candidate_refresh: Duration,
    /// Containers closer than this are preferred over any item.
    pub prefer_radius: f32,
    pub enable_containers: bool,
    /// Query marking candidates as priority targets.
    pub priority_query: Option<String>,
    /// Period of the tick worker.
    #[serde(with = "pickup_core::serde_duration")]
    pub tick_interval: Duration,
    pub event_buffer_size: usize,
    /// Whether the loop acts immediately or waits for [`RuntimeHandle::start`].
    pub start_running: bool,
    pub filter: FilterConfig,
    pub interaction: InteractionConfig,
    pub inventory: InventoryConfig,
    pub liveness: LivenessConfig,
    pub attempts: AttemptPolicy,
}

impl RuntimeConfig {
    pub const DEFAULT_PICKUP_RANGE: f32 = 600.0;
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);
    pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

    /// Reads a RON config file; missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = ron::from_str(&contents).map_err(|e| {
            RuntimeError::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pickup_range.is_nan() || self.pickup_range <= 0.0 {
            return Err(RuntimeError::InvalidConfig(format!(
                "pickup_range must be positive, got {}",
                self.pickup_range
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(RuntimeError::InvalidConfig(
                "tick_interval must be non-zero".into(),
            ));
        }
        if self.interaction.max_rounds == 0 {
            return Err(RuntimeError::InvalidConfig(
                "interaction.max_rounds must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pickup_range: Self::DEFAULT_PICKUP_RANGE,
            candidate_refresh: CandidateSource::DEFAULT_REFRESH,
            prefer_radius: TargetSelector::DEFAULT_PREFER_RADIUS,
            enable_containers: true,
            priority_query: None,
            tick_interval: Self::DEFAULT_TICK_INTERVAL,
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER_SIZE,
            start_running: true,
            filter: FilterConfig::default(),
            interaction: InteractionConfig::default(),
            inventory: InventoryConfig::default(),
            liveness: LivenessConfig::default(),
            attempts: AttemptPolicy::default(),
        }
    }
}

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The loop is stopped; nothing was read.
    Stopped,
    /// The world could not be read this tick.
    NoWorld,
    /// Pickups are blocked by liveness.
    Suspended(LivenessState),
    /// Nothing eligible in range.
    Idle,
    /// The current task was stepped.
    Step { target: EntityId, result: StepResult },
}

impl TickOutcome {
    pub fn kind(&self) -> TickKind {
        match self {
            TickOutcome::Stopped => TickKind::Stopped,
            TickOutcome::NoWorld => TickKind::NoWorld,
            TickOutcome::Suspended(_) => TickKind::Suspended,
            TickOutcome::Idle => TickKind::Idle,
            TickOutcome::Step { .. } => TickKind::Active,
        }
    }

    pub fn issued_round(&self) -> bool {
        matches!(
            self,
            TickOutcome::Step {
                result: StepResult::RoundIssued { .. },
                ..
            }
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, Serialize)]
pub enum TickKind {
    #[default]
    Stopped,
    NoWorld,
    Suspended,
    Idle,
    Active,
}

/// Snapshot of the loop published after every tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuntimeStatus {
    pub running: bool,
    pub last_tick: TickKind,
    pub liveness: LivenessState,
    pub awaiting_resume: bool,
    pub area_id: Option<u64>,
    pub target: Option<EntityId>,
    pub target_rounds: u32,
    pub candidates: usize,
    pub eligible: usize,
    pub active_filters: usize,
    pub stats: StatsSnapshot,
    pub filter_metrics: FilterMetricsSnapshot,
}

impl Default for RuntimeStatus {
    fn default() -> Self {
        Self {
            running: false,
            last_tick: TickKind::default(),
            liveness: LivenessState::Alive,
            awaiting_resume: false,
            area_id: None,
            target: None,
            target_rounds: 0,
            candidates: 0,
            eligible: 0,
            active_filters: 0,
            stats: StatsSnapshot::default(),
            filter_metrics: FilterMetricsSnapshot::default(),
        }
    }
}

type WorldCache = Arc<CachedValue<Option<Arc<WorldSnapshot>>>>;

/// The pickup loop.
///
/// Owns the liveness/attempt state machine and the current task, so it is
/// `Send` but not `Sync`: it lives on exactly one task at a time.
/// [`RuntimeHandle`] is the cloneable way to control it from elsewhere.
pub struct PickupRuntime {
    config: RuntimeConfig,
    handle: RuntimeHandle,
    status: watch::Sender<RuntimeStatus>,
    clock: Arc<dyn Clock>,

    world: WorldCache,
    candidates: CandidateSource,
    engine: Arc<FilterEngine>,
    allocator: InventoryAllocator,
    death: DeathAwareness,
    protocol: InteractionProtocol,
    selector: TargetSelector,
    priority: Option<Query>,

    task: Option<PickupTask>,
    area_id: Option<u64>,
    candidate_count: usize,
    eligible_count: usize,
}

impl PickupRuntime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<FilterEngine> {
        &self.engine
    }

    pub fn current_task(&self) -> Option<&PickupTask> {
        self.task.as_ref()
    }

    pub fn death_awareness(&self) -> &DeathAwareness {
        &self.death
    }

    /// Loads the rules once and publishes the result on the filters topic.
    pub async fn load_filters(&self) -> Result<ReloadReport> {
        Ok(workers::reload_filters(&self.engine, self.handle.event_bus()).await?)
    }

    /// Runs one iteration of the loop.
    ///
    /// Never fails: subsystem errors are logged and treated as "not eligible".
    pub fn on_tick(&mut self) -> TickOutcome {
        let tick = self.clock.advance_tick();
        let now = self.clock.now();

        let outcome = self.run_tick(now);
        tracing::trace!(target: "pickup::runtime", %tick, outcome = %outcome.kind(), "tick");

        self.publish_status(now, &outcome);
        outcome
    }

    /// Moves the loop onto a tokio task driven by `tick_interval`.
    pub fn spawn(self) -> TickLoop {
        let period = self.config.tick_interval;
        TickWorker::spawn(self, period)
    }

    /// Stops the loop and releases the filter engine.
    pub fn shutdown(self) {
        self.handle.stop();
        self.engine.dispose();
        tracing::info!(target: "pickup::runtime", "runtime shut down");
    }

    fn run_tick(&mut self, now: Instant) -> TickOutcome {
        if !self.handle.is_running() {
            self.abandon_task("stopped");
            return TickOutcome::Stopped;
        }

        let Some(snapshot) = self.world.get_value() else {
            return TickOutcome::NoWorld;
        };

        // Transitions reach the bus through the subscriber registered at build.
        self.death.poll(now, snapshot.agent.is_alive);
        if self.handle.control().take_resume_request() {
            self.death.resume();
        }
        if !self.death.should_allow_pickup() {
            self.abandon_task("liveness");
            return TickOutcome::Suspended(self.death.state());
        }

        self.track_area(&snapshot);

        if let Some(outcome) = self.finish_vanished_task(&snapshot, now) {
            return outcome;
        }

        let eligible = self.eligible_candidates(&snapshot, now);
        let Some(target) = self.selector.select(&eligible).cloned() else {
            self.abandon_task("no eligible target");
            return TickOutcome::Idle;
        };

        self.pursue(target, &snapshot, now)
    }

    fn track_area(&mut self, snapshot: &WorldSnapshot) {
        let previous = self.area_id.replace(snapshot.area_id);
        if previous.is_none_or(|previous| previous == snapshot.area_id) {
            return;
        }

        tracing::info!(
            target: "pickup::runtime",
            area_id = snapshot.area_id,
            "area changed"
        );
        self.death.on_area_change();
        self.abandon_task("area changed");
        self.candidates.force_refresh();
        self.handle.event_bus().publish(Event::Pickup(PickupEvent::AreaChanged {
            area_id: snapshot.area_id,
        }));
    }

    /// A task whose label disappeared is finished as collected before any
    /// new target is chosen, so its outcome still reaches the stats.
    fn finish_vanished_task(&mut self, snapshot: &WorldSnapshot, now: Instant) -> Option<TickOutcome> {
        let usable = self.usable_window(snapshot);
        let vanished = self.task.as_ref().is_some_and(|task| {
            snapshot
                .label(task.target())
                .is_none_or(|label| !label.label.is_clickable(&usable))
        });
        if !vanished {
            return None;
        }

        let mut task = self.task.take()?;
        let result = self.protocol.step(&mut task, snapshot, now);
        self.apply_step(&task, &result, now);
        Some(TickOutcome::Step {
            target: task.target(),
            result,
        })
    }

    fn eligible_candidates(&mut self, snapshot: &WorldSnapshot, now: Instant) -> Vec<Candidate> {
        let live: HashSet<EntityId> = snapshot.labels.iter().map(|label| label.id).collect();
        self.death.retain(&live);

        let usable = self.usable_window(snapshot);
        let candidates = self.candidates.revalidate(snapshot);
        self.candidate_count = candidates.len();

        let mut eligible = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            self.death.observe(&mut candidate, now);
            if self.is_priority(&candidate) {
                candidate.flags.insert(CandidateFlags::PRIORITY);
            }

            if candidate.label.is_clickable(&usable)
                && self.death.is_eligible(&candidate)
                && self.passes_kind_gate(&candidate)
            {
                eligible.push(candidate);
            }
        }

        self.eligible_count = eligible.len();
        eligible
    }

    fn is_priority(&self, candidate: &Candidate) -> bool {
        let Some(query) = &self.priority else {
            return false;
        };
        query.evaluate(candidate).unwrap_or_else(|error| {
            tracing::trace!(
                target: "pickup::runtime",
                id = %candidate.id,
                %error,
                "priority query not applicable"
            );
            false
        })
    }

    fn passes_kind_gate(&self, candidate: &Candidate) -> bool {
        match &candidate.details {
            TargetDetails::Item(item) => {
                let wanted = match self.engine.should_pickup(candidate) {
                    Ok(wanted) => wanted,
                    Err(error) => {
                        tracing::warn!(
                            target: "pickup::runtime",
                            id = %candidate.id,
                            %error,
                            "filter check failed"
                        );
                        false
                    }
                };
                wanted && self.allocator.can_fit(&item.footprint())
            }
            TargetDetails::Container(container) => self.config.enable_containers && !container.opened,
        }
    }

    fn pursue(&mut self, target: Candidate, snapshot: &WorldSnapshot, now: Instant) -> TickOutcome {
        let mut task = match self.task.take() {
            Some(task) if task.target() == target.id => task,
            previous => {
                let bus = self.handle.event_bus();
                if let Some(previous) = previous {
                    tracing::debug!(
                        target: "pickup::runtime",
                        previous = %previous.target(),
                        next = %target.id,
                        "task superseded"
                    );
                    bus.publish(Event::Pickup(PickupEvent::Superseded {
                        previous: previous.target(),
                        next: target.id,
                    }));
                }
                tracing::debug!(
                    target: "pickup::runtime",
                    id = %target.id,
                    name = target.name(),
                    distance = target.distance,
                    "target selected"
                );
                bus.publish(Event::Pickup(PickupEvent::TargetSelected {
                    id: target.id,
                    name: target.name().to_string(),
                    kind: target.kind(),
                    distance: target.distance,
                }));
                PickupTask::new(target.id, target.kind(), now)
            }
        };

        let result = self.protocol.step(&mut task, snapshot, now);
        self.apply_step(&task, &result, now);

        let target = task.target();
        if !task.is_finished() {
            self.task = Some(task);
        }
        TickOutcome::Step { target, result }
    }

    /// Feeds a step's result into attempts, stats and the bus.
    fn apply_step(&mut self, task: &PickupTask, result: &StepResult, now: Instant) {
        let id = task.target();
        let event = match result {
            StepResult::Deferred(_) => return,
            StepResult::RoundIssued { round } => {
                self.death.record_attempt(id, now);
                PickupEvent::RoundIssued { id, round: *round }
            }
            StepResult::RoundFailed { round, error } => {
                self.death.record_attempt(id, now);
                PickupEvent::RoundFailed {
                    id,
                    round: *round,
                    error: error.to_string(),
                }
            }
            StepResult::Finished(outcome) => {
                self.death.record_outcome(id, outcome.is_success(), now);
                tracing::debug!(
                    target: "pickup::runtime",
                    %id,
                    %outcome,
                    rounds = task.rounds(),
                    elapsed = ?task.elapsed(now),
                    "task finished"
                );
                PickupEvent::Finished {
                    id,
                    outcome: *outcome,
                    rounds: task.rounds(),
                }
            }
        };
        self.handle.event_bus().publish(Event::Pickup(event));
    }

    fn abandon_task(&mut self, reason: &'static str) {
        if let Some(task) = self.task.take() {
            tracing::debug!(
                target: "pickup::runtime",
                id = %task.target(),
                rounds = task.rounds(),
                reason,
                "task abandoned"
            );
        }
    }

    fn usable_window(&self, snapshot: &WorldSnapshot) -> pickup_core::ScreenRect {
        snapshot.window.inset(self.config.interaction.window_margin)
    }

    fn publish_status(&self, now: Instant, outcome: &TickOutcome) {
        let status = RuntimeStatus {
            running: self.handle.is_running(),
            last_tick: outcome.kind(),
            liveness: self.death.state(),
            awaiting_resume: self.death.is_awaiting_resume(),
            area_id: self.area_id,
            target: self.task.as_ref().map(PickupTask::target),
            target_rounds: self.task.as_ref().map_or(0, PickupTask::rounds),
            candidates: self.candidate_count,
            eligible: self.eligible_count,
            active_filters: self.engine.active_filters().len(),
            stats: self.death.stats_snapshot(now),
            filter_metrics: self.engine.metrics().snapshot(),
        };
        self.status.send_replace(status);
    }
}

impl std::fmt::Debug for PickupRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickupRuntime")
            .field("task", &self.task)
            .field("area_id", &self.area_id)
            .field("liveness", &self.death.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PickupRuntime`].
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    world: Option<Arc<dyn WorldOracle>>,
    inventory: Option<Arc<dyn InventoryOracle>>,
    bridge: Option<Arc<dyn InputBridge>>,
    rules: Option<Arc<dyn RuleSource>>,
    clock: Option<Arc<dyn Clock>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            world: None,
            inventory: None,
            bridge: None,
            rules: None,
            clock: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn world(mut self, world: Arc<dyn WorldOracle>) -> Self {
        self.world = Some(world);
        self
    }

    pub fn inventory(mut self, inventory: Arc<dyn InventoryOracle>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn bridge(mut self, bridge: Arc<dyn InputBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn rule_source(mut self, rules: Arc<dyn RuleSource>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Time source; defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wires the components together. Rules are not loaded yet; call
    /// [`PickupRuntime::load_filters`] or [`RuntimeHandle::reload_filters`].
    pub fn build(self) -> Result<PickupRuntime> {
        let config = self.config;
        config.validate()?;

        let world = self.world.ok_or(RuntimeError::MissingCollaborator("world oracle"))?;
        let inventory = self
            .inventory
            .ok_or(RuntimeError::MissingCollaborator("inventory oracle"))?;
        let bridge = self.bridge.ok_or(RuntimeError::MissingCollaborator("input bridge"))?;
        let rules = self.rules.ok_or(RuntimeError::MissingCollaborator("rule source"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

        let world_cache: WorldCache = Arc::new(CachedValue::per_tick(Arc::clone(&clock), move || {
            world.snapshot().map(Arc::new)
        }));

        let candidates = {
            let world = Arc::clone(&world_cache);
            CandidateSource::new(
                config.pickup_range,
                config.candidate_refresh,
                Arc::clone(&clock),
                move || world.get_value(),
            )
        };

        let portals = {
            let world = Arc::clone(&world_cache);
            PortalDetector::new(config.interaction.portal_refresh, Arc::clone(&clock), move || {
                world
                    .get_value()
                    .map(|snapshot| snapshot.interactives.clone())
                    .unwrap_or_default()
            })
        };

        let engine = Arc::new(FilterEngine::new(rules, config.filter.clone()));
        let priority = config
            .priority_query
            .as_deref()
            .map(|text| engine.compile_query(text))
            .transpose()?;

        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let control = Arc::new(Control::new(config.start_running));
        let (status_tx, status_rx) = watch::channel(RuntimeStatus {
            running: config.start_running,
            ..RuntimeStatus::default()
        });
        let handle = RuntimeHandle::new(control, Arc::clone(&engine), event_bus.clone(), status_rx);

        let mut death = DeathAwareness::new(
            config.liveness.clone(),
            config.attempts.clone(),
            clock.now(),
        );
        death.subscribe(move |event| event_bus.publish(Event::Liveness(event)));

        let allocator = InventoryAllocator::new(inventory, config.inventory.clone(), Arc::clone(&clock));
        let protocol = InteractionProtocol::new(config.interaction.clone(), bridge, portals);
        let selector = TargetSelector::new(config.prefer_radius);

        tracing::info!(
            target: "pickup::runtime",
            pickup_range = config.pickup_range,
            tick_interval = ?config.tick_interval,
            containers = config.enable_containers,
            "runtime built"
        );

        Ok(PickupRuntime {
            config,
            handle,
            status: status_tx,
            clock,
            world: world_cache,
            candidates,
            engine,
            allocator,
            death,
            protocol,
            selector,
            priority,
            task: None,
            area_id: None,
            candidate_count: 0,
            eligible_count: 0,
        })
    }
}
