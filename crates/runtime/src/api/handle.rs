//! Cloneable façade for controlling a running pickup loop.
//!
//! [`RuntimeHandle`] is what a settings UI or hotkey layer holds: it toggles
//! the loop, requests a manual resume after death, triggers rule reloads and
//! streams events from specific topics. It never touches the loop's own
//! state directly.
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::events::{Event, EventBus, Topic};
use crate::filter::{self, FilterEngine, FilterSet, ReloadReport};
use crate::repository::RuleMetadata;
use crate::runtime::RuntimeStatus;
use crate::workers;

/// Flags the tick loop reads at the start of every tick.
#[derive(Debug)]
pub(crate) struct Control {
    running: AtomicBool,
    resume_requested: AtomicBool,
}

impl Control {
    pub(crate) fn new(running: bool) -> Self {
        Self {
            running: AtomicBool::new(running),
            resume_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn take_resume_request(&self) -> bool {
        self.resume_requested.swap(false, Ordering::AcqRel)
    }
}

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    control: Arc<Control>,
    engine: Arc<FilterEngine>,
    event_bus: EventBus,
    status: watch::Receiver<RuntimeStatus>,
}

impl RuntimeHandle {
    pub(crate) fn new(
        control: Arc<Control>,
        engine: Arc<FilterEngine>,
        event_bus: EventBus,
        status: watch::Receiver<RuntimeStatus>,
    ) -> Self {
        Self {
            control,
            engine,
            event_bus,
            status,
        }
    }

    pub fn start(&self) {
        if !self.control.running.swap(true, Ordering::AcqRel) {
            tracing::info!(target: "pickup::runtime", "pickup loop started");
        }
    }

    /// Stops acting; the current task is dropped on the next tick.
    pub fn stop(&self) {
        if self.control.running.swap(false, Ordering::AcqRel) {
            tracing::info!(target: "pickup::runtime", "pickup loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::Acquire)
    }

    /// Lifts the post-resurrection pause on the next tick.
    ///
    /// Only has an effect when auto-resume is disabled and the agent was
    /// resurrected; otherwise the request is consumed without effect.
    pub fn request_resume(&self) {
        self.control.resume_requested.store(true, Ordering::Release);
    }

    /// Reloads the rules on a background task.
    ///
    /// The outcome is also published on [`Topic::Filters`]. Must be called
    /// from within a tokio runtime.
    pub fn reload_filters(&self) -> JoinHandle<filter::Result<ReloadReport>> {
        let engine = Arc::clone(&self.engine);
        let bus = self.event_bus.clone();
        tokio::spawn(async move { workers::reload_filters(&engine, &bus).await })
    }

    /// Filter set currently used for decisions.
    pub fn active_filters(&self) -> Arc<FilterSet> {
        self.engine.active_filters()
    }

    /// Known rules with their enabled flags, in evaluation order.
    pub fn filters(&self) -> RuleMetadata {
        self.engine.rules()
    }

    /// Persists a rule toggle; effective after the next reload.
    pub async fn set_rule_enabled(&self, name: &str, enabled: bool) -> filter::Result<()> {
        self.engine.set_rule_enabled(name, enabled).await
    }

    /// Persists a new rule position; effective after the next reload.
    pub async fn move_rule(&self, name: &str, index: usize) -> filter::Result<()> {
        self.engine.move_rule(name, index).await
    }

    pub fn set_pick_up_everything(&self, enabled: bool) {
        self.engine.set_pick_up_everything(enabled);
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Liveness` - death, resurrection and forced resets
    /// - `Topic::Pickup` - target selection, rounds and outcomes
    /// - `Topic::Filters` - rule reload results
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use pickup_runtime::Topic;
    ///
    /// let mut liveness = handle.subscribe(Topic::Liveness);
    /// while let Ok(event) = liveness.recv().await {
    ///     // pause overlays, notify the user, ...
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Status as of the last completed tick.
    pub fn status(&self) -> RuntimeStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified after every tick.
    pub fn watch_status(&self) -> watch::Receiver<RuntimeStatus> {
        self.status.clone()
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) fn control(&self) -> &Control {
        &self.control
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("running", &self.is_running())
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterConfig;
    use crate::repository::InMemoryRuleSource;

    fn handle() -> RuntimeHandle {
        let source = InMemoryRuleSource::new().with_rule("currency", "path =~ \"Currency\"");
        let engine = Arc::new(FilterEngine::new(Arc::new(source), FilterConfig::default()));
        let (_tx, rx) = watch::channel(RuntimeStatus::default());
        RuntimeHandle::new(Arc::new(Control::new(false)), engine, EventBus::new(), rx)
    }

    #[test]
    fn start_and_stop_toggle_running() {
        let handle = handle();
        assert!(!handle.is_running());
        handle.start();
        assert!(handle.clone().is_running());
        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn resume_request_is_consumed_once() {
        let handle = handle();
        handle.request_resume();
        assert!(handle.control().take_resume_request());
        assert!(!handle.control().take_resume_request());
    }

    #[tokio::test]
    async fn reload_publishes_on_filters_topic() {
        let handle = handle();
        let mut events = handle.subscribe(Topic::Filters);

        let report = handle.reload_filters().await.unwrap().unwrap();
        assert_eq!(report.loaded, vec!["currency".to_string()]);
        assert_eq!(handle.active_filters().len(), 1);
        assert_eq!(handle.filters().len(), 1);

        match events.recv().await.unwrap() {
            Event::Filters(crate::events::FilterEvent::Reloaded(published)) => {
                assert_eq!(published, report)
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
