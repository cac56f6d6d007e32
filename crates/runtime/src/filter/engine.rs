//! Rule-based pickup decisions with atomically published reloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};

use pickup_core::Candidate;

use super::metrics::FilterMetrics;
use super::predicate::{Query, parse_query};
use super::rules::{FilterSet, compile_rule, merge_metadata};
use super::{FilterError, PatternCache, Result};
use crate::repository::{RuleDefinition, RuleMetadata, RuleSource, RuleSourceError};

/// Exponential backoff for rule file reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "pickup_core::serde_duration")]
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
    pub const DEFAULT_MULTIPLIER: u32 = 2;

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Self::DEFAULT_INITIAL_BACKOFF,
            multiplier: Self::DEFAULT_MULTIPLIER,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Enabled flag given to newly discovered rules.
    pub default_enabled: bool,
    /// Accept every candidate without consulting the rules.
    pub pick_up_everything: bool,
    /// How long a reload waits for a reload already in progress.
    #[serde(with = "pickup_core::serde_duration")]
    pub reload_wait: Duration,
    pub retry: RetryPolicy,
}

impl FilterConfig {
    pub const DEFAULT_RELOAD_WAIT: Duration = Duration::from_secs(5);
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_enabled: true,
            pick_up_everything: false,
            reload_wait: Self::DEFAULT_RELOAD_WAIT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of one [`FilterEngine::load_rules`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    pub loaded: Vec<String>,
    /// Rules dropped because they could not be read.
    pub failed: Vec<String>,
    pub disabled: Vec<String>,
    /// Malformed lines skipped across all loaded rules.
    pub invalid_lines: usize,
}

/// Decides whether a candidate should be picked up.
///
/// Shared as `Arc<FilterEngine>` between the tick loop and reload tasks.
/// Readers clone the active `Arc<FilterSet>` under a read lock; a reload
/// builds the next set off to the side and swaps the pointer under the write
/// lock. One reload runs at a time.
pub struct FilterEngine {
    source: Arc<dyn RuleSource>,
    config: FilterConfig,
    active: RwLock<Arc<FilterSet>>,
    metadata: RwLock<RuleMetadata>,
    patterns: PatternCache,
    reload_gate: Semaphore,
    pick_up_everything: AtomicBool,
    disposed: AtomicBool,
    metrics: FilterMetrics,
}

impl FilterEngine {
    pub fn new(source: Arc<dyn RuleSource>, config: FilterConfig) -> Self {
        Self {
            source,
            pick_up_everything: AtomicBool::new(config.pick_up_everything),
            config,
            active: RwLock::new(Arc::new(FilterSet::default())),
            metadata: RwLock::new(RuleMetadata::default()),
            patterns: PatternCache::new(),
            reload_gate: Semaphore::new(1),
            disposed: AtomicBool::new(false),
            metrics: FilterMetrics::new(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Rediscovers, merges, compiles and publishes the enabled rules.
    ///
    /// Waits at most `reload_wait` for a reload already in progress and then
    /// fails with [`FilterError::ReloadBusy`] without touching state.
    pub async fn load_rules(&self) -> Result<ReloadReport> {
        self.ensure_live()?;
        let _permit = self.acquire_gate().await?;

        let discovered = self.source.discover().await?;

        let persisted = match self.source.load_metadata().await {
            Ok(metadata) => metadata,
            Err(error) => {
                tracing::warn!(target: "pickup::filter", %error, "rule metadata unreadable, using last known");
                None
            }
        };
        let known = persisted.unwrap_or_else(|| self.metadata.read().clone());
        let merged = merge_metadata(Some(&known), &discovered, self.config.default_enabled);

        if let Err(error) = self.source.save_metadata(&merged).await {
            tracing::warn!(target: "pickup::filter", %error, "failed to persist rule metadata");
        }

        let definitions: HashMap<&str, &RuleDefinition> = discovered
            .iter()
            .map(|rule| (rule.name.as_str(), rule))
            .collect();

        let mut report = ReloadReport::default();
        let mut filters = Vec::new();
        for meta in &merged.rules {
            if !meta.enabled {
                report.disabled.push(meta.name.clone());
                continue;
            }
            let Some(definition) = definitions.get(meta.name.as_str()) else {
                continue;
            };

            match self.read_with_retry(definition).await {
                Ok(text) => {
                    let (filter, invalid) = compile_rule(&definition.name, &text, &self.patterns);
                    report.invalid_lines += invalid;
                    report.loaded.push(definition.name.clone());
                    filters.push(filter);
                }
                Err(error) => {
                    tracing::warn!(
                        target: "pickup::filter",
                        rule = %definition.name,
                        %error,
                        "dropping rule after read failures"
                    );
                    report.failed.push(definition.name.clone());
                }
            }
        }

        // Disposal may have raced the reload; never resurrect a disposed engine.
        self.ensure_live()?;

        let next = Arc::new(FilterSet::new(filters));
        *self.active.write() = next;
        *self.metadata.write() = merged;
        self.metrics.record_reload(report.failed.len());

        tracing::info!(
            target: "pickup::filter",
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            disabled = report.disabled.len(),
            invalid_lines = report.invalid_lines,
            "filters reloaded"
        );
        Ok(report)
    }

    async fn read_with_retry(
        &self,
        rule: &RuleDefinition,
    ) -> std::result::Result<String, RuleSourceError> {
        let retry = &self.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.source.read(rule).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_transient() && attempt < max_attempts => {
                    let delay = retry.backoff(attempt);
                    tracing::debug!(
                        target: "pickup::filter",
                        rule = %rule.name,
                        attempt,
                        ?delay,
                        %error,
                        "rule read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// True when pick-up-everything is set or any active filter matches.
    ///
    /// A filter whose evaluation errors counts as not matching; the others
    /// are still consulted.
    pub fn should_pickup(&self, candidate: &Candidate) -> Result<bool> {
        self.ensure_live()?;
        if self.pick_up_everything.load(Ordering::Relaxed) {
            return Ok(true);
        }

        let active = self.active_filters();
        let mut matched = false;
        for filter in active.filters() {
            match filter.matches(candidate) {
                Ok(true) => {
                    matched = true;
                    break;
                }
                Ok(false) => {}
                Err(error) => {
                    self.metrics.record_eval_error();
                    tracing::debug!(
                        target: "pickup::filter",
                        filter = filter.name(),
                        id = %candidate.id,
                        %error,
                        "filter evaluation failed"
                    );
                }
            }
        }

        self.metrics.record_evaluation(matched);
        Ok(matched)
    }

    /// Cached compiled pattern; `None` when `text` is not a valid expression.
    pub fn get_or_compile_pattern(&self, text: &str) -> Result<Option<Arc<Regex>>> {
        self.ensure_live()?;
        Ok(self.patterns.get_or_compile(text))
    }

    /// Parses a standalone query using the engine's pattern cache.
    pub fn compile_query(&self, text: &str) -> Result<Query> {
        self.ensure_live()?;
        Ok(parse_query(text, &self.patterns)?)
    }

    /// Current filter set; stays valid even if a reload publishes a new one.
    pub fn active_filters(&self) -> Arc<FilterSet> {
        Arc::clone(&self.active.read())
    }

    /// Known rules in evaluation order, as of the last reload or edit.
    pub fn rules(&self) -> RuleMetadata {
        self.metadata.read().clone()
    }

    /// Persists a rule's enabled flag; takes effect on the next reload.
    ///
    /// Serialized with reloads through the same gate, so a reload in flight
    /// cannot overwrite the edit with the metadata it read earlier.
    pub async fn set_rule_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        let _permit = self.acquire_gate().await?;
        let updated = {
            let mut metadata = self.metadata.write();
            let rule = metadata
                .rules
                .iter_mut()
                .find(|rule| rule.name == name)
                .ok_or_else(|| FilterError::UnknownRule(name.to_string()))?;
            rule.enabled = enabled;
            metadata.clone()
        };

        tracing::info!(target: "pickup::filter", rule = name, enabled, "rule toggled");
        self.source.save_metadata(&updated).await?;
        Ok(())
    }

    /// Moves a rule to `index` (clamped) and persists the new order.
    pub async fn move_rule(&self, name: &str, index: usize) -> Result<()> {
        self.ensure_live()?;
        let _permit = self.acquire_gate().await?;
        let updated = {
            let mut metadata = self.metadata.write();
            let from = metadata
                .position(name)
                .ok_or_else(|| FilterError::UnknownRule(name.to_string()))?;
            let rule = metadata.rules.remove(from);
            let to = index.min(metadata.rules.len());
            metadata.rules.insert(to, rule);
            metadata.clone()
        };

        self.source.save_metadata(&updated).await?;
        Ok(())
    }

    pub fn set_pick_up_everything(&self, enabled: bool) {
        self.pick_up_everything.store(enabled, Ordering::Relaxed);
    }

    pub fn pick_up_everything(&self) -> bool {
        self.pick_up_everything.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &FilterMetrics {
        &self.metrics
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Releases the active filters; every later fallible call fails fast.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.reload_gate.close();
        *self.active.write() = Arc::new(FilterSet::default());
        tracing::debug!(target: "pickup::filter", "filter engine disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(FilterError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Waits at most `reload_wait` for the reload gate.
    async fn acquire_gate(&self) -> Result<SemaphorePermit<'_>> {
        match tokio::time::timeout(self.config.reload_wait, self.reload_gate.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(FilterError::Disposed),
            Err(_elapsed) => {
                self.metrics.record_busy();
                tracing::warn!(
                    target: "pickup::filter",
                    waited = ?self.config.reload_wait,
                    "another reload is still running, giving up"
                );
                Err(FilterError::ReloadBusy {
                    waited: self.config.reload_wait,
                })
            }
        }
    }
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("config", &self.config)
            .field("active", &self.active.read().len())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRuleSource;
    use pickup_core::{EntityId, GroundLabel, ItemDetails, LabelInfo, TargetDetails, WorldPosition};

    fn candidate(name: &str, path: &str) -> Candidate {
        Candidate::from_label(&GroundLabel {
            id: EntityId(1),
            position: WorldPosition::ORIGIN,
            distance: 20.0,
            label: LabelInfo::default(),
            details: TargetDetails::Item(ItemDetails::new(name, path)),
        })
    }

    fn fast_config() -> FilterConfig {
        FilterConfig {
            reload_wait: Duration::from_millis(50),
            retry: RetryPolicy {
                initial_backoff: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
            ..FilterConfig::default()
        }
    }

    fn engine(source: Arc<InMemoryRuleSource>) -> FilterEngine {
        FilterEngine::new(source, fast_config())
    }

    #[test]
    fn backoff_grows_exponentially() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn no_filters_means_no_pickup() {
        let engine = engine(Arc::new(InMemoryRuleSource::new()));
        engine.load_rules().await.unwrap();

        assert!(!engine.should_pickup(&candidate("Chaos Orb", "Currency/Chaos")).unwrap());

        engine.set_pick_up_everything(true);
        assert!(engine.should_pickup(&candidate("Chaos Orb", "Currency/Chaos")).unwrap());
    }

    #[tokio::test]
    async fn disabling_a_rule_removes_its_effect_after_reload() {
        let source = Arc::new(
            InMemoryRuleSource::new()
                .with_rule("currency", "Path =~ \"^Currency/\"")
                .with_rule("rings", "Name == \"Two-Stone Ring\""),
        );
        let engine = engine(Arc::clone(&source));
        let chaos = candidate("Chaos Orb", "Currency/Chaos");

        engine.load_rules().await.unwrap();
        assert!(engine.should_pickup(&chaos).unwrap());

        engine.set_rule_enabled("currency", false).await.unwrap();
        assert!(engine.should_pickup(&chaos).unwrap(), "takes effect on reload");

        let report = engine.load_rules().await.unwrap();
        assert_eq!(report.disabled, ["currency"]);
        assert!(!engine.should_pickup(&chaos).unwrap());
        assert_eq!(engine.active_filters().names(), ["rings"]);
        assert!(!source.metadata().unwrap().rules[0].enabled);
    }

    #[tokio::test]
    async fn evaluation_error_only_skips_that_filter() {
        let source = Arc::new(
            InMemoryRuleSource::new()
                .with_rule("broken", "Quality == \"high\"")
                .with_rule("names", "Name == \"Exalted Orb\""),
        );
        let engine = engine(source);
        engine.load_rules().await.unwrap();

        assert!(engine.should_pickup(&candidate("Exalted Orb", "Currency/Exalt")).unwrap());
        assert_eq!(engine.metrics().eval_errors(), 1);
    }

    #[tokio::test]
    async fn transient_read_failures_recover_within_retry_cap() {
        let source = Arc::new(InMemoryRuleSource::new().with_rule("flaky", "Name == \"x\""));
        source.fail_reads("flaky", 2);
        let engine = engine(Arc::clone(&source));

        let report = engine.load_rules().await.unwrap();

        assert_eq!(report.loaded, ["flaky"]);
        assert_eq!(source.reads("flaky"), 3);
    }

    #[tokio::test]
    async fn permanent_failure_drops_only_that_rule() {
        let source = Arc::new(
            InMemoryRuleSource::new()
                .with_rule("dead", "Name == \"x\"")
                .with_rule("alive", "Name == \"y\""),
        );
        source.fail_always("dead");
        let engine = engine(Arc::clone(&source));

        let report = engine.load_rules().await.unwrap();

        assert_eq!(report.failed, ["dead"]);
        assert_eq!(report.loaded, ["alive"]);
        assert_eq!(source.reads("dead"), RetryPolicy::DEFAULT_MAX_ATTEMPTS);
        assert_eq!(engine.metrics().snapshot().rules_dropped, 1);
    }

    #[tokio::test]
    async fn overlapping_reload_times_out_as_busy() {
        let engine = engine(Arc::new(InMemoryRuleSource::new()));
        let _held = engine.reload_gate.acquire().await.unwrap();

        let err = engine.load_rules().await.unwrap_err();

        assert!(matches!(err, FilterError::ReloadBusy { .. }));
        assert!(engine.active_filters().is_empty());
    }

    #[tokio::test]
    async fn rule_edits_wait_for_a_running_reload() {
        let source = Arc::new(InMemoryRuleSource::new().with_rule("currency", "Name == \"x\""));
        let engine = Arc::new(engine(Arc::clone(&source)));
        engine.load_rules().await.unwrap();

        let held = engine.reload_gate.acquire().await.unwrap();
        assert!(matches!(
            engine.set_rule_enabled("currency", false).await,
            Err(FilterError::ReloadBusy { .. })
        ));
        assert!(matches!(
            engine.move_rule("currency", 0).await,
            Err(FilterError::ReloadBusy { .. })
        ));
        assert!(engine.rules().rules[0].enabled);

        let edit = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.set_rule_enabled("currency", false).await }
        });
        tokio::task::yield_now().await;
        drop(held);
        edit.await.unwrap().unwrap();

        assert!(!engine.rules().rules[0].enabled);
        assert!(!source.metadata().unwrap().rules[0].enabled);
    }

    #[tokio::test]
    async fn move_rule_reorders_and_persists() {
        let source = Arc::new(
            InMemoryRuleSource::new()
                .with_rule("a", "Name == \"a\"")
                .with_rule("b", "Name == \"b\"")
                .with_rule("c", "Name == \"c\""),
        );
        let engine = engine(Arc::clone(&source));
        engine.load_rules().await.unwrap();

        engine.move_rule("c", 0).await.unwrap();
        engine.load_rules().await.unwrap();

        assert_eq!(engine.active_filters().names(), ["c", "a", "b"]);
        assert!(matches!(
            engine.move_rule("zzz", 0).await,
            Err(FilterError::UnknownRule(_))
        ));
    }

    #[tokio::test]
    async fn disposed_engine_fails_fast() {
        let engine = engine(Arc::new(InMemoryRuleSource::new()));
        engine.dispose();

        assert!(matches!(engine.load_rules().await, Err(FilterError::Disposed)));
        assert!(matches!(
            engine.should_pickup(&candidate("a", "b")),
            Err(FilterError::Disposed)
        ));
        assert!(matches!(engine.compile_query("Name == \"a\""), Err(FilterError::Disposed)));
        assert!(matches!(
            engine.get_or_compile_pattern("a"),
            Err(FilterError::Disposed)
        ));
    }

    #[tokio::test]
    async fn patterns_are_shared_with_rule_compilation() {
        let source = Arc::new(InMemoryRuleSource::new().with_rule("c", "Path =~ \"^Currency/\""));
        let engine = engine(source);
        engine.load_rules().await.unwrap();

        let a = engine.get_or_compile_pattern("^Currency/").unwrap().unwrap();
        let b = engine.get_or_compile_pattern("^Currency/").unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.patterns().len(), 1);
        assert!(engine.get_or_compile_pattern("(").unwrap().is_none());
    }
}
