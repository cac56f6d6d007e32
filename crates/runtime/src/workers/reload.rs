//! Rule reloads published on the filters topic.

use crate::events::{Event, EventBus, FilterEvent};
use crate::filter::{FilterEngine, ReloadReport, Result};

/// Runs one reload and reports its outcome on [`crate::Topic::Filters`].
pub(crate) async fn reload_filters(engine: &FilterEngine, bus: &EventBus) -> Result<ReloadReport> {
    match engine.load_rules().await {
        Ok(report) => {
            bus.publish(Event::Filters(FilterEvent::Reloaded(report.clone())));
            Ok(report)
        }
        Err(error) => {
            tracing::warn!(target: "pickup::filter", %error, "filter reload failed");
            bus.publish(Event::Filters(FilterEvent::ReloadFailed {
                error: error.to_string(),
            }));
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::Topic;
    use crate::filter::{FilterConfig, FilterError};
    use crate::repository::InMemoryRuleSource;

    #[tokio::test]
    async fn failed_reload_is_published() {
        let engine = FilterEngine::new(Arc::new(InMemoryRuleSource::new()), FilterConfig::default());
        let bus = EventBus::new();
        let mut events = bus.subscribe(Topic::Filters);

        engine.dispose();
        let result = reload_filters(&engine, &bus).await;

        assert!(matches!(result, Err(FilterError::Disposed)));
        assert!(matches!(
            events.recv().await.unwrap(),
            Event::Filters(FilterEvent::ReloadFailed { .. })
        ));
    }
}
