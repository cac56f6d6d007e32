//! Headless pickup client.
//!
//! Composition root that assembles a [`PickupRuntime`] around the scripted
//! [`demo::DemoHost`], runs it for a fixed number of ticks, streams events to
//! stdout as JSON lines and prints the final status.
//!
//! # Examples
//!
//! ```bash
//! PICKUP_TICKS=100 PICKUP_TICK_MS=20 cargo run -p pickup-client
//! PICKUP_RULES_DIR=./rules RUST_LOG=pickup=trace cargo run -p pickup-client
//! ```
mod config;
mod demo;
mod logging;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use pickup_runtime::{FileRuleSource, PickupRuntime, RuleSource, Topic};

use crate::config::ClientConfig;
use crate::demo::DemoHost;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env();
    let _log_guard = logging::setup_logging(config.log_dir.as_deref())?;

    let runtime_config = config.load_runtime_config()?;
    let rules: Arc<dyn RuleSource> = match &config.rules_dir {
        Some(dir) => {
            demo::write_sample_rules(dir).await?;
            Arc::new(FileRuleSource::new(dir))
        }
        None => Arc::new(demo::sample_rules()),
    };

    let host = Arc::new(DemoHost::new());
    let mut runtime = PickupRuntime::builder()
        .config(runtime_config)
        .world(host.clone())
        .inventory(host.clone())
        .bridge(host.clone())
        .rule_source(rules)
        .build()?;

    let report = runtime.load_filters().await?;
    tracing::info!(
        loaded = ?report.loaded,
        failed = ?report.failed,
        invalid_lines = report.invalid_lines,
        "rules loaded"
    );

    let handle = runtime.handle();
    let printers: Vec<_> = Topic::ALL
        .into_iter()
        .map(|topic| {
            let mut events = handle.subscribe(topic);
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => match serde_json::to_string(&event) {
                            Ok(line) => println!("{line}"),
                            Err(e) => tracing::warn!("failed to encode event: {}", e),
                        },
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(?topic, skipped, "event printer lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            })
        })
        .collect();

    tracing::info!(ticks = config.ticks, "starting demo session");
    let mut interval = tokio::time::interval(runtime.config().tick_interval);
    for tick in 0..config.ticks {
        interval.tick().await;
        host.script(tick);
        runtime.on_tick();
    }

    let status = handle.status();
    runtime.shutdown();
    // Dropping the last bus sender closes the printers once they drain.
    drop(handle);
    for printer in printers {
        printer.await?;
    }

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
