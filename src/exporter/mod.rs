use crate::collectors::{Connector, EndpointConfig, TablespacePlugin};
use anyhow::{Context, Result};
use std::{future::Future, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

pub mod reporter;
pub mod shutdown;

pub use reporter::{PushReporter, Reporter, StdoutReporter};

/// Run the plugin until `shutdown` resolves: one collection per `step`
/// seconds, each batch handed to `reporter`. A failed cycle is logged and the
/// next tick retries through the pool's recovery pass.
///
/// # Errors
///
/// Returns an error if `Auto` activation cannot reach the endpoints or if the
/// connections cannot be closed on shutdown.
pub async fn run<C, F>(
    plugin: &TablespacePlugin<C>,
    reporter: &dyn Reporter,
    shutdown: F,
) -> Result<()>
where
    C: Connector,
    F: Future<Output = ()>,
{
    if !plugin
        .activate()
        .await
        .context("Service not available; use --activate-type force to start anyway")?
    {
        info!("plugin disabled, not collecting");
        return Ok(());
    }

    println!(
        "{} {} - Collecting every {}s ({} mode)\n\nEndpoints:\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        plugin.step(),
        plugin.activate_type(),
        format_list(
            &plugin
                .registry()
                .iter()
                .map(EndpointConfig::to_string)
                .collect::<Vec<_>>()
        ),
    );

    let mut ticker = interval(Duration::from_secs(u64::from(plugin.step())));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => collect_and_report(plugin, reporter).await,
        }
    }

    info!("shutting down");

    plugin
        .close()
        .await
        .context("Failed to close database connections")?;

    Ok(())
}

async fn collect_and_report<C: Connector>(plugin: &TablespacePlugin<C>, reporter: &dyn Reporter) {
    match plugin.collect().await {
        Ok(records) => {
            debug!(records = records.len(), "collection cycle finished");
            if let Err(e) = reporter.report(&records).await {
                error!(error = %format!("{e:#}"), "failed to report metrics");
            }
        }
        Err(e) => {
            error!(error = %e, "collection cycle failed");
        }
    }
}

// Helper to format a list of items with a leading dash and indentation for the
// start up message
fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}
