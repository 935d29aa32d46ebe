use crate::cli::{actions::Action, telemetry::shutdown_tracer};
use crate::collectors::{PgConnector, TablespacePlugin};
use crate::exporter::{PushReporter, Reporter, StdoutReporter, run, shutdown::shutdown_signal};
use anyhow::Result;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the push URL is invalid or the exporter fails.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run { config, push_url } => {
            let reporter: Box<dyn Reporter> = match push_url {
                Some(url) => Box::new(PushReporter::new(&url)?),
                None => Box::new(StdoutReporter),
            };

            let plugin = TablespacePlugin::new(config, PgConnector);
            let result = run(&plugin, reporter.as_ref(), shutdown_signal()).await;

            shutdown_tracer();

            result?;
        }
    }

    Ok(())
}
