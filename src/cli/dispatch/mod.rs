use crate::{
    cli::actions::Action,
    collectors::{
        ActivateType, ConnectionRegistry, PluginConfig,
        config::default_hostname,
    },
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use tracing::info;

/// Turn parsed arguments into the action to run.
///
/// # Errors
///
/// Returns an error if a required argument is missing or the auth records
/// are malformed.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let auth = matches
        .get_one::<String>("auth")
        .ok_or_else(|| anyhow!("Endpoints are required. Please provide them using the --auth flag."))?;

    let registry = ConnectionRegistry::parse(auth).context("Invalid --auth records")?;

    info!(endpoints = registry.len(), "endpoints configured");

    let step = matches
        .get_one::<u32>("step")
        .copied()
        .ok_or_else(|| anyhow!("Step is required. Please provide it using the --step flag."))?;

    let activate_type = matches
        .get_one::<String>("activate-type")
        .map_or(Ok(ActivateType::default()), |s| s.parse::<ActivateType>())?;

    let hostname = matches
        .get_one::<String>("hostname")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_hostname);

    Ok(Action::Run {
        config: PluginConfig {
            registry,
            step,
            activate_type,
            hostname,
        },
        push_url: matches.get_one::<String>("push-url").cloned(),
    })
}
