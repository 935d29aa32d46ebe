use crate::cli::{actions::Action, commands, dispatch::handler, telemetry};
use anyhow::Result;
use tracing::debug;

/// Map the `-v` count to a tracing level; none means errors only.
const fn get_verbosity_level(verbose_count: u8) -> Option<tracing::Level> {
    match verbose_count {
        0 => None,
        1 => Some(tracing::Level::INFO),
        2 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

/// Parse arguments, set up telemetry and resolve the action to run.
///
/// # Errors
///
/// Returns an error if telemetry initialization or argument handling fails,
/// including malformed endpoint records.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(get_verbosity_level(matches.get_count("verbose")))?;

    let action = handler(&matches)?;

    debug!(?action, "dispatched");

    Ok(action)
}
