use crate::collectors::{error::ConfigError, registry::ConnectionRegistry};
use std::{collections::HashMap, fmt, str::FromStr};
use sysinfo::System;

/// Prefix of the host's authorization properties for this plugin.
pub const AUTHORIZATION_KEY_PREFIX: &str = "PostgreSQL";
pub const AUTH_PROPERTY_SUFFIX: &str = ".jdbc.auth";
pub const STEP_PROPERTY: &str = "step";
pub const ACTIVATE_TYPE_PROPERTY: &str = "pluginActivateType";
pub const HOSTNAME_PROPERTY: &str = "hostname";

/// Key of the endpoint list in the host's property map, `PostgreSQL.jdbc.auth`.
#[must_use]
pub fn auth_property() -> String {
    format!("{AUTHORIZATION_KEY_PREFIX}{AUTH_PROPERTY_SUFFIX}")
}

/// How the host should run the plugin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActivateType {
    /// Run only if the endpoints answer when the plugin starts.
    #[default]
    Auto,
    /// Run unconditionally; failed cycles are retried on the next tick.
    Force,
    /// Never run.
    Disabled,
}

impl ActivateType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Force => "force",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for ActivateType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "force" => Ok(Self::Force),
            "disabled" => Ok(Self::Disabled),
            _ => Err(ConfigError::UnknownActivateType(s.to_string())),
        }
    }
}

impl fmt::Display for ActivateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings shared by every record the collector builds.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Value of the `service` tag.
    pub service: String,
    /// Agent host name, reported as the record endpoint.
    pub hostname: String,
    /// Collection interval in seconds.
    pub step: u32,
}

impl CollectorConfig {
    pub fn new(service: impl Into<String>, hostname: impl Into<String>, step: u32) -> Self {
        Self {
            service: service.into(),
            hostname: hostname.into(),
            step,
        }
    }
}

/// Everything the plugin needs at initialization.
#[derive(Clone, Debug)]
pub struct PluginConfig {
    pub registry: ConnectionRegistry,
    pub step: u32,
    pub activate_type: ActivateType,
    pub hostname: String,
}

impl PluginConfig {
    /// Build the config from the host's property map.
    ///
    /// A missing or empty `PostgreSQL.jdbc.auth` property yields no endpoints;
    /// `step` and `pluginActivateType` are required.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on a malformed auth record, a non-positive or
    /// non-numeric step, or an unknown activate type.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let registry = match properties.get(&auth_property()) {
            Some(auth) => ConnectionRegistry::parse(auth)?,
            None => ConnectionRegistry::default(),
        };

        let step = properties
            .get(STEP_PROPERTY)
            .ok_or(ConfigError::MissingProperty(STEP_PROPERTY))
            .and_then(|s| parse_step(s))?;

        let activate_type = properties
            .get(ACTIVATE_TYPE_PROPERTY)
            .ok_or(ConfigError::MissingProperty(ACTIVATE_TYPE_PROPERTY))?
            .parse()?;

        let hostname = properties
            .get(HOSTNAME_PROPERTY)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(default_hostname);

        Ok(Self {
            registry,
            step,
            activate_type,
            hostname,
        })
    }
}

/// Parse a collection interval, which must be a positive number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidStep`] if the value is not a positive integer.
pub fn parse_step(value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(step) if step > 0 => Ok(step),
        _ => Err(ConfigError::InvalidStep(value.to_string())),
    }
}

/// Host name of the machine running the agent, `localhost` if unknown.
#[must_use]
pub fn default_hostname() -> String {
    System::host_name().unwrap_or_else(|| "localhost".to_string())
}
