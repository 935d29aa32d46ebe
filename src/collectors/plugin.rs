//! Lifecycle facade the host drives: `init`, `collect`, `close`, and the
//! identity accessors it uses for scheduling and tagging.

use crate::collectors::{
    config::{
        AUTHORIZATION_KEY_PREFIX, ActivateType, CollectorConfig, PluginConfig, auth_property,
    },
    connector::{Connector, PgConnector},
    error::{CollectionError, ConfigError, ConnectionError},
    pool::ConnectionPool,
    record::MetricRecord,
    registry::ConnectionRegistry,
    tablespace::{METRIC_PREFIX, TablespaceCollector},
};
use std::collections::HashMap;
use tracing::info;

/// Value of the `service` tag on every record.
pub const SERVICE_NAME: &str = "postgresql";

pub struct TablespacePlugin<C: Connector = PgConnector> {
    step: u32,
    activate_type: ActivateType,
    collector: TablespaceCollector<C>,
}

impl TablespacePlugin<PgConnector> {
    /// Initialize from the host's property map using the `sqlx` driver.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the properties are invalid.
    pub fn init(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            PluginConfig::from_properties(properties)?,
            PgConnector,
        ))
    }
}

impl<C: Connector> TablespacePlugin<C> {
    pub fn new(config: PluginConfig, connector: C) -> Self {
        let PluginConfig {
            registry,
            step,
            activate_type,
            hostname,
        } = config;

        let pool = ConnectionPool::new(registry, connector);
        let collector = TablespaceCollector::new(
            CollectorConfig::new(SERVICE_NAME, hostname, step),
            pool,
        );

        Self {
            step,
            activate_type,
            collector,
        }
    }

    #[must_use]
    pub const fn service_name(&self) -> &'static str {
        SERVICE_NAME
    }

    #[must_use]
    pub const fn authorization_key_prefix(&self) -> &'static str {
        AUTHORIZATION_KEY_PREFIX
    }

    /// Property key the host stores this plugin's endpoint list under.
    #[must_use]
    pub fn authorization_key(&self) -> String {
        auth_property()
    }

    #[must_use]
    pub const fn metric_prefix(&self) -> &'static str {
        METRIC_PREFIX
    }

    /// No process-level sign name; endpoints are identified by the `instance` tag.
    #[must_use]
    pub const fn agent_sign_name(&self) -> Option<&'static str> {
        None
    }

    #[must_use]
    pub const fn step(&self) -> u32 {
        self.step
    }

    #[must_use]
    pub const fn activate_type(&self) -> ActivateType {
        self.activate_type
    }

    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        self.collector.pool().registry()
    }

    #[must_use]
    pub const fn pool(&self) -> &ConnectionPool<C> {
        self.collector.pool()
    }

    /// Decide whether the plugin should run.
    ///
    /// `Disabled` never runs, `Force` always does, `Auto` runs only if every
    /// endpoint can be opened now.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when `Auto` cannot open the endpoints.
    pub async fn activate(&self) -> Result<bool, ConnectionError> {
        match self.activate_type {
            ActivateType::Disabled => Ok(false),
            ActivateType::Force => Ok(true),
            ActivateType::Auto => {
                self.pool().acquire_all().await?;
                info!(endpoints = self.registry().len(), "service detected");
                Ok(true)
            }
        }
    }

    /// One collection cycle.
    ///
    /// # Errors
    ///
    /// See [`TablespaceCollector::collect`].
    pub async fn collect(&self) -> Result<Vec<MetricRecord>, CollectionError> {
        self.collector.collect().await
    }

    /// Close every pooled connection.
    ///
    /// # Errors
    ///
    /// See [`ConnectionPool::close_all`].
    pub async fn close(&self) -> Result<(), ConnectionError> {
        self.pool().close_all().await
    }
}
