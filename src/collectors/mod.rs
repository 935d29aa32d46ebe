//! Tablespace usage collection: endpoint parsing, the per-endpoint
//! connection pool and the collector that maps query rows to records.

pub mod config;
pub mod connector;
pub mod error;
pub mod plugin;
pub mod pool;
pub mod record;
pub mod registry;
pub mod tablespace;

pub use config::{ActivateType, CollectorConfig, PluginConfig};
pub use connector::{Connection, Connector, PgConnector, PgSession};
pub use error::{CollectionError, ConfigError, ConnectionError, DriverError};
pub use plugin::TablespacePlugin;
pub use pool::{ConnectionPool, ConnectionState, Handle};
pub use record::{CounterType, MetricRecord};
pub use registry::{ConnectionRegistry, EndpointConfig};
pub use tablespace::{TablespaceCollector, TablespaceRow};
