//! Error kinds surfaced by the tablespace plugin.
//!
//! - [`ConfigError`] is fatal at initialization.
//! - [`ConnectionError`] is returned by pool operations; pool state is kept as is.
//! - [`CollectionError`] aborts one collection cycle only.

use thiserror::Error;

/// Error type returned by a database driver across the connector seam.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("record {record}: missing marker '{marker}'")]
    MissingMarker { record: usize, marker: &'static str },

    #[error("record {record}: marker '{marker}' must follow '{after}'")]
    MarkerOutOfOrder {
        record: usize,
        marker: &'static str,
        after: &'static str,
    },

    #[error("record {record}: no separator before marker '{marker}'")]
    MissingSeparator { record: usize, marker: &'static str },

    #[error("record {record}: empty address")]
    EmptyAddress { record: usize },

    #[error("missing property '{0}'")]
    MissingProperty(&'static str),

    #[error("invalid step '{0}': expected a positive integer of seconds")]
    InvalidStep(String),

    #[error("unknown activate type '{0}': expected auto, force or disabled")]
    UnknownActivateType(String),
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: DriverError,
    },

    #[error("failed to close connection to {endpoint}: {source}")]
    Close {
        endpoint: String,
        #[source]
        source: DriverError,
    },
}

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("tablespace query failed on {endpoint}: {source}")]
    Query {
        endpoint: String,
        #[source]
        source: DriverError,
    },

    #[error("malformed row from {endpoint}: column '{column}' is NULL")]
    MalformedRow {
        endpoint: String,
        column: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_names_endpoint() {
        let err = ConnectionError::Connect {
            endpoint: "postgresql://db1:5432/app".to_string(),
            source: "connection refused".into(),
        };

        assert_eq!(
            err.to_string(),
            "failed to connect to postgresql://db1:5432/app: connection refused"
        );
    }

    #[test]
    fn test_collection_error_wraps_connection_error() {
        let err: CollectionError = ConnectionError::Close {
            endpoint: "db1".to_string(),
            source: "broken pipe".into(),
        }
        .into();

        assert!(matches!(err, CollectionError::Connection(_)));
        assert_eq!(
            err.to_string(),
            "failed to close connection to db1: broken pipe"
        );
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::MissingMarker {
            record: 2,
            marker: "pswd=",
        };
        assert_eq!(err.to_string(), "record 2: missing marker 'pswd='");

        let err = ConfigError::InvalidStep("abc".to_string());
        assert!(err.to_string().contains("abc"));
    }
}
