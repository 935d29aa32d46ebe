//! Driver seam between the pool and the database.
//!
//! [`Connector`] opens connections, [`Connection`] is the opaque handle the
//! pool owns. [`PgConnector`] and [`PgSession`] are the `sqlx` implementations.

use crate::collectors::{
    error::DriverError, registry::EndpointConfig, tablespace::TablespaceRow,
};
use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use sqlx::{
    Connection as _, PgConnection, Row,
    postgres::{PgConnectOptions, PgRow},
};
use std::str::FromStr;

pub trait Connector: Send + Sync {
    type Connection: Connection;

    fn connect<'a>(
        &'a self,
        endpoint: &'a EndpointConfig,
    ) -> BoxFuture<'a, Result<Self::Connection, DriverError>>;
}

pub trait Connection: Send + 'static {
    /// Liveness probe. `Ok(false)` means the transport reported closure.
    fn is_open(&mut self) -> BoxFuture<'_, Result<bool, DriverError>>;

    fn close(&mut self) -> BoxFuture<'_, Result<(), DriverError>>;

    /// Run the tablespace statement and return its rows in server order.
    fn fetch_tablespace_usage<'a>(
        &'a mut self,
        statement: &'static str,
    ) -> BoxFuture<'a, Result<Vec<TablespaceRow>, DriverError>>;
}

/// Opens one plain `PgConnection` per endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct PgConnector;

impl PgConnector {
    /// Connect options for an endpoint. The endpoint's username and secret
    /// take precedence over credentials embedded in the address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a valid `PostgreSQL` URL.
    pub fn connect_options(endpoint: &EndpointConfig) -> Result<PgConnectOptions, sqlx::Error> {
        let mut opts = PgConnectOptions::from_str(endpoint.address())?
            .application_name(env!("CARGO_PKG_NAME"));

        if !endpoint.username().is_empty() {
            opts = opts.username(endpoint.username());
        }

        let secret = endpoint.secret().expose_secret();
        if !secret.is_empty() {
            opts = opts.password(secret);
        }

        Ok(opts)
    }
}

impl Connector for PgConnector {
    type Connection = PgSession;

    fn connect<'a>(
        &'a self,
        endpoint: &'a EndpointConfig,
    ) -> BoxFuture<'a, Result<PgSession, DriverError>> {
        Box::pin(async move {
            let opts = Self::connect_options(endpoint)?;
            let conn = PgConnection::connect_with(&opts).await?;
            Ok(PgSession { conn: Some(conn) })
        })
    }
}

/// A single connection; `None` once closed.
#[derive(Debug)]
pub struct PgSession {
    conn: Option<PgConnection>,
}

impl Connection for PgSession {
    fn is_open(&mut self) -> BoxFuture<'_, Result<bool, DriverError>> {
        Box::pin(async move {
            match self.conn.as_mut() {
                Some(conn) => {
                    conn.ping().await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), DriverError>> {
        Box::pin(async move {
            if let Some(conn) = self.conn.take() {
                conn.close().await?;
            }
            Ok(())
        })
    }

    fn fetch_tablespace_usage<'a>(
        &'a mut self,
        statement: &'static str,
    ) -> BoxFuture<'a, Result<Vec<TablespaceRow>, DriverError>> {
        Box::pin(async move {
            let conn = self.conn.as_mut().ok_or("connection is closed")?;

            let rows = sqlx::query(statement).fetch_all(&mut *conn).await?;

            let usage = rows
                .iter()
                .map(tablespace_row)
                .collect::<Result<Vec<_>, sqlx::Error>>()?;

            Ok(usage)
        })
    }
}

fn tablespace_row(row: &PgRow) -> Result<TablespaceRow, sqlx::Error> {
    Ok(TablespaceRow {
        name: row.try_get("tsname")?,
        percent: row.try_get("percent")?,
    })
}
