//! Self-healing map of one connection per endpoint.
//!
//! Connections are opened lazily on the first [`ConnectionPool::acquire_all`]
//! and probed on every later call; anything absent, closed or failing its
//! probe is reopened in place. The backing `DashMap` gives single-key atomic
//! updates only, so two concurrent callers may both reopen the same endpoint
//! and the last write wins.

use crate::collectors::{
    connector::{Connection, Connector},
    error::ConnectionError,
    registry::{ConnectionRegistry, EndpointConfig},
};
use dashmap::DashMap;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// Shared handle to a pooled connection. Lock it for the duration of one query.
pub type Handle<T> = Arc<Mutex<T>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never opened, or the last open attempt failed.
    Absent,
    Open,
    /// Closed by [`ConnectionPool::close_all`] or failed its probe.
    Broken,
}

struct Slot<T> {
    state: ConnectionState,
    handle: Option<Handle<T>>,
}

impl<T> Slot<T> {
    fn open(conn: T) -> Self {
        Self {
            state: ConnectionState::Open,
            handle: Some(Arc::new(Mutex::new(conn))),
        }
    }

    const fn absent() -> Self {
        Self {
            state: ConnectionState::Absent,
            handle: None,
        }
    }
}

pub struct ConnectionPool<C: Connector> {
    connector: C,
    registry: ConnectionRegistry,
    slots: DashMap<EndpointConfig, Slot<C::Connection>>,
}

impl<C: Connector> ConnectionPool<C> {
    pub fn new(registry: ConnectionRegistry, connector: C) -> Self {
        Self {
            connector,
            registry,
            slots: DashMap::new(),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Current state of an endpoint; unknown endpoints are `Absent`.
    #[must_use]
    pub fn state(&self, endpoint: &EndpointConfig) -> ConnectionState {
        self.slots
            .get(endpoint)
            .map_or(ConnectionState::Absent, |slot| slot.state)
    }

    /// Number of endpoints with a stored slot, absent ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Return every stored connection, opening or healing them first.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Connect`] for the first endpoint that cannot
    /// be opened or reopened. Connections opened before the failure stay
    /// stored; endpoints after it are not attempted in this call.
    #[instrument(skip(self), level = "debug", err, fields(endpoints = self.registry.len()))]
    pub async fn acquire_all(
        &self,
    ) -> Result<Vec<(EndpointConfig, Handle<C::Connection>)>, ConnectionError> {
        if self.slots.is_empty() {
            self.open_all().await?;
        } else {
            self.recover().await?;
        }

        Ok(self.snapshot())
    }

    /// Close every stored connection in registry order, once per endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Close`] on the first failing close; the
    /// remaining connections are left open.
    #[instrument(skip(self), level = "debug", err)]
    pub async fn close_all(&self) -> Result<(), ConnectionError> {
        for endpoint in self.endpoints() {
            let Some(handle) = self.handle(endpoint) else {
                continue;
            };

            handle
                .lock()
                .await
                .close()
                .await
                .map_err(|source| ConnectionError::Close {
                    endpoint: endpoint.to_string(),
                    source,
                })?;

            self.set_state(endpoint, ConnectionState::Broken);
            debug!(%endpoint, "connection closed");
        }

        Ok(())
    }

    // The first failure returns without rolling back the connections already
    // opened in this pass.
    async fn open_all(&self) -> Result<(), ConnectionError> {
        for endpoint in self.endpoints() {
            self.reopen(endpoint).await?;
            info!(%endpoint, "connection opened");
        }

        Ok(())
    }

    // A probe failure only marks the slot broken; a reopen failure aborts the
    // pass and leaves later endpoints untouched.
    async fn recover(&self) -> Result<(), ConnectionError> {
        for endpoint in self.endpoints() {
            if self.probe(endpoint).await {
                continue;
            }

            self.set_state(endpoint, ConnectionState::Broken);
            self.reopen(endpoint).await?;
            info!(%endpoint, "connection reopened");
        }

        Ok(())
    }

    async fn probe(&self, endpoint: &EndpointConfig) -> bool {
        let Some(handle) = self.handle(endpoint) else {
            debug!(%endpoint, "no connection stored");
            return false;
        };

        let mut conn = handle.lock().await;
        match conn.is_open().await {
            Ok(true) => true,
            Ok(false) => {
                warn!(%endpoint, "connection is closed");
                false
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "liveness probe failed");
                false
            }
        }
    }

    async fn reopen(&self, endpoint: &EndpointConfig) -> Result<(), ConnectionError> {
        let span = info_span!(
            "db.connect",
            otel.kind = "client",
            db.system = "postgresql",
            endpoint = %endpoint
        );

        match self.connector.connect(endpoint).instrument(span).await {
            Ok(conn) => {
                self.slots.insert(endpoint.clone(), Slot::open(conn));
                Ok(())
            }
            Err(source) => {
                self.slots.insert(endpoint.clone(), Slot::absent());
                Err(ConnectionError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }
        }
    }

    fn handle(&self, endpoint: &EndpointConfig) -> Option<Handle<C::Connection>> {
        self.slots
            .get(endpoint)
            .and_then(|slot| slot.handle.clone())
    }

    fn set_state(&self, endpoint: &EndpointConfig, state: ConnectionState) {
        if let Some(mut slot) = self.slots.get_mut(endpoint)
            && slot.handle.is_some()
        {
            slot.state = state;
        }
    }

    // Registry order with repeated records dropped; the map holds one slot per
    // distinct endpoint.
    fn endpoints(&self) -> Vec<&EndpointConfig> {
        let mut seen = HashSet::new();
        self.registry
            .iter()
            .filter(|endpoint| seen.insert(*endpoint))
            .collect()
    }

    fn snapshot(&self) -> Vec<(EndpointConfig, Handle<C::Connection>)> {
        self.endpoints()
            .into_iter()
            .filter_map(|endpoint| Some((endpoint.clone(), self.handle(endpoint)?)))
            .collect()
    }
}
