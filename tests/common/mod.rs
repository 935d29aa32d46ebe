#![allow(dead_code)]

//! Scripted in-memory driver for exercising the pool and collector without a
//! database. Behaviour is keyed by endpoint host name (`a`, `b`, ...).

use futures::future::BoxFuture;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};
use ts_exporter::collectors::{
    Connection, ConnectionRegistry, Connector, DriverError, EndpointConfig, TablespaceRow,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    Open,
    Closed,
    Fail,
}

#[derive(Default)]
pub struct FakeState {
    connects: Mutex<Vec<String>>,
    closes: Mutex<Vec<String>>,
    fail_connect: Mutex<HashSet<String>>,
    fail_close: Mutex<HashSet<String>>,
    fail_query: Mutex<HashSet<String>>,
    rows: Mutex<HashMap<String, Vec<TablespaceRow>>>,
    sessions: Mutex<Vec<(String, Arc<Mutex<Probe>>)>>,
}

impl FakeState {
    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }

    pub fn connects_to(&self, host: &str) -> usize {
        self.connects().iter().filter(|h| *h == host).count()
    }

    pub fn closes(&self) -> Vec<String> {
        self.closes.lock().unwrap().clone()
    }

    pub fn fail_connect(&self, host: &str, fail: bool) {
        let mut set = self.fail_connect.lock().unwrap();
        if fail {
            set.insert(host.to_string());
        } else {
            set.remove(host);
        }
    }

    pub fn fail_close(&self, host: &str) {
        self.fail_close.lock().unwrap().insert(host.to_string());
    }

    pub fn fail_query(&self, host: &str) {
        self.fail_query.lock().unwrap().insert(host.to_string());
    }

    pub fn set_rows(&self, host: &str, rows: Vec<TablespaceRow>) {
        self.rows.lock().unwrap().insert(host.to_string(), rows);
    }

    /// Change the probe result of the most recent session opened for `host`.
    pub fn set_probe(&self, host: &str, probe: Probe) {
        let sessions = self.sessions.lock().unwrap();
        let (_, current) = sessions
            .iter()
            .rev()
            .find(|(h, _)| h == host)
            .expect("no session for host");
        *current.lock().unwrap() = probe;
    }
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    pub state: Arc<FakeState>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct FakeConnection {
    host: String,
    probe: Arc<Mutex<Probe>>,
    state: Arc<FakeState>,
}

impl std::fmt::Debug for FakeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeConnection").field("host", &self.host).finish_non_exhaustive()
    }
}

fn host_of(endpoint: &EndpointConfig) -> String {
    url::Url::parse(endpoint.address())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

impl Connector for FakeConnector {
    type Connection = FakeConnection;

    fn connect<'a>(
        &'a self,
        endpoint: &'a EndpointConfig,
    ) -> BoxFuture<'a, Result<FakeConnection, DriverError>> {
        Box::pin(async move {
            let host = host_of(endpoint);
            self.state.connects.lock().unwrap().push(host.clone());

            if self.state.fail_connect.lock().unwrap().contains(&host) {
                return Err(format!("connection refused by {host}").into());
            }

            let probe = Arc::new(Mutex::new(Probe::Open));
            self.state
                .sessions
                .lock()
                .unwrap()
                .push((host.clone(), Arc::clone(&probe)));

            Ok(FakeConnection {
                host,
                probe,
                state: Arc::clone(&self.state),
            })
        })
    }
}

impl FakeConnection {
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Connection for FakeConnection {
    fn is_open(&mut self) -> BoxFuture<'_, Result<bool, DriverError>> {
        Box::pin(async move {
            match *self.probe.lock().unwrap() {
                Probe::Open => Ok(true),
                Probe::Closed => Ok(false),
                Probe::Fail => Err("probe failed".into()),
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), DriverError>> {
        Box::pin(async move {
            if self.state.fail_close.lock().unwrap().contains(&self.host) {
                return Err(format!("close failed on {}", self.host).into());
            }
            self.state.closes.lock().unwrap().push(self.host.clone());
            *self.probe.lock().unwrap() = Probe::Closed;
            Ok(())
        })
    }

    fn fetch_tablespace_usage<'a>(
        &'a mut self,
        _statement: &'static str,
    ) -> BoxFuture<'a, Result<Vec<TablespaceRow>, DriverError>> {
        Box::pin(async move {
            if self.state.fail_query.lock().unwrap().contains(&self.host) {
                return Err(format!("relation \"pg_class\" does not exist on {}", self.host).into());
            }
            Ok(self
                .state
                .rows
                .lock()
                .unwrap()
                .get(&self.host)
                .cloned()
                .unwrap_or_default())
        })
    }
}

pub fn endpoint(host: &str) -> EndpointConfig {
    EndpointConfig::new(format!("postgresql://{host}:5432/app"), "monitor", "secret")
}

pub fn registry(hosts: &[&str]) -> ConnectionRegistry {
    ConnectionRegistry::from(hosts.iter().map(|h| endpoint(h)).collect::<Vec<_>>())
}
