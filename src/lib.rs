//! Tablespace usage collector for `PostgreSQL` endpoints.
//!
//! [`collectors`] holds the endpoint registry, the self-healing connection
//! pool and the tablespace collector; [`exporter`] drives them on a fixed
//! interval and hands each batch to a reporter.

pub mod cli;
pub mod collectors;
pub mod exporter;
