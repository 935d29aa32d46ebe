//! Command line entry: argument definitions, dispatch into an [`actions::Action`]
//! and telemetry setup.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

mod start;
pub use self::start::start;
