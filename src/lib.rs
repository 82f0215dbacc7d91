//! Dashboard core for the QPep network accelerator: state store, telemetry
//! polling, notifications and polled statistics tables.

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod notify;
pub mod runtime;
pub mod startup;
pub mod state;
pub mod table;
pub mod telemetry;
pub mod ui;
