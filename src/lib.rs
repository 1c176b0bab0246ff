//! pingkeeper - endpoint reachability monitor.
//!
//! Keeps a persisted list of HTTP(S) endpoints, probes the active ones on a
//! fixed cadence (DNS pre-check, then a GET) and maintains per-endpoint uptime
//! statistics. Front ends drive everything through [`ProjectManager`].

pub mod config;
pub mod db;
pub mod manager;
pub mod probe;
pub mod scheduler;

pub use config::MonitorConfig;
pub use manager::{ProjectManager, StatusReport};
pub use probe::ProbeStatus;
pub use scheduler::SweepSummary;
