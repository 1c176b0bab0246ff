//! Persistence module for pingkeeper.
//!
//! Keeps the project registry and its stats table in memory and mirrors both
//! to JSON files.

mod json_file;
mod models;
mod registry;
mod stats;
mod store;

pub use json_file::*;
pub use models::*;
pub use registry::*;
pub use stats::*;
pub use store::*;
