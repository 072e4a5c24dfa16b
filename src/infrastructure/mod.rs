//! Infrastructure layer: database, configuration, and logging adapters.

pub mod config;
pub mod database;
pub mod logging;
