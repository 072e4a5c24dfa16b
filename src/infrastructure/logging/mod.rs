//! Logging setup built on tracing.

pub mod logger;

pub use logger::Logger;
