//! CLI command implementations.

pub mod history;
pub mod init;
pub mod stats;
