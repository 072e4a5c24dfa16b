//! Domain layer: pure business logic, models, and port traits.

pub mod errors;
pub mod models;
pub mod ports;
