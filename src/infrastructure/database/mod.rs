//! Database infrastructure: connection pooling and the `SQLite` feedback
//! store.

pub mod connection;
pub mod feedback_repo;

pub use connection::DatabaseConnection;
pub use feedback_repo::SqliteFeedbackStore;
