//! Database connection and transaction layer for Bookhive
//!
//! Wraps the sqlx Postgres pool behind a small, injectable handle and provides
//! explicit scoped transactions for the write paths that need atomic
//! conditional state transitions (refresh-session rotation, first-login
//! identity creation).

pub mod connection;
pub mod error;
pub mod transaction;

pub use connection::DatabasePool;
pub use error::{is_unique_violation, DatabaseError, DatabaseResult};
pub use transaction::TransactionManager;
