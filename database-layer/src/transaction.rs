// Explicit scoped transaction management
use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{Postgres, Transaction};
use tracing::debug;

/// Hands out explicit transaction scopes over the shared pool.
///
/// Callers begin a scope, perform their conditional state transition against
/// `&mut *tx`, and commit on the success path only. Every other exit path
/// (early `?`, panic unwind) rolls the transaction back when the guard drops,
/// so a half-applied rotation or identity creation can never persist.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    pool: DatabasePool,
}

impl TransactionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Begin a new transaction scope
    pub async fn begin(&self) -> DatabaseResult<Transaction<'static, Postgres>> {
        debug!("Beginning transaction");

        self.pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to begin transaction: {}", e)))
    }
}
