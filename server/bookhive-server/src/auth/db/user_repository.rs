/// User repository
///
/// Read-side collaborator for the auth core: the refresh endpoint re-checks
/// the owning account and `/auth/info` reports it. Account creation happens
/// in the identity bridge, inside its own transaction.
use database_layer::DatabasePool;
use uuid::Uuid;

use crate::auth::models::User;

pub type DbResult<T> = Result<T, sqlx::Error>;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: DatabasePool,
}

impl UserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_active, avatar_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
    }

    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_active, avatar_url, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool.pool())
        .await
    }
}
