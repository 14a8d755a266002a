//! PostgreSQL user repository
//!
//! Table layout lives in `migrations/`. The hash and expiry columns are
//! nullable and always written together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{RepositoryResult, StoredSession, User, UserRepository};
use crate::error::RepositoryError;

const UNIQUE_VIOLATION: &str = "23505";

type UserRow = (String, Option<Vec<u8>>, Option<DateTime<Utc>>);

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn exists(&self, guid: &str) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE guid = $1)")
            .bind(guid)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Unexpected(err.to_string())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

/// A row only carries a session when both columns are set
fn user_from_row((guid, hash, expires_at): UserRow) -> User {
    let session = match (hash, expires_at) {
        (Some(refresh_token_hash), Some(expires_at)) if !refresh_token_hash.is_empty() => {
            Some(StoredSession {
                refresh_token_hash,
                expires_at,
            })
        }
        _ => None,
    };
    User { guid, session }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, guid: &str) -> RepositoryResult<()> {
        sqlx::query("INSERT INTO users (guid) VALUES ($1)")
            .bind(guid)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::Duplicate(guid.to_string())
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    async fn update(&self, guid: &str, session: StoredSession) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $1, expires_at = $2
            WHERE guid = $3
            "#,
        )
        .bind(session.refresh_token_hash)
        .bind(session.expires_at)
        .bind(guid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(guid.to_string()));
        }
        Ok(())
    }

    async fn get(&self, guid: &str) -> RepositoryResult<Option<Vec<u8>>> {
        let row = sqlx::query_as::<_, (Option<Vec<u8>>,)>(
            "SELECT refresh_token_hash FROM users WHERE guid = $1",
        )
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((hash,)) => Ok(hash.filter(|h| !h.is_empty())),
            None => Err(RepositoryError::NotFound(guid.to_string())),
        }
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT guid, refresh_token_hash, expires_at FROM users",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(user_from_row).collect())
    }

    async fn replace_session(
        &self,
        guid: &str,
        expected_hash: &[u8],
        session: StoredSession,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $1, expires_at = $2
            WHERE guid = $3 AND refresh_token_hash = $4
            "#,
        )
        .bind(session.refresh_token_hash)
        .bind(session.expires_at)
        .bind(guid)
        .bind(expected_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return if self.exists(guid).await? {
                Err(RepositoryError::Conflict(guid.to_string()))
            } else {
                Err(RepositoryError::NotFound(guid.to_string()))
            };
        }
        Ok(())
    }
}
