//! User repository
//!
//! One record per user GUID. The repository stores what the session engine
//! hands it and holds no business logic of its own.

mod memory;
mod postgres;

pub use memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RepositoryError;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// The persisted half of a session: the refresh token's hash and when it stops
/// being honoured. Always written as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub refresh_token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

/// User record
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub guid: String,
    /// `None` until the first sign-in
    pub session: Option<StoredSession>,
}

impl User {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            session: None,
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a bare record. `Duplicate` if the GUID is taken.
    async fn insert(&self, guid: &str) -> RepositoryResult<()>;

    /// Overwrite the stored session. `NotFound` if the GUID has no record.
    async fn update(&self, guid: &str, session: StoredSession) -> RepositoryResult<()>;

    /// Stored refresh-token hash, `None` if no session was ever established.
    /// `NotFound` if the GUID has no record.
    async fn get(&self, guid: &str) -> RepositoryResult<Option<Vec<u8>>>;

    /// Every user record
    async fn get_all(&self) -> RepositoryResult<Vec<User>>;

    /// Overwrite the stored session only if the stored hash still equals
    /// `expected_hash`. `Conflict` if it changed, `NotFound` if the record is gone.
    async fn replace_session(
        &self,
        guid: &str,
        expected_hash: &[u8],
        session: StoredSession,
    ) -> RepositoryResult<()>;
}
