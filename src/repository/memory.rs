//! In-memory user repository

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{RepositoryResult, StoredSession, User, UserRepository};
use crate::error::RepositoryError;

/// `HashMap`-backed store keyed by GUID. Clones share the same map.
#[derive(Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<String, Option<StoredSession>>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, HashMap<String, Option<StoredSession>>>> {
        self.users
            .lock()
            .map_err(|_| RepositoryError::Unexpected("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, guid: &str) -> RepositoryResult<()> {
        let mut users = self.lock()?;
        if users.contains_key(guid) {
            return Err(RepositoryError::Duplicate(guid.to_string()));
        }
        users.insert(guid.to_string(), None);
        Ok(())
    }

    async fn update(&self, guid: &str, session: StoredSession) -> RepositoryResult<()> {
        let mut users = self.lock()?;
        let slot = users
            .get_mut(guid)
            .ok_or_else(|| RepositoryError::NotFound(guid.to_string()))?;
        *slot = Some(session);
        Ok(())
    }

    async fn get(&self, guid: &str) -> RepositoryResult<Option<Vec<u8>>> {
        let users = self.lock()?;
        users
            .get(guid)
            .map(|session| session.as_ref().map(|s| s.refresh_token_hash.clone()))
            .ok_or_else(|| RepositoryError::NotFound(guid.to_string()))
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        let users = self.lock()?;
        Ok(users
            .iter()
            .map(|(guid, session)| User {
                guid: guid.clone(),
                session: session.clone(),
            })
            .collect())
    }

    async fn replace_session(
        &self,
        guid: &str,
        expected_hash: &[u8],
        session: StoredSession,
    ) -> RepositoryResult<()> {
        let mut users = self.lock()?;
        let slot = users
            .get_mut(guid)
            .ok_or_else(|| RepositoryError::NotFound(guid.to_string()))?;

        if !matches!(slot, Some(current) if current.refresh_token_hash == expected_hash) {
            return Err(RepositoryError::Conflict(guid.to_string()));
        }
        *slot = Some(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    const GUID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn session(hash: &[u8]) -> StoredSession {
        StoredSession {
            refresh_token_hash: hash.to_vec(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn insert_then_get_returns_no_hash() {
        let repo = InMemoryUserRepository::new();
        repo.insert(GUID).await.expect("insert");

        assert_eq!(repo.get(GUID).await, Ok(None));
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.insert(GUID).await.expect("insert");

        assert_eq!(
            repo.insert(GUID).await,
            Err(RepositoryError::Duplicate(GUID.to_string()))
        );
    }

    #[tokio::test]
    async fn get_and_update_unknown_guid() {
        let repo = InMemoryUserRepository::new();

        assert!(matches!(repo.get(GUID).await, Err(RepositoryError::NotFound(_))));
        assert!(matches!(
            repo.update(GUID, session(b"h1")).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_replaces_hash_and_expiry_together() {
        let repo = InMemoryUserRepository::new();
        repo.insert(GUID).await.expect("insert");
        let stored = session(b"h1");
        repo.update(GUID, stored.clone()).await.expect("update");

        let users = repo.get_all().await.expect("get_all");
        assert_eq!(users, vec![User { guid: GUID.to_string(), session: Some(stored) }]);
    }

    #[tokio::test]
    async fn replace_session_requires_current_hash() {
        let repo = InMemoryUserRepository::new();
        repo.insert(GUID).await.expect("insert");
        repo.update(GUID, session(b"h1")).await.expect("update");

        repo.replace_session(GUID, b"h1", session(b"h2"))
            .await
            .expect("first replace wins");

        assert_eq!(
            repo.replace_session(GUID, b"h1", session(b"h3")).await,
            Err(RepositoryError::Conflict(GUID.to_string()))
        );
        assert_eq!(repo.get(GUID).await, Ok(Some(b"h2".to_vec())));
    }

    #[tokio::test]
    async fn replace_session_on_bare_record_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.insert(GUID).await.expect("insert");

        assert!(matches!(
            repo.replace_session(GUID, b"h1", session(b"h2")).await,
            Err(RepositoryError::Conflict(_))
        ));
    }
}
