//! Shared helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use guid_auth::auth::{SessionService, TokenManager, MIN_HASH_COST};
use guid_auth::configuration::{ApplicationSettings, AuthSettings, Environment};
use guid_auth::error::RepositoryError;
use guid_auth::repository::{
    InMemoryUserRepository, RepositoryResult, StoredSession, User, UserRepository,
};
use std::sync::Arc;
use std::time::Duration;

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        signing_key: "test-secret-key-at-least-32-characters-long".to_string(),
        issuer: "guid_auth-test".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 3600,
        hash_cost: MIN_HASH_COST,
        operation_timeout: 5,
        scan_timeout: 60,
    }
}

pub fn application_settings() -> ApplicationSettings {
    ApplicationSettings {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: Environment::Local,
        request_timeout: 5,
        keep_alive: 5,
        shutdown_timeout: 1,
    }
}

pub fn service_with(repository: Arc<dyn UserRepository>, settings: &AuthSettings) -> SessionService {
    let tokens = TokenManager::new(settings).expect("valid test settings");
    SessionService::new(repository, Arc::new(tokens), settings)
}

pub fn in_memory_service() -> (SessionService, InMemoryUserRepository) {
    let repository = InMemoryUserRepository::new();
    let service = service_with(Arc::new(repository.clone()), &auth_settings());
    (service, repository)
}

pub fn new_guid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Every call fails as if the store were unreachable
pub struct FailingRepository;

#[async_trait]
impl UserRepository for FailingRepository {
    async fn insert(&self, _: &str) -> RepositoryResult<()> {
        Err(RepositoryError::Unexpected("connection refused".to_string()))
    }

    async fn update(&self, _: &str, _: StoredSession) -> RepositoryResult<()> {
        Err(RepositoryError::Unexpected("connection refused".to_string()))
    }

    async fn get(&self, _: &str) -> RepositoryResult<Option<Vec<u8>>> {
        Err(RepositoryError::Unexpected("connection refused".to_string()))
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        Err(RepositoryError::Unexpected("connection refused".to_string()))
    }

    async fn replace_session(&self, _: &str, _: &[u8], _: StoredSession) -> RepositoryResult<()> {
        Err(RepositoryError::Unexpected("connection refused".to_string()))
    }
}

/// Never answers within any reasonable deadline
pub struct StalledRepository;

async fn stall() {
    tokio::time::sleep(Duration::from_secs(60)).await;
}

#[async_trait]
impl UserRepository for StalledRepository {
    async fn insert(&self, _: &str) -> RepositoryResult<()> {
        stall().await;
        Ok(())
    }

    async fn update(&self, _: &str, _: StoredSession) -> RepositoryResult<()> {
        stall().await;
        Ok(())
    }

    async fn get(&self, guid: &str) -> RepositoryResult<Option<Vec<u8>>> {
        stall().await;
        Err(RepositoryError::NotFound(guid.to_string()))
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        stall().await;
        Ok(Vec::new())
    }

    async fn replace_session(&self, _: &str, _: &[u8], _: StoredSession) -> RepositoryResult<()> {
        stall().await;
        Ok(())
    }
}

/// Wraps an in-memory store; the record disappears right before a rotation
/// write, and inserts race with another sign-up.
pub struct RacingRepository {
    pub inner: InMemoryUserRepository,
}

#[async_trait]
impl UserRepository for RacingRepository {
    async fn insert(&self, guid: &str) -> RepositoryResult<()> {
        Err(RepositoryError::Duplicate(guid.to_string()))
    }

    async fn update(&self, guid: &str, session: StoredSession) -> RepositoryResult<()> {
        self.inner.update(guid, session).await
    }

    async fn get(&self, guid: &str) -> RepositoryResult<Option<Vec<u8>>> {
        self.inner.get(guid).await
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        self.inner.get_all().await
    }

    async fn replace_session(&self, guid: &str, _: &[u8], _: StoredSession) -> RepositoryResult<()> {
        Err(RepositoryError::NotFound(guid.to_string()))
    }
}
