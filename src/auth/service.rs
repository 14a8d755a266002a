/// Session Engine
///
/// Implements sign-up, sign-in and refresh-token rotation on top of the token
/// manager, the credential hasher and a user repository. It is the only writer
/// of user records and keeps no mutable state between calls.
///
/// Refresh tokens are stored only as bcrypt hashes, so a presented token cannot
/// be looked up by value. `refresh` therefore loads every user and compares the
/// token against each stored hash: O(users) slow comparisons per call. Adding an
/// index on anything derived from the secret would defeat hash-only storage.
///
/// Storage round trips run under `operation_timeout`. The scan has its own
/// budget (`scan_timeout`) and stops between compares once that budget is
/// spent or the caller drops the request.
///
/// Rotation writes with a compare-and-swap on the hash that was just verified,
/// so two concurrent refreshes presenting the same token cannot both succeed.

use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::hasher::CredentialHasher;
use crate::auth::token::{TokenManager, TokenPair};
use crate::configuration::AuthSettings;
use crate::error::{AuthError, RepositoryError};
use crate::repository::{StoredSession, User, UserRepository};

#[derive(Clone)]
pub struct SessionService {
    repository: Arc<dyn UserRepository>,
    tokens: Arc<TokenManager>,
    hasher: CredentialHasher,
    refresh_token_ttl: chrono::Duration,
    operation_timeout: Duration,
    scan_timeout: Duration,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        tokens: Arc<TokenManager>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            repository,
            tokens,
            hasher: CredentialHasher::new(settings.hash_cost),
            refresh_token_ttl: settings.refresh_token_ttl(),
            operation_timeout: settings.operation_timeout(),
            scan_timeout: settings.scan_timeout(),
        }
    }

    pub fn token_manager(&self) -> Arc<TokenManager> {
        Arc::clone(&self.tokens)
    }

    /// Register `guid` with no session.
    ///
    /// # Errors
    /// - `UserAlreadyExists` if a record for `guid` exists
    /// - `Internal` on storage failure or deadline
    pub async fn sign_up(&self, guid: &str) -> Result<(), AuthError> {
        self.with_deadline("sign_up", self.register(guid)).await
    }

    /// Start a session for an existing user, replacing any previous one.
    ///
    /// # Errors
    /// - `UserNotFound` if `guid` was never registered
    /// - `Internal` on token, hashing or storage failure, or deadline
    pub async fn sign_in(&self, guid: &str) -> Result<TokenPair, AuthError> {
        self.with_deadline("sign_in", self.start_session(guid)).await
    }

    /// Exchange a refresh token for a new pair. The presented token is
    /// unusable afterwards.
    ///
    /// # Errors
    /// - `InvalidCredentials` if no stored hash matches, the matched session has
    ///   expired, or a concurrent refresh already rotated it
    /// - `UserNotFound` if the matched record vanished before the write
    /// - `Internal` on token, hashing or storage failure, storage deadline, or
    ///   an exhausted scan budget
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.rotate(refresh_token).await
    }

    async fn register(&self, guid: &str) -> Result<(), AuthError> {
        const OP: &str = "sign_up";

        match self.repository.get(guid).await {
            Ok(_) => {
                tracing::warn!(guid = guid, "Sign-up for existing user");
                return Err(AuthError::UserAlreadyExists);
            }
            Err(RepositoryError::NotFound(_)) => {}
            Err(e) => return Err(internal(OP, Some(guid), e)),
        }

        self.repository.insert(guid).await.map_err(|e| match e {
            RepositoryError::Duplicate(_) => {
                tracing::warn!(guid = guid, "Concurrent sign-up for the same user");
                AuthError::UserAlreadyExists
            }
            other => internal(OP, Some(guid), other),
        })?;

        tracing::info!(guid = guid, "User registered");
        Ok(())
    }

    async fn start_session(&self, guid: &str) -> Result<TokenPair, AuthError> {
        const OP: &str = "sign_in";

        let (pair, session) = self.create_session(OP, guid).await?;

        self.repository.update(guid, session).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => {
                tracing::warn!(guid = guid, "Sign-in for unknown user");
                AuthError::UserNotFound
            }
            other => internal(OP, Some(guid), other),
        })?;

        tracing::info!(guid = guid, "Session started");
        Ok(pair)
    }

    async fn rotate(&self, presented: &str) -> Result<TokenPair, AuthError> {
        const OP: &str = "refresh";

        let users = self
            .with_deadline(OP, async {
                self.repository
                    .get_all()
                    .await
                    .map_err(|e| internal(OP, None, e))
            })
            .await?;
        let scanned = users.len();

        let Some((guid, current)) = self.scan(users, presented).await? else {
            tracing::warn!(scanned = scanned, "Refresh token matched no stored session");
            return Err(AuthError::InvalidCredentials);
        };

        if let Err(e) = self.tokens.validate_refresh_expiry(current.expires_at) {
            tracing::warn!(guid = %guid, error = %e, "Refresh token presented after expiry");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self
            .with_deadline(OP, self.commit_rotation(&guid, &current.refresh_token_hash))
            .await?;

        tracing::info!(guid = %guid, scanned = scanned, "Session rotated");
        Ok(pair)
    }

    /// Compare `presented` against every stored hash on the blocking pool
    async fn scan(
        &self,
        users: Vec<User>,
        presented: &str,
    ) -> Result<Option<(String, StoredSession)>, AuthError> {
        const OP: &str = "refresh";

        let hasher = self.hasher;
        let candidate = presented.to_owned();
        let deadline = Instant::now() + self.scan_timeout;
        // dropping the request raises the flag and stops the blocking loop
        let cancel = CancelOnDrop::default();
        let cancelled = cancel.flag();

        let outcome = tokio::task::spawn_blocking(move || {
            find_session(hasher, users, &candidate, deadline, &cancelled)
        })
        .await
        .map_err(|e| internal(OP, None, e))?;

        match outcome {
            ScanOutcome::Matched(guid, session) => Ok(Some((guid, session))),
            ScanOutcome::NoMatch => Ok(None),
            ScanOutcome::Stopped { compared } => {
                tracing::error!(
                    operation = OP,
                    compared = compared,
                    timeout_ms = self.scan_timeout.as_millis() as u64,
                    "Refresh token scan exceeded its budget"
                );
                Err(AuthError::Internal)
            }
        }
    }

    /// Issue a new pair and swap it in, provided the stored hash is still
    /// `expected_hash`
    async fn commit_rotation(
        &self,
        guid: &str,
        expected_hash: &[u8],
    ) -> Result<TokenPair, AuthError> {
        const OP: &str = "refresh";

        let (pair, session) = self.create_session(OP, guid).await?;

        self.repository
            .replace_session(guid, expected_hash, session)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => {
                    tracing::warn!(guid = guid, "User removed during refresh");
                    AuthError::UserNotFound
                }
                RepositoryError::Conflict(_) => {
                    tracing::warn!(guid = guid, "Refresh token already rotated by a concurrent request");
                    AuthError::InvalidCredentials
                }
                other => internal(OP, Some(guid), other),
            })?;

        Ok(pair)
    }

    /// Issue a token pair for `guid` and hash its refresh token for storage
    async fn create_session(
        &self,
        op: &'static str,
        guid: &str,
    ) -> Result<(TokenPair, StoredSession), AuthError> {
        let pair = self
            .tokens
            .issue_pair(guid)
            .map_err(|e| internal(op, Some(guid), e))?;

        let hasher = self.hasher;
        let secret = pair.refresh_token.clone();
        let refresh_token_hash = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| internal(op, Some(guid), e))?
            .map_err(|e| internal(op, Some(guid), e))?;

        let session = StoredSession {
            refresh_token_hash,
            expires_at: Utc::now() + self.refresh_token_ttl,
        };
        Ok((pair, session))
    }

    async fn with_deadline<T, F>(&self, op: &'static str, operation: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation = op,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Operation deadline exceeded"
                );
                Err(AuthError::Internal)
            }
        }
    }
}

#[derive(Debug)]
enum ScanOutcome {
    Matched(String, StoredSession),
    NoMatch,
    /// Budget spent or caller gone before every session was compared
    Stopped { compared: usize },
}

/// First user whose stored hash verifies against `candidate`.
///
/// Checks `deadline` and `cancelled` before each compare.
fn find_session(
    hasher: CredentialHasher,
    users: Vec<User>,
    candidate: &str,
    deadline: Instant,
    cancelled: &AtomicBool,
) -> ScanOutcome {
    let mut compared = 0;
    for user in users {
        let Some(session) = user.session else {
            continue;
        };
        if cancelled.load(Ordering::Relaxed) || Instant::now() >= deadline {
            return ScanOutcome::Stopped { compared };
        }
        compared += 1;
        if hasher.compare(&session.refresh_token_hash, candidate) {
            return ScanOutcome::Matched(user.guid, session);
        }
    }
    ScanOutcome::NoMatch
}

/// Raises its flag when dropped
#[derive(Default)]
struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Log the underlying failure and collapse it to the opaque `Internal`
fn internal(op: &'static str, guid: Option<&str>, err: impl fmt::Display) -> AuthError {
    tracing::error!(
        operation = op,
        guid = guid.unwrap_or("-"),
        error = %err,
        "Session operation failed"
    );
    AuthError::Internal
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(4)
    }

    fn user_with_token(guid: &str, token: &str) -> User {
        User {
            guid: guid.to_string(),
            session: Some(StoredSession {
                refresh_token_hash: hasher().hash(token).expect("hash"),
                expires_at: Utc::now() + ChronoDuration::hours(1),
            }),
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn scan(users: Vec<User>, candidate: &str) -> ScanOutcome {
        find_session(hasher(), users, candidate, far_deadline(), &AtomicBool::new(false))
    }

    #[test]
    fn test_find_session_skips_bare_records() {
        let users = vec![User::new("a"), user_with_token("b", "token-b")];

        match scan(users, "token-b") {
            ScanOutcome::Matched(guid, _) => assert_eq!(guid, "b"),
            other => panic!("Expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_find_session_no_match() {
        let users = vec![user_with_token("a", "token-a"), user_with_token("b", "token-b")];

        assert!(matches!(scan(users, "token-c"), ScanOutcome::NoMatch));
    }

    #[test]
    fn test_find_session_empty_store() {
        assert!(matches!(scan(Vec::new(), "token"), ScanOutcome::NoMatch));
    }

    #[test]
    fn test_find_session_stops_at_deadline() {
        let users = vec![user_with_token("a", "token-a"), user_with_token("b", "token-b")];

        let outcome = find_session(
            hasher(),
            users,
            "token-b",
            Instant::now(),
            &AtomicBool::new(false),
        );

        assert!(matches!(outcome, ScanOutcome::Stopped { compared: 0 }));
    }

    #[test]
    fn test_find_session_stops_when_cancelled() {
        let users = vec![user_with_token("a", "token-a")];
        let cancel = CancelOnDrop::default();
        let flag = cancel.flag();
        drop(cancel);

        let outcome = find_session(hasher(), users, "token-a", far_deadline(), &flag);

        assert!(matches!(outcome, ScanOutcome::Stopped { compared: 0 }));
    }

    #[test]
    fn test_bare_records_do_not_hit_deadline() {
        let users = vec![User::new("a"), User::new("b")];

        let outcome = find_session(
            hasher(),
            users,
            "token",
            Instant::now(),
            &AtomicBool::new(false),
        );

        assert!(matches!(outcome, ScanOutcome::NoMatch));
    }
}
