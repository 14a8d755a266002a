/// Token Manager
///
/// Issues the two halves of a session:
/// - access tokens: HS256-signed JWTs binding the user's GUID, short-lived
/// - refresh tokens: 64 random alphanumeric characters from an OS-seeded CSPRNG
///
/// Refresh tokens are never persisted by this module; the session engine
/// stores only their hash together with the expiry checked here.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::auth::claims::Claims;
use crate::configuration::AuthSettings;
use crate::error::TokenError;

/// 64 base62 characters, roughly 381 bits of entropy, under bcrypt's 72-byte input limit
pub const REFRESH_TOKEN_LENGTH: usize = 64;

const MIN_SIGNING_KEY_LENGTH: usize = 32;

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies access tokens, mints refresh tokens
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_ttl: Duration,
}

impl TokenManager {
    /// Build a manager from the configured signing key
    ///
    /// # Errors
    /// `TokenError::Signing` if the key is empty
    pub fn new(settings: &AuthSettings) -> Result<Self, TokenError> {
        let key = settings.signing_key.as_bytes();
        if key.is_empty() {
            return Err(TokenError::Signing("signing key is empty".to_string()));
        }
        if key.len() < MIN_SIGNING_KEY_LENGTH {
            tracing::warn!(
                key_length = key.len(),
                "Signing key is shorter than {} bytes",
                MIN_SIGNING_KEY_LENGTH
            );
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            issuer: settings.issuer.clone(),
            access_token_ttl: settings.access_token_ttl(),
        })
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    /// Sign an access token for `guid` expiring `ttl` from now
    ///
    /// # Errors
    /// `TokenError::Signing` if encoding fails
    pub fn issue_access_token(&self, guid: &str, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims::new(guid, ttl, &self.issuer);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Generate a new opaque refresh token
    ///
    /// # Errors
    /// `TokenError::EntropySource` if the OS random source cannot seed the generator
    pub fn issue_refresh_token(&self) -> Result<String, TokenError> {
        let rng = StdRng::from_rng(OsRng).map_err(|e| TokenError::EntropySource(e.to_string()))?;

        Ok(rng
            .sample_iter(&Alphanumeric)
            .take(REFRESH_TOKEN_LENGTH)
            .map(char::from)
            .collect())
    }

    /// Issue a fresh access/refresh pair using the configured access TTL
    pub fn issue_pair(&self, guid: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(guid, self.access_token_ttl)?,
            refresh_token: self.issue_refresh_token()?,
        })
    }

    /// # Errors
    /// `TokenError::ExpiredCredential` if `expires_at` is at or before now
    pub fn validate_refresh_expiry(&self, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        if expires_at <= Utc::now() {
            return Err(TokenError::ExpiredCredential);
        }
        Ok(())
    }

    /// Verify signature, expiry and issuer together and return the claims
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation error: {}", e);
                TokenError::InvalidAccessToken
            })
    }
}
