/// JWT Claims structure
///
/// Payload of an access token: the user's GUID as subject plus the
/// standard time and issuer claims (RFC 7519).

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (user GUID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create claims for `guid` expiring `ttl` from now
    pub fn new(guid: &str, ttl: Duration, issuer: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: guid.to_string(),
            exp: now + ttl.num_seconds(),
            iat: now,
            iss: issuer.to_string(),
        }
    }

    pub fn guid(&self) -> &str {
        &self.sub
    }

    /// Expiry as a timestamp, `None` if `exp` is out of range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}
