/// Input validators for the HTTP boundary
///
/// - GUIDs must be in canonical hyphenated form (8-4-4-4-12 hex digits)
/// - Refresh tokens must look like tokens this service issues: non-empty,
///   ASCII alphanumeric, bounded in length

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::REFRESH_TOKEN_LENGTH;
use crate::error::ValidationError;

const GUID_LENGTH: usize = 36;
// bcrypt only reads the first 72 bytes of its input
const MAX_REFRESH_TOKEN_LENGTH: usize = 72;

lazy_static! {
    static ref GUID_REGEX: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    )
    .expect("GUID pattern compiles");
}

/// Validates a user GUID, returning it trimmed
pub fn is_valid_guid(guid: &str) -> Result<String, ValidationError> {
    let trimmed = guid.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("guid".to_string()));
    }

    if trimmed.len() > GUID_LENGTH {
        return Err(ValidationError::TooLong("guid".to_string(), GUID_LENGTH));
    }

    if !GUID_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("guid".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a presented refresh token
pub fn is_valid_refresh_token(token: &str) -> Result<&str, ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token".to_string()));
    }

    if token.len() > MAX_REFRESH_TOKEN_LENGTH {
        return Err(ValidationError::TooLong(
            "refresh_token".to_string(),
            MAX_REFRESH_TOKEN_LENGTH,
        ));
    }

    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat("refresh_token".to_string()));
    }

    Ok(token)
}

const _: () = assert!(REFRESH_TOKEN_LENGTH <= MAX_REFRESH_TOKEN_LENGTH);
