/// Error Handling Module
///
/// Every failure in the service maps onto one of these types:
/// 1. Collaborator errors (repository, token manager, hasher, configuration)
/// 2. The caller-facing session taxonomy (`AuthError`)
/// 3. The unified HTTP error (`AppError`) with structured JSON responses
/// 4. Error context enrichment for logging
///
/// Collaborator errors never cross the session engine boundary; the engine
/// translates them into `AuthError` and logs the detail where it does so.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::middleware::current_request_id;

/// Id of the request being served, or a fresh one outside a request
fn current_or_new_request_id() -> String {
    current_request_id().unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// ============================================================================
/// 1. COLLABORATOR ERROR TYPES
/// ============================================================================

/// Input validation errors raised at the HTTP boundary
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooLong(String, usize),
    InvalidFormat(String),
    /// Body missing, not JSON, or missing required fields
    MalformedBody(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::MalformedBody(reason) => write!(f, "Malformed request body: {}", reason),
        }
    }
}

impl StdError for ValidationError {}

/// User repository errors
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// A record with this GUID already exists
    Duplicate(String),
    /// No record with this GUID exists
    NotFound(String),
    /// A conditional write found a different stored hash than expected
    Conflict(String),
    /// Any other storage failure
    Unexpected(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::Duplicate(guid) => write!(f, "Duplicate user: {}", guid),
            RepositoryError::NotFound(guid) => write!(f, "User not found: {}", guid),
            RepositoryError::Conflict(guid) => {
                write!(f, "Stored session changed concurrently: {}", guid)
            }
            RepositoryError::Unexpected(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl StdError for RepositoryError {}

/// Token manager errors
#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    /// The signing key is unusable or encoding failed
    Signing(String),
    /// Randomness could not be sourced from the operating system
    EntropySource(String),
    /// The stored refresh expiry is at or before the current time
    ExpiredCredential,
    /// Access token signature, expiry or issuer did not verify
    InvalidAccessToken,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Signing(msg) => write!(f, "Token signing failed: {}", msg),
            TokenError::EntropySource(msg) => write!(f, "Entropy source unavailable: {}", msg),
            TokenError::ExpiredCredential => write!(f, "Credential has expired"),
            TokenError::InvalidAccessToken => write!(f, "Invalid or expired access token"),
        }
    }
}

impl StdError for TokenError {}

/// Credential hasher errors
#[derive(Debug, Clone, PartialEq)]
pub enum HashError {
    Hashing(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashError::Hashing(msg) => write!(f, "Credential hashing failed: {}", msg),
        }
    }
}

impl StdError for HashError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// ============================================================================
/// 2. SESSION TAXONOMY
/// ============================================================================

/// Errors returned by the session engine.
///
/// `Internal` is deliberately opaque: the underlying cause is logged where it
/// is translated and never handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    UserAlreadyExists,
    UserNotFound,
    InvalidCredentials,
    Internal,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::UserAlreadyExists => write!(f, "User already exists"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::Internal => write!(f, "Internal error"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 3. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Error type returned by HTTP handlers
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Token(TokenError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Token(e) => write!(f, "{}", e),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Token(err)
    }
}

// ============================================================================
// HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Auth(e) => match e {
                AuthError::UserAlreadyExists => (StatusCode::CONFLICT, "USER_ALREADY_EXISTS"),
                AuthError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
                }
                AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            AppError::Token(_) => (StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code) = self.status_and_code();
        let message = match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::Token(_) => "Invalid or expired token".to_string(),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::Internal) => {
                // detail was logged by the session engine
                tracing::error!(request_id = request_id, "Internal error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Session request rejected");
            }
            AppError::Token(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Access token rejected");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = current_or_new_request_id();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context attached to log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub guid: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: current_or_new_request_id(),
            guid: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "guid": self.guid,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Auth(AuthError::Internal) => {
                tracing::error!(error = %error, context = ?context, "Operation failed");
            }
            _ => {
                tracing::warn!(error = %error, context = ?context, "Operation rejected");
            }
        }
    }
}
