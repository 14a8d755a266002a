/// Session Routes
///
/// Create an account, start a session, rotate a session, and inspect the
/// current access token.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{Claims, SessionService, TokenPair};
use crate::error::{AppError, ErrorContext};
use crate::validators::{is_valid_guid, is_valid_refresh_token};

/// Sign-up and sign-in request
#[derive(Deserialize)]
pub struct GuidRequest {
    pub guid: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize)]
pub struct SignUpResponse {
    pub is_success: bool,
}

/// Token pair response
#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn bearer(pair: TokenPair, service: &SessionService) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: service.token_manager().access_token_ttl().num_seconds(),
        }
    }
}

/// Current session response
#[derive(Serialize, Deserialize)]
pub struct SessionInfoResponse {
    pub guid: String,
    pub expires_at: Option<String>,
}

/// POST /auth/signup
///
/// Register a caller-supplied GUID with no session.
///
/// # Errors
/// - 400: GUID missing or malformed
/// - 409: GUID already registered
/// - 500: Internal server error
pub async fn sign_up(
    form: web::Json<GuidRequest>,
    service: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let guid = is_valid_guid(&form.guid)?;
    let context = ErrorContext::new("sign_up").with_guid(guid.as_str());

    service.sign_up(&guid).await.map_err(|e| {
        let error = AppError::from(e);
        context.log_error(&error);
        error
    })?;

    Ok(HttpResponse::Created().json(SignUpResponse { is_success: true }))
}

/// POST /auth/signin
///
/// Start a session for a registered GUID. Any previous session for the same
/// user stops working.
///
/// # Errors
/// - 400: GUID missing or malformed
/// - 404: GUID not registered
/// - 500: Internal server error
pub async fn sign_in(
    form: web::Json<GuidRequest>,
    service: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let guid = is_valid_guid(&form.guid)?;
    let context = ErrorContext::new("sign_in").with_guid(guid.as_str());

    let pair = service.sign_in(&guid).await.map_err(|e| {
        let error = AppError::from(e);
        context.log_error(&error);
        error
    })?;

    Ok(HttpResponse::Ok().json(AuthResponse::bearer(pair, &service)))
}

/// POST /auth/refresh
///
/// Exchange a refresh token for a new pair. The presented token is consumed.
///
/// # Errors
/// - 400: token missing or malformed
/// - 401: unknown, expired, or already-used token
/// - 404: owning user vanished during rotation
/// - 500: Internal server error
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    service: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let token = is_valid_refresh_token(&form.refresh_token)?;
    let context = ErrorContext::new("refresh");

    let pair = service.refresh(token).await.map_err(|e| {
        let error = AppError::from(e);
        context.log_error(&error);
        error
    })?;

    Ok(HttpResponse::Ok().json(AuthResponse::bearer(pair, &service)))
}

/// GET /api/me
///
/// **Requires valid access token**; claims are injected by `JwtMiddleware`.
pub async fn current_session(claims: web::ReqData<Claims>) -> HttpResponse {
    HttpResponse::Ok().json(SessionInfoResponse {
        guid: claims.guid().to_string(),
        expires_at: claims.expires_at().map(|t| t.to_rfc3339()),
    })
}
