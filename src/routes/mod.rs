mod auth;
mod health_check;

pub use auth::{
    current_session, refresh, sign_in, sign_up, AuthResponse, GuidRequest, RefreshRequest,
    SessionInfoResponse, SignUpResponse,
};
pub use health_check::health_check;
