/// JWT Authentication Middleware
///
/// Validates access tokens from the Authorization header and injects
/// claims into request extensions for use by route handlers.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::TokenManager;
use crate::error::{AppError, TokenError};

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    tokens: Arc<TokenManager>,
}

impl JwtMiddleware {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            tokens: Arc::clone(&self.tokens),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    tokens: Arc<TokenManager>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        // rejections render here, inside the request scope
        let Some(token) = bearer else {
            tracing::warn!("Missing or invalid Authorization header");
            let response = req.error_response(AppError::Token(TokenError::InvalidAccessToken));
            return Box::pin(async move { Ok(response.map_into_right_body()) });
        };

        match self.tokens.verify_access_token(&token) {
            Ok(claims) => {
                tracing::debug!(guid = %claims.sub, "Access token verified");
                req.extensions_mut().insert(claims);

                let service = Rc::clone(&self.service);
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(e) => {
                let response = req.error_response(AppError::Token(e));
                Box::pin(async move { Ok(response.map_into_right_body()) })
            }
        }
    }
}
