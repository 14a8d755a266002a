use actix_web::dev::Server;
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::error::JsonPayloadError;
use actix_web::{web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::time::Duration;

use crate::auth::SessionService;
use crate::configuration::ApplicationSettings;
use crate::error::{AppError, ValidationError};
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{current_session, health_check, refresh, sign_in, sign_up};

pub fn run(
    listener: TcpListener,
    service: SessionService,
    settings: &ApplicationSettings,
) -> Result<Server, std::io::Error> {
    let tokens = service.token_manager();
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        App::new()
            // `/auth/signin/` and `/auth/signin` reach the same handler
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .wrap(RequestLogger)
            .app_data(service.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(sign_up))
                    .route("/signin", web::post().to(sign_in))
                    .route("/refresh", web::post().to(refresh)),
            )
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(tokens.clone()))
                    .route("/me", web::get().to(current_session)),
            )
    })
    .client_request_timeout(Duration::from_secs(settings.request_timeout))
    .keep_alive(Duration::from_secs(settings.keep_alive))
    .shutdown_timeout(settings.shutdown_timeout)
    .listen(listener)?
    .run();

    Ok(server)
}

/// Malformed JSON bodies get the same error body as every other 400
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
}
