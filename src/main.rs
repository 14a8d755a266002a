use guid_auth::auth::{SessionService, TokenManager};
use guid_auth::configuration::get_configuration;
use guid_auth::repository::PgUserRepository;
use guid_auth::startup::run;
use guid_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 설정 로드
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    // 구조화된 로깅 초기화
    init_telemetry(configuration.application.environment);
    tracing::info!(
        environment = ?configuration.application.environment,
        "Starting session service"
    );

    // 데이터베이스 연결 풀 생성
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .acquire_timeout(Duration::from_secs(configuration.auth.operation_timeout))
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    let repository = PgUserRepository::new(pool);
    repository.migrate().await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    let tokens = TokenManager::new(&configuration.auth).map_err(|e| {
        tracing::error!("Failed to init token manager: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Token manager error")
    })?;

    let service = SessionService::new(
        Arc::new(repository),
        Arc::new(tokens),
        &configuration.auth,
    );

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    // 서버 실행 (SIGINT/SIGTERM 시 graceful shutdown)
    let server = run(listener, service, &configuration.application)?;
    server.await?;

    tracing::info!("Server stopped");
    Ok(())
}
