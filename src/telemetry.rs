use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::configuration::Environment;

/// Default filter when `RUST_LOG` is unset
pub fn default_level(environment: Environment) -> &'static str {
    match environment {
        Environment::Local | Environment::Dev => "debug",
        Environment::Prod => "info",
    }
}

/// 구조화된 로깅을 초기화합니다.
/// `local`은 사람이 읽기 쉬운 텍스트, `dev`/`prod`는 JSON 형식으로 stdout에 출력합니다.
/// RUST_LOG 환경 변수로 로그 레벨을 제어할 수 있습니다.
pub fn init_telemetry(environment: Environment) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(environment)));

    let (json_layer, text_layer) = match environment {
        Environment::Local => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stdout)),
        ),
        Environment::Dev | Environment::Prod => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stdout)
                    .json(),
            ),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
