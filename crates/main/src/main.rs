//! 主应用程序入口
//!
//! 加载配置、连接基础设施，然后启动 Axum Web API 与 WebSocket 服务。

use std::sync::Arc;

use application::{
    IntakePolicy, IntakeServiceDependencies, ModerationServiceDependencies,
    QueryServiceDependencies, QuestionIntakeService, QuestionModerationService,
    QuestionQueryService, SystemClock,
};
use config::AppConfig;
use infrastructure::{Infrastructure, InfrastructureConfig};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        database = %config.database.url.rsplit('@').next().unwrap_or("unknown"),
        rate_limit = config.intake.rate_limit_count,
        window_seconds = config.intake.rate_limit_window_seconds,
        "configuration loaded"
    );

    let mut infra = Infrastructure::connect(InfrastructureConfig::from(&config)).await?;
    let policy = IntakePolicy::from(&config.intake);

    let intake_service = QuestionIntakeService::new(IntakeServiceDependencies {
        session_repository: infra.storage.session_repository.clone(),
        question_repository: infra.storage.question_repository.clone(),
        counter_store: infra.counter_store_trait(),
        transport: infra.transport.clone(),
        clock: Arc::new(SystemClock),
        policy,
    });

    let query_service = QuestionQueryService::new(QueryServiceDependencies {
        session_repository: infra.storage.session_repository.clone(),
        question_repository: infra.storage.question_repository.clone(),
        call_timeout: policy.call_timeout,
    });

    let moderation_service = QuestionModerationService::new(ModerationServiceDependencies {
        question_repository: infra.storage.question_repository.clone(),
        transport: infra.transport.clone(),
        call_timeout: policy.call_timeout,
    });

    let state = AppState::new(
        Arc::new(intake_service),
        Arc::new(query_service),
        Arc::new(moderation_service),
        infra.local_transport.clone(),
        Arc::new(JwtService::new(config.jwt.clone())),
    );

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("课堂提问服务启动在 http://{}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("收到退出信号，停止接收新连接");
        })
        .await?;

    infra.shutdown();
    Ok(())
}
