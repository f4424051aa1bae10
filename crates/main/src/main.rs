//! 主应用程序入口
//!
//! 组装消息代理并启动 Axum Web API 服务。

use std::sync::Arc;
use std::time::Duration;

use application::{
    AdmissionController, ModerationFanout, PublishPipeline, SessionRegistry, SystemClock,
};
use config::AppConfig;
use infrastructure::{create_pg_pool, PgMessageStore, PgUserDirectory};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 生产环境必须显式提供密钥和数据库地址；宽松的默认值只给本地开发用
    let config = if matches!(std::env::var("APP_ENV").as_deref(), Ok("production")) {
        AppConfig::from_env()
    } else {
        AppConfig::from_env_with_defaults()
    };
    let io_timeout = Duration::from_millis(config.broker.io_timeout_ms);

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );
    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    let directory = Arc::new(PgUserDirectory::new(pg_pool.clone()));
    let store = Arc::new(PgMessageStore::new(pg_pool));
    let registry = Arc::new(SessionRegistry::new());
    let clock = Arc::new(SystemClock);
    let jwt = Arc::new(JwtService::new(config.jwt.clone()));

    let admission = Arc::new(AdmissionController::new(
        jwt.clone(),
        directory.clone(),
        registry.clone(),
        clock.clone(),
        io_timeout,
    ));
    let publisher = Arc::new(PublishPipeline::new(
        directory.clone(),
        store.clone(),
        registry.clone(),
        clock,
        io_timeout,
    ));
    let moderation = Arc::new(ModerationFanout::new(
        directory.clone(),
        store.clone(),
        registry.clone(),
        publisher.clone(),
        io_timeout,
    ));

    let state = AppState {
        admission,
        publisher,
        moderation,
        registry,
        store,
        directory,
        jwt,
    };

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("消息代理服务启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
