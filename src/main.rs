//! satsvault 主入口

use std::sync::Arc;

use anyhow::{Context, Result};
use satsvault::{api, app_state::AppState, config::Config, infrastructure};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量与配置
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    // 2. 初始化日志；guard 持有到进程退出，文件日志才不会丢
    let _log_guard = infrastructure::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("🚀 Starting satsvault BTC address service");
    tracing::info!("Network: {}", config.bitcoin.network()?);

    // 3. 连接数据库
    let pool = infrastructure::db::init_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("✅ Database connected");

    // 4. 运行数据库迁移（生产环境可用 SKIP_MIGRATIONS=1 跳过）
    if std::env::var("SKIP_MIGRATIONS").is_err() {
        match sqlx::migrate!("./migrations").run(&pool).await {
            Ok(_) => tracing::info!("✅ Database migrations completed"),
            Err(e) => {
                tracing::warn!("⚠️ Database migrations failed (continuing): {}", e);
            }
        }
    } else {
        tracing::info!("⏭️ Database migrations skipped (SKIP_MIGRATIONS=1)");
    }

    // 5. 初始化应用状态与路由
    let bind_addr = config.server.bind_addr.clone();
    let state = Arc::new(AppState::new(pool, Arc::new(config))?);
    let app = api::router(state);

    // 6. 启动服务器
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("✅ Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
