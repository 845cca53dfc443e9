//! SQLx Postgres 连接池初始化与健康检查
//!
//! 用法：
//! let pool = init_pool(&config.database).await?;
//! health_check(&pool).await?;

use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;

pub type PgPool = sqlx::Pool<sqlx::Postgres>;

/// 初始化连接池
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
}

/// 数据库健康检查
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
