//! PostgreSQL 连接池
//!
//! 积分账本以 PostgreSQL 为唯一事实来源。服务启动时建立连接池并执行 migrations/。

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::{InfraError, Result};
use crate::retry::{RetryPolicy, retry_with_policy};

/// 启动时连接数据库的重试次数（数据库容器可能晚于服务就绪）
const CONNECT_RETRIES: u32 = 5;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// 按配置构建连接池参数
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

impl Database {
    /// 建立连接池，连接被拒绝或超时会按退避重试
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let policy = RetryPolicy {
            max_retries: CONNECT_RETRIES,
            ..RetryPolicy::default()
        };

        let pool = retry_with_policy(
            &policy,
            "database_connect",
            InfraError::is_retryable,
            || async move {
                pool_options(config)
                    .connect(&config.url)
                    .await
                    .map_err(InfraError::from)
            },
        )
        .await?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行工作区根目录 migrations/ 下的迁移脚本
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}
