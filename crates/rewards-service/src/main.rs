//! Sykle 骑行积分服务
//!
//! 提供骑行同步、积分账本、兑换券签发与商户核销的 REST API。

use std::sync::Arc;

use sykle_rewards::{
    AppState, Repositories, SystemClock,
    clock::Clock,
    repository::MemoryStore,
    routes,
    worker::ExpireWorker,
};
use sykle_shared::{
    config::{AppConfig, StorageBackend},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：default.toml -> {env}.toml -> {service}.toml -> 环境变量
    let (config, load_error) = AppConfig::load_or_default("sykle-rewards-service");

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    if let Some(e) = load_error {
        warn!(error = %e, "配置加载失败，使用默认配置");
    }

    info!(
        environment = %config.environment,
        backend = ?config.storage.backend,
        "Starting sykle-rewards-service on {}",
        config.server_addr()
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 存储后端
    let repos = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            if config.database.run_migrations {
                db.run_migrations().await?;
            }
            Repositories::postgres(db.pool().clone())
        }
        StorageBackend::Memory => {
            warn!("使用内存存储，进程退出后数据丢失");
            Repositories::memory(Arc::new(MemoryStore::new()))
        }
    };

    if config.storage.seed_sample_data {
        let inserted = repos.catalog.seed_sample_data(clock.now()).await?;
        if inserted > 0 {
            info!(inserted, "已写入示例商户与奖励");
        }
    }

    let state = AppState::new(repos, clock, &config.redemption);

    // 关闭信号同时通知后台 Worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.expiry_worker.enabled {
        let worker = ExpireWorker::from_config(state.sweeper.clone(), &config.expiry_worker);
        Some(tokio::spawn(async move { worker.run(shutdown_rx).await }))
    } else {
        info!("ExpireWorker 已禁用，过期状态仅在查询与核销时更新");
        None
    };

    let app = routes::app(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时，停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "ExpireWorker 退出异常");
        }
    }

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 容器停止时发送 SIGTERM；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
