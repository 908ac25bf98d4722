//! 兑换券过期清理 Worker
//!
//! 定期调用全局清理，把超过有效期仍为 pending 的兑换券标记为 expired。
//!
//! 单批使用 `FOR UPDATE SKIP LOCKED`，多实例部署时不会重复处理。
//! Worker 只缩短状态滞后；签发、查询和核销都会自行判断过期。

use std::sync::Arc;
use std::time::Duration;

use sykle_shared::config::ExpiryWorkerConfig;
use sykle_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::service::ExpirySweeper;

pub struct ExpireWorker {
    sweeper: Arc<ExpirySweeper>,
    /// 轮询间隔
    poll_interval: Duration,
    /// 每批处理的最大记录数
    batch_size: i64,
}

impl ExpireWorker {
    /// `batch_size` 小于 1 时按 1 处理
    pub fn new(sweeper: Arc<ExpirySweeper>, poll_interval_secs: u64, batch_size: i64) -> Self {
        if batch_size < 1 {
            warn!(batch_size, "expiry_worker.batch_size 无效，按 1 处理");
        }
        Self {
            sweeper,
            poll_interval: Duration::from_secs(poll_interval_secs),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(sweeper: Arc<ExpirySweeper>, config: &ExpiryWorkerConfig) -> Self {
        Self::new(sweeper, config.poll_interval_seconds, config.batch_size)
    }

    /// 执行一轮清理
    ///
    /// 单批处理满时继续下一批，直到没有积压
    pub async fn run_once(&self) -> u64 {
        let mut total = 0u64;
        loop {
            match self.sweeper.sweep_all(self.batch_size).await {
                Ok(expired) => {
                    total += expired;
                    if expired == 0 || (expired as i64) < self.batch_size {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "清理过期兑换券出错");
                    break;
                }
            }
        }

        metrics::set_worker_last_run("expire_worker");
        total
    }

    /// 主循环：收到关闭信号后退出
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.batch_size,
            "ExpireWorker 已启动"
        );

        loop {
            self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("ExpireWorker 已停止");
    }
}
