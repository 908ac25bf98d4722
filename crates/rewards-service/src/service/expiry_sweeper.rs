//! 过期清理
//!
//! 把已过期的 pending 兑换券标记为 expired。只是缩短状态滞后，
//! 核销路径会独立判断过期，正确性不依赖清理时机。

use std::sync::Arc;

use sykle_shared::observability::metrics;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::error::Result;
use crate::repository::LedgerRepositoryTrait;

pub struct ExpirySweeper {
    ledger: Arc<dyn LedgerRepositoryTrait>,
    clock: Arc<dyn Clock>,
}

impl ExpirySweeper {
    pub fn new(ledger: Arc<dyn LedgerRepositoryTrait>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// 清理单个用户的过期兑换券
    #[instrument(skip(self))]
    pub async fn sweep_user(&self, user_id: &str) -> Result<u64> {
        let now = self.clock.now();
        let expired = self.ledger.expire_stale_for_user(user_id, now).await?;

        if expired > 0 {
            metrics::record_vouchers_expired("sweep_user", expired);
            debug!(user_id = %user_id, expired, "已标记过期兑换券");
        }

        Ok(expired)
    }

    /// 全局清理，单次最多 `batch_size` 条
    #[instrument(skip(self))]
    pub async fn sweep_all(&self, batch_size: i64) -> Result<u64> {
        let now = self.clock.now();
        let expired = self.ledger.expire_stale(now, batch_size).await?;

        if expired > 0 {
            metrics::record_vouchers_expired("worker", expired);
            info!(expired, "后台清理过期兑换券");
        }

        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::repository::MockLedgerRepositoryTrait;
    use chrono::Utc;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_sweep_user_uses_injected_clock() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));

        let mut ledger = MockLedgerRepositoryTrait::new();
        ledger
            .expect_expire_stale_for_user()
            .with(eq("u-1"), eq(now))
            .times(1)
            .returning(|_, _| Ok(2));

        let sweeper = ExpirySweeper::new(Arc::new(ledger), clock);
        assert_eq!(sweeper.sweep_user("u-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sweep_all_passes_batch_size() {
        let mut ledger = MockLedgerRepositoryTrait::new();
        ledger
            .expect_expire_stale()
            .with(always(), eq(500))
            .times(1)
            .returning(|_, _| Ok(0));

        let sweeper = ExpirySweeper::new(Arc::new(ledger), Arc::new(ManualClock::default()));
        assert_eq!(sweeper.sweep_all(500).await.unwrap(), 0);
    }
}
