//! 积分账本查询
//!
//! 可用积分 = 累计获得积分 − pending 与 completed 兑换券的 points_spent。
//! 查询前先清理该用户的过期兑换券，让已失效的预留尽快释放。

use std::sync::Arc;

use tracing::instrument;

use super::dto::BalanceDto;
use super::expiry_sweeper::ExpirySweeper;
use crate::error::{Result, RewardsError};
use crate::models::BalanceSnapshot;
use crate::repository::LedgerRepositoryTrait;

pub struct LedgerService {
    ledger: Arc<dyn LedgerRepositoryTrait>,
    sweeper: Arc<ExpirySweeper>,
}

impl LedgerService {
    pub fn new(ledger: Arc<dyn LedgerRepositoryTrait>, sweeper: Arc<ExpirySweeper>) -> Self {
        Self { ledger, sweeper }
    }

    /// 余额快照，用户不存在返回 `UserNotFound`
    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: &str) -> Result<BalanceSnapshot> {
        self.sweeper.sweep_user(user_id).await?;

        self.ledger
            .balance_snapshot(user_id)
            .await?
            .ok_or_else(|| RewardsError::UserNotFound(user_id.to_string()))
    }

    /// 可用积分
    pub async fn available_balance(&self, user_id: &str) -> Result<i64> {
        Ok(self.balance(user_id).await?.available())
    }

    pub async fn balance_view(&self, user_id: &str) -> Result<BalanceDto> {
        let snapshot = self.balance(user_id).await?;
        Ok(BalanceDto {
            total_earned: snapshot.total_earned,
            reserved: snapshot.reserved,
            available: snapshot.available(),
        })
    }
}
