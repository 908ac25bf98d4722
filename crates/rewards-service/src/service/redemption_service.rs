//! 兑换券签发服务
//!
//! 处理积分兑换的核心业务逻辑，包括：
//! - 用户与奖励有效性检查
//! - 原子地检查可用积分并预留
//! - 生成不可预测的兑换码
//! - 查询兑换历史（查询前清理过期券）
//!
//! ## 签发流程
//!
//! 1. 参数校验 -> 2. 用户存在 -> 3. 奖励与商户启用 -> 4. 生成兑换码与过期时间
//!    -> 5. 仓储内原子预留 -> 6. 返回兑换券与剩余积分

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use rand::Rng;
use sykle_shared::config::RedemptionConfig;
use sykle_shared::observability::metrics;
use sykle_shared::retry::{RetryPolicy, retry_with_policy};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::IssuedVoucher;
use super::expiry_sweeper::ExpirySweeper;
use crate::clock::Clock;
use crate::error::{Result, RewardsError};
use crate::models::{NewRedemption, RedemptionStatus, RedemptionView, ReserveOutcome};
use crate::repository::{CatalogRepositoryTrait, LedgerRepositoryTrait, UserRepositoryTrait};

/// 兑换码字符集（去掉易混淆的 0/O、1/I）
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// 兑换码随机部分长度，32^12 = 2^60 种组合
const CODE_RANDOM_LEN: usize = 12;

/// 生成兑换码，格式 `{prefix}-XXXXXXXXXXXX`
///
/// 使用线程本地 CSPRNG，兑换码不可由用户提交也不可预测
pub fn generate_voucher_code(prefix: &str) -> String {
    let mut rng = rand::rng();
    let random: String = (0..CODE_RANDOM_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", prefix, random)
}

/// 兑换券签发服务
pub struct RedemptionService {
    users: Arc<dyn UserRepositoryTrait>,
    catalog: Arc<dyn CatalogRepositoryTrait>,
    ledger: Arc<dyn LedgerRepositoryTrait>,
    sweeper: Arc<ExpirySweeper>,
    clock: Arc<dyn Clock>,
    config: RedemptionConfig,
    retry_policy: RetryPolicy,
}

impl RedemptionService {
    pub fn new(
        users: Arc<dyn UserRepositoryTrait>,
        catalog: Arc<dyn CatalogRepositoryTrait>,
        ledger: Arc<dyn LedgerRepositoryTrait>,
        sweeper: Arc<ExpirySweeper>,
        clock: Arc<dyn Clock>,
        config: RedemptionConfig,
    ) -> Self {
        let retry_policy =
            RetryPolicy::conflict(config.max_conflict_retries, config.retry_initial_delay_ms);
        Self {
            users,
            catalog,
            ledger,
            sweeper,
            clock,
            config,
            retry_policy,
        }
    }

    /// 签发兑换券
    ///
    /// 可用积分检查与写入在仓储内原子完成，同一用户的并发签发不会透支。
    /// 兑换码碰撞或并发冲突时整体重试，次数由配置决定。
    #[instrument(skip(self), fields(user_id = %user_id, reward_id = %reward_id))]
    pub async fn issue_redemption(&self, user_id: &str, reward_id: &str) -> Result<IssuedVoucher> {
        let start = Instant::now();

        // 1. 参数校验
        let user_id = user_id.trim();
        let reward_id = reward_id.trim();
        if user_id.is_empty() || reward_id.is_empty() {
            return Err(RewardsError::Validation(
                "userId 和 rewardId 不能为空".to_string(),
            ));
        }

        // 2. 用户存在
        if self.users.get_user(user_id).await?.is_none() {
            metrics::record_voucher_rejected("user_not_found");
            return Err(RewardsError::UserNotFound(user_id.to_string()));
        }

        // 3. 奖励与所属商户均需启用
        let reward = match self.catalog.get_reward(reward_id).await? {
            Some(reward) if reward.is_redeemable() => reward,
            _ => {
                metrics::record_voucher_rejected("reward_not_found");
                return Err(RewardsError::RewardNotFound(reward_id.to_string()));
            }
        };
        let cost = reward.reward.points_cost;

        // 4-5. 生成兑换码并原子预留
        let outcome = retry_with_policy(
            &self.retry_policy,
            "issue_redemption",
            RewardsError::is_retryable,
            || {
                let now = self.clock.now();
                let voucher = NewRedemption {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    reward_id: reward.reward.id.clone(),
                    partner_id: reward.reward.partner_id.clone(),
                    points_spent: cost,
                    code: generate_voucher_code(&self.config.code_prefix),
                    expires_at: now + Duration::minutes(self.config.voucher_ttl_minutes),
                    created_at: now,
                };
                async move { self.ledger.reserve_voucher(&voucher, now).await }
            },
        )
        .await?;

        match outcome {
            ReserveOutcome::Reserved {
                redemption,
                balance,
            } => {
                metrics::record_voucher_issued(start.elapsed().as_secs_f64());
                info!(
                    user_id = %user_id,
                    reward_id = %reward_id,
                    redemption_id = %redemption.id,
                    points_spent = cost,
                    remaining = balance.available(),
                    "兑换券签发成功"
                );
                Ok(IssuedVoucher::new(redemption, &reward, balance.available()))
            }
            ReserveOutcome::Insufficient { balance } => {
                metrics::record_voucher_rejected("insufficient_points");
                warn!(
                    user_id = %user_id,
                    required = cost,
                    available = balance.available(),
                    "可用积分不足"
                );
                Err(RewardsError::InsufficientPoints {
                    required: cost,
                    available: balance.available(),
                })
            }
        }
    }

    /// 查询兑换历史
    ///
    /// 先清理该用户的过期券，返回的状态即为当前状态；最新在前
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_redemptions(
        &self,
        user_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<RedemptionView>> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(RewardsError::UserNotFound(user_id.to_string()));
        }

        self.sweeper.sweep_user(user_id).await?;

        self.ledger.list_vouchers(user_id, status).await
    }
}
