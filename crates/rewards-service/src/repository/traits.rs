//! 仓储 Trait 定义
//!
//! 服务层依赖这些抽象而非具体实现。PostgreSQL 与内存实现必须保持相同语义，
//! 尤其是 `reserve_voucher` 与 `compare_and_set_status` 的原子性。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    BalanceSnapshot, IngestOutcome, NewRedemption, NewRide, NewUser, Partner, PartnerSummary,
    RedemptionStats, RedemptionStatus, RedemptionView, ReserveOutcome, Reward, RewardDetail,
    RewardFilter, Ride, RideStats, User, VoucherDetail,
};

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// 邮箱已注册时返回已有用户，第二个值为 false
    async fn create_user(&self, user: &NewUser) -> Result<(User, bool)>;
    /// name 为 None 时保留原值
    async fn update_name(
        &self,
        id: &str,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;
}

/// 商户与奖励目录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    /// 启用中的商户，按名称排序，附带启用奖励数
    async fn list_partners(&self, category: Option<String>) -> Result<Vec<PartnerSummary>>;
    async fn get_partner(&self, id: &str) -> Result<Option<Partner>>;
    /// 商户下启用的奖励，价格从低到高
    async fn list_partner_rewards(&self, partner_id: &str) -> Result<Vec<Reward>>;
    /// 启用商户的启用奖励，价格从低到高
    async fn list_rewards(&self, filter: RewardFilter) -> Result<Vec<RewardDetail>>;
    /// 不过滤启用状态，由调用方判断是否可兑换
    async fn get_reward(&self, id: &str) -> Result<Option<RewardDetail>>;
    /// 商户表为空时写入示例数据，返回写入的商户数
    async fn seed_sample_data(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// 骑行仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RideRepositoryTrait: Send + Sync {
    /// 按 external_id 去重入账，并在同一原子操作内累加用户统计
    async fn ingest_ride(&self, ride: &NewRide) -> Result<IngestOutcome>;
    async fn list_rides(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Ride>>;
    async fn count_rides(&self, user_id: &str) -> Result<i64>;
    async fn get_ride(&self, id: &str) -> Result<Option<Ride>>;
    async fn ride_stats(&self, user_id: &str) -> Result<RideStats>;
}

/// 积分账本与兑换券仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    /// 一次读取得到累计积分与预留积分，用户不存在返回 None
    async fn balance_snapshot(&self, user_id: &str) -> Result<Option<BalanceSnapshot>>;

    /// 原子地检查余额并写入 pending 兑换券
    ///
    /// 同一用户的并发调用在此串行化；执行前会先把该用户已过期的 pending 券标记为 expired。
    /// 用户不存在返回 `UserNotFound`，兑换码冲突返回 `DuplicateVoucherCode`。
    async fn reserve_voucher(
        &self,
        voucher: &NewRedemption,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome>;

    async fn find_voucher_by_code(&self, code: &str) -> Result<Option<VoucherDetail>>;

    /// 比较并迁移状态
    ///
    /// 仅当当前状态等于 `expected` 时写入 `next`：
    /// - `Completed` 额外要求 `expires_at >= at`，并写入 `redeemed_at = at`
    /// - `Expired` 额外要求 `expires_at < at`
    ///
    /// 返回是否由本次调用完成迁移。
    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: RedemptionStatus,
        next: RedemptionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 把该用户已过期的 pending 券标记为 expired，返回处理数量
    async fn expire_stale_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64>;

    /// 全局清理过期的 pending 券，单次最多处理 `batch_size` 条
    async fn expire_stale(&self, now: DateTime<Utc>, batch_size: i64) -> Result<u64>;

    /// 用户兑换记录，最新在前
    async fn list_vouchers(
        &self,
        user_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<RedemptionView>>;

    async fn redemption_stats(&self, user_id: &str) -> Result<RedemptionStats>;
}
