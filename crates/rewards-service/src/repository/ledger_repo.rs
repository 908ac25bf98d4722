//! 积分账本与兑换券仓储
//!
//! 可用积分不落库：累计积分减去 pending + completed 兑换券的 points_spent。
//! 签发通过锁定用户行串行化，核销通过带前置状态的 UPDATE 实现比较并迁移。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::traits::LedgerRepositoryTrait;
use crate::error::{Result, RewardsError};
use crate::models::{
    BalanceSnapshot, NewRedemption, Redemption, RedemptionStats, RedemptionStatus,
    RedemptionView, ReserveOutcome, VoucherDetail,
};

const REDEMPTION_COLUMNS: &str = "r.id, r.user_id, r.reward_id, r.partner_id, r.points_spent, r.code, r.status, r.expires_at, r.redeemed_at, r.created_at";

pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 余额快照
    ///
    /// 单条语句读取，累计积分与预留积分来自同一个快照
    pub async fn balance_snapshot(&self, user_id: &str) -> Result<Option<BalanceSnapshot>> {
        let snapshot = sqlx::query_as::<_, BalanceSnapshot>(
            r#"
            SELECT u.total_points AS total_earned,
                   COALESCE((
                       SELECT SUM(r.points_spent)
                       FROM redemptions r
                       WHERE r.user_id = u.id AND r.status IN ('pending', 'completed')
                   ), 0)::BIGINT AS reserved
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(snapshot)
    }

    /// 原子预留积分并签发兑换券
    pub async fn reserve_voucher(
        &self,
        voucher: &NewRedemption,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;

        // 1. 锁定用户行，同一用户的签发在此排队
        let total_earned: Option<i64> =
            sqlx::query_scalar("SELECT total_points FROM users WHERE id = $1 FOR UPDATE")
                .bind(&voucher.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(total_earned) = total_earned else {
            return Err(RewardsError::UserNotFound(voucher.user_id.clone()));
        };

        // 2. 释放已过期的预留
        let released = Self::expire_stale_for_user_in_tx(&mut tx, &voucher.user_id, now).await?;
        if released > 0 {
            debug!(user_id = %voucher.user_id, released, "签发前释放过期预留");
        }

        // 3. 在锁内重新计算预留积分
        let reserved = Self::reserved_points_in_tx(&mut tx, &voucher.user_id).await?;
        let balance = BalanceSnapshot::new(total_earned, reserved);

        if !balance.can_afford(voucher.points_spent) {
            tx.commit().await?;
            return Ok(ReserveOutcome::Insufficient { balance });
        }

        // 4. 写入 pending 兑换券
        let redemption = Self::insert_voucher_in_tx(&mut tx, voucher).await?;

        tx.commit().await?;

        Ok(ReserveOutcome::Reserved {
            redemption,
            balance: balance.after_reserving(voucher.points_spent),
        })
    }

    async fn reserved_points_in_tx(tx: &mut PgConnection, user_id: &str) -> Result<i64> {
        let reserved: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(points_spent), 0)::BIGINT
            FROM redemptions
            WHERE user_id = $1 AND status IN ('pending', 'completed')
            "#,
        )
        .bind(user_id)
        .fetch_one(tx)
        .await?;

        Ok(reserved)
    }

    async fn insert_voucher_in_tx(
        tx: &mut PgConnection,
        voucher: &NewRedemption,
    ) -> Result<Redemption> {
        let redemption = sqlx::query_as::<_, Redemption>(
            r#"
            INSERT INTO redemptions (id, user_id, reward_id, partner_id, points_spent, code,
                                     status, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING id, user_id, reward_id, partner_id, points_spent, code, status,
                      expires_at, redeemed_at, created_at
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.user_id)
        .bind(&voucher.reward_id)
        .bind(&voucher.partner_id)
        .bind(voucher.points_spent)
        .bind(&voucher.code)
        .bind(voucher.expires_at)
        .bind(voucher.created_at)
        .fetch_one(tx)
        .await
        .map_err(|e| map_code_conflict(e, &voucher.code))?;

        Ok(redemption)
    }

    async fn expire_stale_for_user_in_tx(
        tx: &mut PgConnection,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE redemptions
            SET status = 'expired'
            WHERE user_id = $1 AND status = 'pending' AND expires_at < $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_voucher_by_code(&self, code: &str) -> Result<Option<VoucherDetail>> {
        let voucher = sqlx::query_as::<_, VoucherDetail>(&format!(
            r#"
            SELECT {REDEMPTION_COLUMNS},
                   w.name AS reward_name,
                   u.name AS user_name,
                   u.email AS user_email
            FROM redemptions r
            JOIN rewards w ON w.id = r.reward_id
            JOIN users u ON u.id = r.user_id
            WHERE r.code = $1
            "#
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    /// 比较并迁移状态
    ///
    /// 过期边界与 `Redemption::is_past_expiry` 一致：`now > expires_at` 即过期
    pub async fn compare_and_set_status(
        &self,
        id: &str,
        expected: RedemptionStatus,
        next: RedemptionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if !expected.can_transition_to(next) {
            return Err(RewardsError::Internal(format!(
                "非法的兑换状态迁移: {} -> {}",
                expected, next
            )));
        }

        let result = match next {
            RedemptionStatus::Completed => {
                sqlx::query(
                    r#"
                    UPDATE redemptions
                    SET status = $3, redeemed_at = $4
                    WHERE id = $1 AND status = $2 AND expires_at >= $4
                    "#,
                )
                .bind(id)
                .bind(expected)
                .bind(next)
                .bind(at)
                .execute(&self.pool)
                .await?
            }
            RedemptionStatus::Expired => {
                sqlx::query(
                    r#"
                    UPDATE redemptions
                    SET status = $3
                    WHERE id = $1 AND status = $2 AND expires_at < $4
                    "#,
                )
                .bind(id)
                .bind(expected)
                .bind(next)
                .bind(at)
                .execute(&self.pool)
                .await?
            }
            RedemptionStatus::Pending => return Ok(false),
        };

        Ok(result.rows_affected() == 1)
    }

    pub async fn expire_stale_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::expire_stale_for_user_in_tx(&mut conn, user_id, now).await
    }

    /// 全局批量过期
    ///
    /// SKIP LOCKED 避免与正在签发的事务互相等待
    pub async fn expire_stale(&self, now: DateTime<Utc>, batch_size: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE redemptions
            SET status = 'expired'
            WHERE id IN (
                SELECT id FROM redemptions
                WHERE status = 'pending' AND expires_at < $1
                ORDER BY expires_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(batch_size)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_vouchers(
        &self,
        user_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<RedemptionView>> {
        let vouchers = sqlx::query_as::<_, RedemptionView>(&format!(
            r#"
            SELECT {REDEMPTION_COLUMNS},
                   w.name AS reward_name,
                   w.description AS reward_description,
                   p.name AS partner_name
            FROM redemptions r
            JOIN rewards w ON w.id = r.reward_id
            JOIN partners p ON p.id = r.partner_id
            WHERE r.user_id = $1 AND ($2::varchar IS NULL OR r.status = $2)
            ORDER BY r.created_at DESC, r.id DESC
            "#
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    pub async fn redemption_stats(&self, user_id: &str) -> Result<RedemptionStats> {
        let stats = sqlx::query_as::<_, RedemptionStats>(
            r#"
            SELECT COUNT(*) AS total_redemptions,
                   COALESCE(SUM(points_spent), 0)::BIGINT AS total_points_spent
            FROM redemptions
            WHERE user_id = $1 AND status IN ('pending', 'completed')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

/// 兑换码唯一约束冲突转换为可重试错误
fn map_code_conflict(err: sqlx::Error, code: &str) -> RewardsError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RewardsError::DuplicateVoucherCode(code.to_string())
        }
        _ => RewardsError::Database(err),
    }
}

#[async_trait]
impl LedgerRepositoryTrait for LedgerRepository {
    async fn balance_snapshot(&self, user_id: &str) -> Result<Option<BalanceSnapshot>> {
        self.balance_snapshot(user_id).await
    }

    async fn reserve_voucher(
        &self,
        voucher: &NewRedemption,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome> {
        self.reserve_voucher(voucher, now).await
    }

    async fn find_voucher_by_code(&self, code: &str) -> Result<Option<VoucherDetail>> {
        self.find_voucher_by_code(code).await
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: RedemptionStatus,
        next: RedemptionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.compare_and_set_status(id, expected, next, at).await
    }

    async fn expire_stale_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64> {
        self.expire_stale_for_user(user_id, now).await
    }

    async fn expire_stale(&self, now: DateTime<Utc>, batch_size: i64) -> Result<u64> {
        self.expire_stale(now, batch_size).await
    }

    async fn list_vouchers(
        &self,
        user_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<RedemptionView>> {
        self.list_vouchers(user_id, status).await
    }

    async fn redemption_stats(&self, user_id: &str) -> Result<RedemptionStats> {
        self.redemption_stats(user_id).await
    }
}
