//! 商户与奖励目录仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use super::sample_data::{sample_partners, sample_rewards};
use super::traits::CatalogRepositoryTrait;
use crate::error::Result;
use crate::models::{Partner, PartnerSummary, Reward, RewardDetail, RewardFilter};

const PARTNER_COLUMNS: &str =
    "p.id, p.name, p.description, p.address, p.latitude, p.longitude, p.image_url, p.category, p.is_active, p.created_at";

const REWARD_DETAIL_SELECT: &str = r#"
    SELECT w.id, w.partner_id, w.name, w.description, w.points_cost, w.image_url,
           w.is_active, w.created_at,
           p.name AS partner_name, p.address AS partner_address,
           p.latitude AS partner_latitude, p.longitude AS partner_longitude,
           p.is_active AS partner_active
    FROM rewards w
    JOIN partners p ON p.id = w.partner_id
"#;

pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_partners(&self, category: Option<String>) -> Result<Vec<PartnerSummary>> {
        let partners = sqlx::query_as::<_, PartnerSummary>(&format!(
            r#"
            SELECT {PARTNER_COLUMNS},
                   (SELECT COUNT(*) FROM rewards w
                    WHERE w.partner_id = p.id AND w.is_active) AS reward_count
            FROM partners p
            WHERE p.is_active AND ($1::varchar IS NULL OR p.category = $1)
            ORDER BY p.name ASC
            "#
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(partners)
    }

    pub async fn get_partner(&self, id: &str) -> Result<Option<Partner>> {
        let partner = sqlx::query_as::<_, Partner>(&format!(
            "SELECT {PARTNER_COLUMNS} FROM partners p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(partner)
    }

    pub async fn list_partner_rewards(&self, partner_id: &str) -> Result<Vec<Reward>> {
        let rewards = sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, partner_id, name, description, points_cost, image_url, is_active, created_at
            FROM rewards
            WHERE partner_id = $1 AND is_active
            ORDER BY points_cost ASC, id ASC
            "#,
        )
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rewards)
    }

    pub async fn list_rewards(&self, filter: RewardFilter) -> Result<Vec<RewardDetail>> {
        let rewards = sqlx::query_as::<_, RewardDetail>(&format!(
            r#"
            {REWARD_DETAIL_SELECT}
            WHERE w.is_active AND p.is_active
              AND ($1::bigint IS NULL OR w.points_cost <= $1)
              AND ($2::varchar IS NULL OR p.category = $2)
            ORDER BY w.points_cost ASC, w.id ASC
            "#
        ))
        .bind(filter.max_points)
        .bind(filter.category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rewards)
    }

    pub async fn get_reward(&self, id: &str) -> Result<Option<RewardDetail>> {
        let reward = sqlx::query_as::<_, RewardDetail>(&format!(
            "{REWARD_DETAIL_SELECT} WHERE w.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    /// 写入示例数据
    ///
    /// 只在商户表为空时执行，所有写入在同一事务内
    pub async fn seed_sample_data(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM partners")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        let mut inserted = 0u64;
        for partner in sample_partners(now) {
            let result = sqlx::query(
                r#"
                INSERT INTO partners (id, name, description, address, latitude, longitude,
                                      image_url, category, is_active, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&partner.id)
            .bind(&partner.name)
            .bind(&partner.description)
            .bind(&partner.address)
            .bind(partner.latitude)
            .bind(partner.longitude)
            .bind(&partner.image_url)
            .bind(&partner.category)
            .bind(partner.is_active)
            .bind(partner.created_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        for reward in sample_rewards(now) {
            sqlx::query(
                r#"
                INSERT INTO rewards (id, partner_id, name, description, points_cost,
                                     image_url, is_active, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&reward.id)
            .bind(&reward.partner_id)
            .bind(&reward.name)
            .bind(&reward.description)
            .bind(reward.points_cost)
            .bind(&reward.image_url)
            .bind(reward.is_active)
            .bind(reward.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(partners = inserted, "示例商户与奖励已写入");
        Ok(inserted)
    }
}

#[async_trait]
impl CatalogRepositoryTrait for CatalogRepository {
    async fn list_partners(&self, category: Option<String>) -> Result<Vec<PartnerSummary>> {
        self.list_partners(category).await
    }

    async fn get_partner(&self, id: &str) -> Result<Option<Partner>> {
        self.get_partner(id).await
    }

    async fn list_partner_rewards(&self, partner_id: &str) -> Result<Vec<Reward>> {
        self.list_partner_rewards(partner_id).await
    }

    async fn list_rewards(&self, filter: RewardFilter) -> Result<Vec<RewardDetail>> {
        self.list_rewards(filter).await
    }

    async fn get_reward(&self, id: &str) -> Result<Option<RewardDetail>> {
        self.get_reward(id).await
    }

    async fn seed_sample_data(&self, now: DateTime<Utc>) -> Result<u64> {
        self.seed_sample_data(now).await
    }
}
