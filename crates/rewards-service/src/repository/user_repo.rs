//! 用户仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::UserRepositoryTrait;
use crate::error::{Result, RewardsError};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, email, name, total_points, total_distance_km, total_co2_saved_g, created_at, updated_at";

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// 创建用户
    ///
    /// 依赖 email 唯一约束，冲突时读取已有用户
    pub async fn create_user(&self, user: &NewUser) -> Result<(User, bool)> {
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(created) = inserted {
            return Ok((created, true));
        }

        let existing = self.find_by_email(&user.email).await?.ok_or_else(|| {
            RewardsError::Internal(format!("邮箱冲突但未找到用户: {}", user.email))
        })?;

        Ok((existing, false))
    }

    pub async fn update_name(
        &self,
        id: &str,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), updated_at = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.get_user(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_by_email(email).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<(User, bool)> {
        self.create_user(user).await
    }

    async fn update_name(
        &self,
        id: &str,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.update_name(id, name, now).await
    }
}
