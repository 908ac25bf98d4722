//! 骑行仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::RideRepositoryTrait;
use crate::error::{Result, RewardsError};
use crate::models::{IngestOutcome, NewRide, Ride, RideStats};

const RIDE_COLUMNS: &str = "id, user_id, external_id, start_date, end_date, distance_km, duration_minutes, calories_burned, points_earned, co2_saved_g, synced_at";

pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 入账一次骑行
    ///
    /// 锁定用户行后按 external_id 插入，冲突说明已同步过；
    /// 新插入时在同一事务内累加用户的积分、里程与减排量。
    pub async fn ingest_ride(&self, ride: &NewRide) -> Result<IngestOutcome> {
        let mut tx = self.pool.begin().await?;

        let user_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(&ride.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if user_exists.is_none() {
            return Err(RewardsError::UserNotFound(ride.user_id.clone()));
        }

        let inserted = Self::insert_ride_in_tx(&mut tx, ride).await?;
        let outcome = match inserted {
            Some(saved) => {
                Self::credit_user_in_tx(&mut tx, &saved).await?;
                IngestOutcome::Synced(saved)
            }
            None => IngestOutcome::AlreadySynced,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn insert_ride_in_tx(tx: &mut PgConnection, ride: &NewRide) -> Result<Option<Ride>> {
        let saved = sqlx::query_as::<_, Ride>(&format!(
            r#"
            INSERT INTO rides (id, user_id, external_id, start_date, end_date, distance_km,
                               duration_minutes, calories_burned, points_earned, co2_saved_g, synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING {RIDE_COLUMNS}
            "#
        ))
        .bind(&ride.id)
        .bind(&ride.user_id)
        .bind(&ride.external_id)
        .bind(ride.start_date)
        .bind(ride.end_date)
        .bind(ride.distance_km)
        .bind(ride.duration_minutes)
        .bind(ride.calories_burned)
        .bind(ride.points_earned)
        .bind(ride.co2_saved_g)
        .bind(ride.synced_at)
        .fetch_optional(tx)
        .await?;

        Ok(saved)
    }

    async fn credit_user_in_tx(tx: &mut PgConnection, ride: &Ride) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET total_points = total_points + $2,
                total_distance_km = total_distance_km + $3,
                total_co2_saved_g = total_co2_saved_g + $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(&ride.user_id)
        .bind(ride.points_earned)
        .bind(ride.distance_km)
        .bind(ride.co2_saved_g)
        .bind(ride.synced_at)
        .execute(tx)
        .await?;

        Ok(())
    }

    pub async fn list_rides(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Ride>> {
        let rides = sqlx::query_as::<_, Ride>(&format!(
            r#"
            SELECT {RIDE_COLUMNS}
            FROM rides
            WHERE user_id = $1
            ORDER BY start_date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rides)
    }

    pub async fn count_rides(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rides WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn get_ride(&self, id: &str) -> Result<Option<Ride>> {
        let ride = sqlx::query_as::<_, Ride>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ride)
    }

    pub async fn ride_stats(&self, user_id: &str) -> Result<RideStats> {
        let stats = sqlx::query_as::<_, RideStats>(
            r#"
            SELECT COUNT(*) AS total_rides,
                   COALESCE(SUM(distance_km), 0)::DOUBLE PRECISION AS total_distance_km,
                   COALESCE(SUM(duration_minutes), 0)::DOUBLE PRECISION AS total_duration_minutes,
                   COALESCE(SUM(points_earned), 0)::BIGINT AS total_points,
                   COALESCE(SUM(co2_saved_g), 0)::DOUBLE PRECISION AS total_co2_saved_g
            FROM rides
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[async_trait]
impl RideRepositoryTrait for RideRepository {
    async fn ingest_ride(&self, ride: &NewRide) -> Result<IngestOutcome> {
        self.ingest_ride(ride).await
    }

    async fn list_rides(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Ride>> {
        self.list_rides(user_id, limit, offset).await
    }

    async fn count_rides(&self, user_id: &str) -> Result<i64> {
        self.count_rides(user_id).await
    }

    async fn get_ride(&self, id: &str) -> Result<Option<Ride>> {
        self.get_ride(id).await
    }

    async fn ride_stats(&self, user_id: &str) -> Result<RideStats> {
        self.ride_stats(user_id).await
    }
}
