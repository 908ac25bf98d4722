//! 骑行同步服务
//!
//! 客户端从设备健康数据读取 workout 后批量上报。每条骑行按 external_id 去重，
//! 新骑行按里程与时长换算积分，并累加到用户统计中。

use std::sync::Arc;

use sykle_shared::observability::metrics;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::dto::{RideInput, RidePage, RideSyncResult, SyncSummary, UserTotals};
use crate::clock::Clock;
use crate::error::{Result, RewardsError};
use crate::models::{
    IngestOutcome, NewRide, Ride, RideSyncStatus, calculate_co2_saved, calculate_points,
};
use crate::repository::{RideRepositoryTrait, UserRepositoryTrait};

/// 默认分页大小
pub const DEFAULT_RIDE_LIMIT: i64 = 50;
/// 分页大小上限
pub const MAX_RIDE_LIMIT: i64 = 200;

pub struct RideService {
    users: Arc<dyn UserRepositoryTrait>,
    rides: Arc<dyn RideRepositoryTrait>,
    clock: Arc<dyn Clock>,
}

impl RideService {
    pub fn new(
        users: Arc<dyn UserRepositoryTrait>,
        rides: Arc<dyn RideRepositoryTrait>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            rides,
            clock,
        }
    }

    /// 批量同步骑行
    ///
    /// 整批先做校验，任一条不合法则整批拒绝；之后逐条入账，已同步过的骑行不重复计分。
    #[instrument(skip(self, rides), fields(user_id = %user_id, count = rides.len()))]
    pub async fn sync_rides(&self, user_id: &str, rides: Vec<RideInput>) -> Result<SyncSummary> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(RewardsError::UserNotFound(user_id.to_string()));
        }
        for ride in &rides {
            ride.validate()?;
        }

        let rides_processed = rides.len();
        let mut results = Vec::with_capacity(rides_processed);
        let mut points_earned = 0i64;
        let mut co2_saved_g = 0f64;

        for input in rides {
            let new_ride = self.build_ride(user_id, input);
            let external_id = new_ride.external_id.clone();

            match self.rides.ingest_ride(&new_ride).await? {
                IngestOutcome::Synced(ride) => {
                    points_earned = points_earned.saturating_add(ride.points_earned);
                    co2_saved_g += ride.co2_saved_g;
                    results.push(RideSyncResult {
                        external_id,
                        status: RideSyncStatus::Synced,
                        ride_id: Some(ride.id),
                        points_earned: Some(ride.points_earned),
                        co2_saved_g: Some(ride.co2_saved_g),
                    });
                }
                IngestOutcome::AlreadySynced => results.push(RideSyncResult {
                    external_id,
                    status: RideSyncStatus::AlreadySynced,
                    ride_id: None,
                    points_earned: None,
                    co2_saved_g: None,
                }),
            }
        }

        let new_rides = results
            .iter()
            .filter(|r| r.status == RideSyncStatus::Synced)
            .count();
        metrics::record_ride_sync("synced", new_rides as u64);
        metrics::record_ride_sync("already_synced", (rides_processed - new_rides) as u64);

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| RewardsError::UserNotFound(user_id.to_string()))?;

        info!(
            user_id = %user_id,
            rides_processed,
            new_rides,
            points_earned,
            "骑行同步完成"
        );

        Ok(SyncSummary {
            rides_processed,
            new_rides,
            points_earned,
            co2_saved_g: co2_saved_g.round() as i64,
            results,
            user: UserTotals::from(&user),
        })
    }

    fn build_ride(&self, user_id: &str, input: RideInput) -> NewRide {
        NewRide {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            points_earned: calculate_points(input.distance_km, input.duration_minutes),
            co2_saved_g: calculate_co2_saved(input.distance_km),
            external_id: input.external_id.trim().to_string(),
            start_date: input.start_date,
            end_date: input.end_date,
            distance_km: input.distance_km,
            duration_minutes: input.duration_minutes,
            calories_burned: input.calories_burned,
            synced_at: self.clock.now(),
        }
    }

    /// 用户骑行分页，最新在前
    #[instrument(skip(self))]
    pub async fn list_rides(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<RidePage> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(RewardsError::UserNotFound(user_id.to_string()));
        }

        let limit = limit
            .unwrap_or(DEFAULT_RIDE_LIMIT)
            .clamp(1, MAX_RIDE_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let rides = self.rides.list_rides(user_id, limit, offset).await?;
        let total = self.rides.count_rides(user_id).await?;

        Ok(RidePage {
            rides,
            total,
            limit,
            offset,
        })
    }

    pub async fn get_ride(&self, id: &str) -> Result<Ride> {
        self.rides
            .get_ride(id)
            .await?
            .ok_or_else(|| RewardsError::RideNotFound(id.to_string()))
    }
}
