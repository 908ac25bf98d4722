//! 骑行记录与积分换算

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 每公里积分
pub const POINTS_PER_KM: f64 = 100.0;
/// 每分钟积分
pub const POINTS_PER_MINUTE: f64 = 10.0;
/// 相比驾车每公里减少的 CO2（克）
pub const CO2_GRAMS_PER_KM: f64 = 150.0;

/// 计算一次骑行获得的积分：floor(km × 100) + floor(分钟 × 10)
pub fn calculate_points(distance_km: f64, duration_minutes: f64) -> i64 {
    let distance_points = (distance_km * POINTS_PER_KM).floor() as i64;
    let duration_points = (duration_minutes * POINTS_PER_MINUTE).floor() as i64;
    distance_points.saturating_add(duration_points)
}

/// 计算减少的 CO2 排放（克）
pub fn calculate_co2_saved(distance_km: f64) -> f64 {
    distance_km * CO2_GRAMS_PER_KM
}

/// 骑行记录（入账事件，创建后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: String,
    pub user_id: String,
    /// 设备健康数据中的 workout 标识，全局唯一
    pub external_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub distance_km: f64,
    pub duration_minutes: f64,
    #[sqlx(default)]
    pub calories_burned: Option<f64>,
    pub points_earned: i64,
    pub co2_saved_g: f64,
    pub synced_at: DateTime<Utc>,
}

/// 待入账的骑行
#[derive(Debug, Clone)]
pub struct NewRide {
    pub id: String,
    pub user_id: String,
    pub external_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub calories_burned: Option<f64>,
    pub points_earned: i64,
    pub co2_saved_g: f64,
    pub synced_at: DateTime<Utc>,
}

impl NewRide {
    pub fn into_ride(self) -> Ride {
        Ride {
            id: self.id,
            user_id: self.user_id,
            external_id: self.external_id,
            start_date: self.start_date,
            end_date: self.end_date,
            distance_km: self.distance_km,
            duration_minutes: self.duration_minutes,
            calories_burned: self.calories_burned,
            points_earned: self.points_earned,
            co2_saved_g: self.co2_saved_g,
            synced_at: self.synced_at,
        }
    }
}

/// 单条骑行入账结果
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// 新入账，用户累计值已同步增加
    Synced(Ride),
    /// external_id 已存在，没有任何写入
    AlreadySynced,
}
