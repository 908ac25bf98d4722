//! 用户与统计实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户
///
/// `total_points` 是历史累计获得的积分，只由骑行同步增加；
/// 可用积分不落库，由兑换记录推导。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[sqlx(default)]
    pub name: Option<String>,
    pub total_points: i64,
    pub total_distance_km: f64,
    pub total_co2_saved_g: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 展示名：未设置昵称时使用邮箱
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// 新建用户参数
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 用户骑行统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RideStats {
    pub total_rides: i64,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub total_points: i64,
    pub total_co2_saved_g: f64,
}

/// 用户兑换统计（只统计占用积分的 pending + completed）
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionStats {
    pub total_redemptions: i64,
    pub total_points_spent: i64,
}
