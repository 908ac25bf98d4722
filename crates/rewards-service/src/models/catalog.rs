//! 合作商户与奖励目录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 地球平均半径（公里）
const EARTH_RADIUS_KM: f64 = 6371.0;

/// 合作商户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: String,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    #[sqlx(default)]
    pub address: Option<String>,
    #[sqlx(default)]
    pub latitude: Option<f64>,
    #[sqlx(default)]
    pub longitude: Option<f64>,
    #[sqlx(default)]
    pub image_url: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Partner {
    /// 到指定坐标的距离（公里），商户无坐标时返回 None
    pub fn distance_from(&self, lat: f64, lng: f64) -> Option<f64> {
        match (self.latitude, self.longitude) {
            (Some(plat), Some(plng)) => Some(haversine_km(lat, lng, plat, plng)),
            _ => None,
        }
    }
}

/// 奖励（商品目录项）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub partner_id: String,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub points_cost: i64,
    #[sqlx(default)]
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 奖励 + 所属商户信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub reward: Reward,
    pub partner_name: String,
    #[sqlx(default)]
    pub partner_address: Option<String>,
    #[sqlx(default)]
    pub partner_latitude: Option<f64>,
    #[sqlx(default)]
    pub partner_longitude: Option<f64>,
    pub partner_active: bool,
}

impl RewardDetail {
    /// 奖励与所属商户均处于启用状态才可兑换
    pub fn is_redeemable(&self) -> bool {
        self.reward.is_active && self.partner_active
    }
}

/// 奖励列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct RewardFilter {
    pub max_points: Option<i64>,
    pub category: Option<String>,
}

/// 商户列表项（附带奖励数与距离）
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PartnerSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub partner: Partner,
    pub reward_count: i64,
    /// 只有请求携带坐标时才计算
    #[serde(skip_serializing_if = "Option::is_none")]
    #[sqlx(skip)]
    pub distance_km: Option<f64>,
}

/// Haversine 球面距离（公里）
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// 保留一位小数
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
