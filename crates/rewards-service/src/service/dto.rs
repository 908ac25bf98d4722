//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{
    Partner, Redemption, RedemptionStatus, Reward, RewardDetail, Ride, RideSyncStatus, User,
};

// ==================== 骑行同步 ====================

/// 单次骑行里程上限（公里）
pub const MAX_RIDE_DISTANCE_KM: f64 = 1000.0;
/// 单次骑行时长上限（分钟），即一天
pub const MAX_RIDE_DURATION_MINUTES: f64 = 1440.0;

/// 客户端上报的一次骑行
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_ride_window"))]
pub struct RideInput {
    /// 健康数据中的 workout UUID
    #[serde(alias = "healthkitUuid")]
    #[validate(length(min = 1, max = 128, message = "externalId 不能为空"))]
    pub external_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 0.0, max = MAX_RIDE_DISTANCE_KM, message = "里程需在 0 到 1000 公里之间"))]
    pub distance_km: f64,
    #[validate(range(min = 0.0, max = MAX_RIDE_DURATION_MINUTES, message = "时长需在 0 到 1440 分钟之间"))]
    pub duration_minutes: f64,
    pub calories_burned: Option<f64>,
}

fn validate_ride_window(ride: &RideInput) -> Result<(), ValidationError> {
    if ride.end_date < ride.start_date {
        let mut err = ValidationError::new("ride_window");
        err.message = Some("结束时间不能早于开始时间".into());
        return Err(err);
    }
    Ok(())
}

/// 单条骑行同步结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideSyncResult {
    pub external_id: String,
    pub status: RideSyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_saved_g: Option<f64>,
}

/// 批量同步汇总
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub rides_processed: usize,
    pub new_rides: usize,
    pub points_earned: i64,
    /// 四舍五入到整克
    pub co2_saved_g: i64,
    pub results: Vec<RideSyncResult>,
    pub user: UserTotals,
}

/// 用户累计值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    pub total_points: i64,
    pub total_distance_km: f64,
    pub total_co2_saved_g: f64,
}

impl From<&User> for UserTotals {
    fn from(user: &User) -> Self {
        Self {
            total_points: user.total_points,
            total_distance_km: user.total_distance_km,
            total_co2_saved_g: user.total_co2_saved_g,
        }
    }
}

/// 骑行分页
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RidePage {
    pub rides: Vec<Ride>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// ==================== 用户 ====================

/// 创建用户结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub user: User,
    /// false 表示邮箱已注册，返回的是已有用户
    pub created: bool,
}

/// 用户统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_points: i64,
    pub available_points: i64,
    pub total_rides: i64,
    /// 保留一位小数
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub total_co2_saved_g: i64,
    pub total_redemptions: i64,
}

/// 余额视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDto {
    pub total_earned: i64,
    pub reserved: i64,
    pub available: i64,
}

// ==================== 商户目录 ====================

/// 商户查询条件
#[derive(Debug, Clone, Default)]
pub struct PartnerQuery {
    pub category: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

/// 商户详情（含启用奖励）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerDetail {
    #[serde(flatten)]
    pub partner: Partner,
    pub rewards: Vec<Reward>,
}

// ==================== 兑换 ====================

/// 奖励快照
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSnapshot {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub points_cost: i64,
}

/// 商户快照
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerSnapshot {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl From<&RewardDetail> for RewardSnapshot {
    fn from(detail: &RewardDetail) -> Self {
        Self {
            id: detail.reward.id.clone(),
            name: detail.reward.name.clone(),
            description: detail.reward.description.clone(),
            points_cost: detail.reward.points_cost,
        }
    }
}

impl From<&RewardDetail> for PartnerSnapshot {
    fn from(detail: &RewardDetail) -> Self {
        Self {
            id: detail.reward.partner_id.clone(),
            name: detail.partner_name.clone(),
            address: detail.partner_address.clone(),
        }
    }
}

/// 签发成功的兑换券
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedVoucher {
    pub id: String,
    pub code: String,
    pub status: RedemptionStatus,
    pub points_spent: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub reward: RewardSnapshot,
    pub partner: PartnerSnapshot,
    pub remaining_points: i64,
}

impl IssuedVoucher {
    pub fn new(redemption: Redemption, detail: &RewardDetail, remaining_points: i64) -> Self {
        Self {
            id: redemption.id,
            code: redemption.code,
            status: redemption.status,
            points_spent: redemption.points_spent,
            expires_at: redemption.expires_at,
            created_at: redemption.created_at,
            reward: RewardSnapshot::from(detail),
            partner: PartnerSnapshot::from(detail),
            remaining_points,
        }
    }
}
