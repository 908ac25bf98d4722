//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构

use serde::Deserialize;
use validator::Validate;

use crate::models::RewardFilter;
use crate::service::{PartnerQuery, RideInput};

/// 创建用户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(
        length(min = 3, max = 255, message = "邮箱长度必须在3-255个字符之间"),
        contains(pattern = "@", message = "邮箱格式不正确")
    )]
    pub email: String,
    #[validate(length(max = 100, message = "昵称不能超过100个字符"))]
    pub name: Option<String>,
}

/// 更新用户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(max = 100, message = "昵称不能超过100个字符"))]
    pub name: Option<String>,
}

/// 骑行批量同步请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncRidesRequest {
    #[validate(length(min = 1, message = "userId 不能为空"))]
    pub user_id: String,
    #[validate(nested)]
    pub rides: Vec<RideInput>,
}

/// 骑行分页参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 商户查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerListParams {
    pub category: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// 搜索半径（公里）
    pub radius: Option<f64>,
}

impl From<PartnerListParams> for PartnerQuery {
    fn from(params: PartnerListParams) -> Self {
        Self {
            category: params.category.filter(|c| !c.trim().is_empty()),
            lat: params.lat,
            lng: params.lng,
            radius_km: params.radius,
        }
    }
}

/// 奖励查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardListParams {
    pub max_points: Option<i64>,
    pub category: Option<String>,
}

impl From<RewardListParams> for RewardFilter {
    fn from(params: RewardListParams) -> Self {
        Self {
            max_points: params.max_points,
            category: params.category.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// 兑换请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    #[validate(length(min = 1, message = "userId 不能为空"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "rewardId 不能为空"))]
    pub reward_id: String,
}

/// 兑换历史过滤参数
#[derive(Debug, Default, Deserialize)]
pub struct RedemptionListParams {
    /// pending / completed / expired
    pub status: Option<String>,
}

/// 商户核销请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[validate(length(min = 1, message = "qrCode 不能为空"))]
    pub qr_code: String,
    #[validate(length(min = 1, message = "partnerId 不能为空"))]
    pub partner_id: String,
}
