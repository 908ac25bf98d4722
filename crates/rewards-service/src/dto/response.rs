//! 响应 DTO 定义

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::SettlementOutcome;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 创建错误响应
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }
}

/// 核销结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_spent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl VerifyResponse {
    fn rejected(reason: &'static str) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            redemption_id: None,
            reward_name: None,
            points_spent: None,
            redeemer: None,
            redeemed_at: None,
            used_at: None,
            expires_at: None,
        }
    }
}

impl From<SettlementOutcome> for VerifyResponse {
    fn from(outcome: SettlementOutcome) -> Self {
        let reason = outcome.label();
        match outcome {
            SettlementOutcome::Success {
                redemption_id,
                reward_name,
                points_spent,
                redeemer,
                redeemed_at,
            } => Self {
                valid: true,
                reason: None,
                redemption_id: Some(redemption_id),
                reward_name: Some(reward_name),
                points_spent: Some(points_spent),
                redeemer: Some(redeemer),
                redeemed_at: Some(redeemed_at),
                used_at: None,
                expires_at: None,
            },
            SettlementOutcome::InvalidCode | SettlementOutcome::WrongLocation => {
                Self::rejected(reason)
            }
            SettlementOutcome::AlreadyUsed { used_at } => Self {
                used_at,
                ..Self::rejected(reason)
            },
            SettlementOutcome::Expired { expires_at } => Self {
                expires_at: Some(expires_at),
                ..Self::rejected(reason)
            },
        }
    }
}

/// 服务信息
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}
