//! 积分服务错误类型定义
//!
//! 业务错误与系统错误共用一个枚举，HTTP 层通过 `IntoResponse` 统一转换。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sykle_shared::error::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewardsError {
    // 资源不存在
    #[error("用户不存在: {0}")]
    UserNotFound(String),

    #[error("奖励不存在或已下架: {0}")]
    RewardNotFound(String),

    #[error("商户不存在: {0}")]
    PartnerNotFound(String),

    #[error("骑行记录不存在: {0}")]
    RideNotFound(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 业务错误
    #[error("积分不足: 需要 {required}, 可用 {available}")]
    InsufficientPoints { required: i64, available: i64 },

    // 并发错误（可重试）
    #[error("并发冲突，请重试")]
    ConcurrencyConflict,

    #[error("兑换码冲突: {0}")]
    DuplicateVoucherCode(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("基础设施错误: {0}")]
    Infra(#[from] InfraError),

    #[error("内部错误: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RewardsError>;

impl RewardsError {
    /// 判断是否为可重试的错误
    ///
    /// 并发冲突和兑换码碰撞可以安全地整体重试；
    /// 连接池超时等瞬时错误交给调用方决定。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict | Self::DuplicateVoucherCode(_))
    }

    /// 判断是否为业务错误（客户端可以理解并处理的错误）
    pub fn is_business_error(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::RewardNotFound(_)
                | Self::PartnerNotFound(_)
                | Self::RideNotFound(_)
                | Self::Validation(_)
                | Self::InsufficientPoints { .. }
        )
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UserNotFound(_)
            | Self::RewardNotFound(_)
            | Self::PartnerNotFound(_)
            | Self::RideNotFound(_) => StatusCode::NOT_FOUND,

            Self::Validation(_) | Self::InsufficientPoints { .. } => StatusCode::BAD_REQUEST,

            Self::ConcurrencyConflict | Self::DuplicateVoucherCode(_) => StatusCode::CONFLICT,

            Self::Database(_) | Self::Infra(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应和指标标签）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RewardNotFound(_) => "REWARD_NOT_FOUND",
            Self::PartnerNotFound(_) => "PARTNER_NOT_FOUND",
            Self::RideNotFound(_) => "RIDE_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::DuplicateVoucherCode(_) => "DUPLICATE_VOUCHER_CODE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Infra(_) => "INFRA_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 错误附带的结构化数据
    fn data(&self) -> serde_json::Value {
        match self {
            Self::InsufficientPoints {
                required,
                available,
            } => json!({ "required": required, "available": available }),
            _ => serde_json::Value::Null,
        }
    }
}

impl From<validator::ValidationErrors> for RewardsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl IntoResponse for RewardsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Infra(e) => {
                tracing::error!(error = %e, "基础设施异常");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": self.data(),
        });

        (status, axum::Json(body)).into_response()
    }
}
