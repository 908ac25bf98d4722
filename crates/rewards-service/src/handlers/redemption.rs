//! 兑换与核销 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    dto::{ApiResponse, RedeemRequest, RedemptionListParams, VerifyRequest, VerifyResponse},
    error::RewardsError,
    models::{RedemptionStatus, RedemptionView, SettlementOutcome},
    service::IssuedVoucher,
    state::AppState,
};

/// 兑换奖励，签发兑换券
///
/// POST /api/rewards/redeem
pub async fn redeem_reward(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IssuedVoucher>>), RewardsError> {
    req.validate()?;

    let voucher = state
        .redemptions
        .issue_redemption(&req.user_id, &req.reward_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            voucher,
            "兑换成功，请在有效期内到店出示兑换码",
        )),
    ))
}

/// 用户兑换历史
///
/// GET /api/rewards/redemptions/{user_id}?status
pub async fn list_redemptions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RedemptionListParams>,
) -> Result<Json<ApiResponse<Vec<RedemptionView>>>, RewardsError> {
    let status = params
        .status
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<RedemptionStatus>())
        .transpose()
        .map_err(RewardsError::Validation)?;

    let redemptions = state
        .redemptions
        .list_redemptions(&user_id, status)
        .await?;
    Ok(Json(ApiResponse::success(redemptions)))
}

/// 商户扫码核销
///
/// POST /api/rewards/verify
///
/// 拒绝时 `valid = false`，HTTP 状态码区分原因：
/// 404 兑换码无效、403 商户不匹配、409 已使用、410 已过期
pub async fn verify_redemption(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VerifyResponse>>), RewardsError> {
    req.validate()?;

    let outcome = state
        .settlement
        .verify_and_settle(&req.qr_code, &req.partner_id)
        .await?;

    let (status, code, message) = match &outcome {
        SettlementOutcome::Success { .. } => (StatusCode::OK, "SUCCESS", "核销成功"),
        SettlementOutcome::InvalidCode => (StatusCode::NOT_FOUND, "INVALID_CODE", "兑换码无效"),
        SettlementOutcome::WrongLocation => (
            StatusCode::FORBIDDEN,
            "WRONG_LOCATION",
            "该兑换码不属于当前商户",
        ),
        SettlementOutcome::AlreadyUsed { .. } => {
            (StatusCode::CONFLICT, "ALREADY_USED", "兑换码已使用")
        }
        SettlementOutcome::Expired { .. } => (StatusCode::GONE, "EXPIRED", "兑换码已过期"),
    };

    let body = ApiResponse {
        success: outcome.is_success(),
        code: code.to_string(),
        message: message.to_string(),
        data: Some(VerifyResponse::from(outcome)),
    };

    Ok((status, Json(body)))
}
