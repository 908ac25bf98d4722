//! 商户与奖励目录 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    dto::{ApiResponse, PartnerListParams, RewardListParams},
    error::RewardsError,
    models::{PartnerSummary, Reward, RewardDetail},
    service::PartnerDetail,
    state::AppState,
};

/// 商户列表
///
/// GET /api/partners?category&lat&lng&radius
pub async fn list_partners(
    State(state): State<AppState>,
    Query(params): Query<PartnerListParams>,
) -> Result<Json<ApiResponse<Vec<PartnerSummary>>>, RewardsError> {
    let partners = state.catalog.list_partners(params.into()).await?;
    Ok(Json(ApiResponse::success(partners)))
}

/// 商户详情
///
/// GET /api/partners/{id}
pub async fn get_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PartnerDetail>>, RewardsError> {
    let partner = state.catalog.get_partner(&id).await?;
    Ok(Json(ApiResponse::success(partner)))
}

/// 商户奖励列表
///
/// GET /api/partners/{id}/rewards
pub async fn list_partner_rewards(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Reward>>>, RewardsError> {
    let rewards = state.catalog.list_partner_rewards(&id).await?;
    Ok(Json(ApiResponse::success(rewards)))
}

/// 奖励列表
///
/// GET /api/rewards?maxPoints&category
pub async fn list_rewards(
    State(state): State<AppState>,
    Query(params): Query<RewardListParams>,
) -> Result<Json<ApiResponse<Vec<RewardDetail>>>, RewardsError> {
    let rewards = state.catalog.list_rewards(params.into()).await?;
    Ok(Json(ApiResponse::success(rewards)))
}

/// 奖励详情
///
/// GET /api/rewards/{id}
pub async fn get_reward(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RewardDetail>>, RewardsError> {
    let reward = state.catalog.get_reward(&id).await?;
    Ok(Json(ApiResponse::success(reward)))
}
