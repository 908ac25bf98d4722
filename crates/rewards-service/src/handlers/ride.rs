//! 骑行 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::{
    dto::{ApiResponse, RideListParams, SyncRidesRequest},
    error::RewardsError,
    models::Ride,
    service::{RidePage, SyncSummary},
    state::AppState,
};

/// 批量同步骑行
///
/// POST /api/rides
pub async fn sync_rides(
    State(state): State<AppState>,
    Json(req): Json<SyncRidesRequest>,
) -> Result<Json<ApiResponse<SyncSummary>>, RewardsError> {
    req.validate()?;

    let summary = state.rides.sync_rides(&req.user_id, req.rides).await?;
    let message = format!("已同步 {} 条新骑行", summary.new_rides);

    Ok(Json(ApiResponse::success_with_message(summary, message)))
}

/// 用户骑行列表
///
/// GET /api/rides/user/{user_id}
pub async fn list_user_rides(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RideListParams>,
) -> Result<Json<ApiResponse<RidePage>>, RewardsError> {
    let page = state
        .rides
        .list_rides(&user_id, params.limit, params.offset)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// 骑行详情
///
/// GET /api/rides/{id}
pub async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Ride>>, RewardsError> {
    let ride = state.rides.get_ride(&id).await?;
    Ok(Json(ApiResponse::success(ride)))
}
