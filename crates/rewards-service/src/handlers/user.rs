//! 用户 API 处理器

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    dto::{ApiResponse, CreateUserRequest, UpdateUserRequest},
    error::RewardsError,
    models::User,
    service::{BalanceDto, UserStats},
    state::AppState,
};

/// 创建用户
///
/// POST /api/users
///
/// 邮箱已注册时返回 200 和已有用户，新建时返回 201
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), RewardsError> {
    req.validate()?;

    let created = state.users.create_user(&req.email, req.name).await?;

    if created.created {
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success_with_message(created.user, "用户创建成功")),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(ApiResponse::success_with_message(created.user, "用户已存在")),
        ))
    }
}

/// 获取用户
///
/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<User>>, RewardsError> {
    let user = state.users.get_user(&id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// 更新用户昵称
///
/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, RewardsError> {
    req.validate()?;

    let user = state.users.update_user(&id, req.name).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// 用户统计
///
/// GET /api/users/{id}/stats
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserStats>>, RewardsError> {
    let stats = state.users.get_user_stats(&id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// 积分余额
///
/// GET /api/users/{id}/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BalanceDto>>, RewardsError> {
    let balance = state.ledger.balance_view(&id).await?;
    Ok(Json(ApiResponse::success(balance)))
}
