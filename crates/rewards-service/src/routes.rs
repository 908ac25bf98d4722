//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use sykle_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    dto::{ApiResponse, ServiceInfo},
    handlers,
    state::AppState,
};

/// 用户路由
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::user::create_user))
        .route(
            "/users/{id}",
            get(handlers::user::get_user).put(handlers::user::update_user),
        )
        .route("/users/{id}/stats", get(handlers::user::get_user_stats))
        .route("/users/{id}/balance", get(handlers::user::get_balance))
}

/// 骑行路由
fn ride_routes() -> Router<AppState> {
    Router::new()
        .route("/rides", post(handlers::ride::sync_rides))
        .route("/rides/user/{user_id}", get(handlers::ride::list_user_rides))
        .route("/rides/{id}", get(handlers::ride::get_ride))
}

/// 商户与奖励目录路由
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/partners", get(handlers::catalog::list_partners))
        .route("/partners/{id}", get(handlers::catalog::get_partner))
        .route(
            "/partners/{id}/rewards",
            get(handlers::catalog::list_partner_rewards),
        )
        .route("/rewards", get(handlers::catalog::list_rewards))
        .route("/rewards/{id}", get(handlers::catalog::get_reward))
}

/// 兑换与核销路由
fn redemption_routes() -> Router<AppState> {
    Router::new()
        .route("/rewards/redeem", post(handlers::redemption::redeem_reward))
        .route(
            "/rewards/redemptions/{user_id}",
            get(handlers::redemption::list_redemptions),
        )
        .route(
            "/rewards/verify",
            post(handlers::redemption::verify_redemption),
        )
}

/// 构建所有 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(user_routes())
        .merge(ride_routes())
        .merge(catalog_routes())
        .merge(redemption_routes())
}

/// 构建完整应用
///
/// 包含服务信息、健康检查、`/api` 路由、404 兜底与中间件
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .fallback(not_found)
        .layer(cors)
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

async fn service_info() -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse::success(ServiceInfo {
        name: "sykle-rewards-service",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    }))
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sykle-rewards-service"
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("NOT_FOUND", "接口不存在")),
    )
}
