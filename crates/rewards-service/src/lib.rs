//! Sykle 骑行积分服务
//!
//! 骑行换积分，积分兑换合作商户奖励。
//!
//! ## 核心功能
//!
//! - **骑行同步**：按 workout 去重入账，里程与时长换算积分
//! - **积分账本**：可用积分 = 累计积分 - 待核销与已核销兑换券占用的积分
//! - **兑换券签发**：原子预留积分，生成限时兑换码
//! - **商户核销**：按固定顺序校验兑换码，pending 只能迁移一次
//! - **过期清理**：查询时按用户清理，后台 Worker 全局清理
//!
//! ## 模块结构
//!
//! - `clock`: 可注入时钟
//! - `dto`: HTTP 请求和响应对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `models`: 领域模型
//! - `repository`: PostgreSQL 与内存存储
//! - `routes`: 路由配置
//! - `service`: 业务逻辑
//! - `state`: 应用状态
//! - `worker`: 后台任务
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据库：PostgreSQL (sqlx)
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod clock;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, RewardsError};
pub use state::{AppState, Repositories};
