//! 服务层
//!
//! 实现积分与兑换业务逻辑，只依赖仓储 trait。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `ledger_service`: 可用积分查询
//! - `redemption_service`: 兑换券签发与兑换历史
//! - `settlement_service`: 商户核销
//! - `expiry_sweeper`: 过期兑换券清理
//! - `ride_service` / `user_service` / `catalog_service`: 骑行、用户与目录

pub mod catalog_service;
pub mod dto;
pub mod expiry_sweeper;
pub mod ledger_service;
pub mod redemption_service;
pub mod ride_service;
pub mod settlement_service;
pub mod user_service;

pub use catalog_service::CatalogService;
pub use dto::*;
pub use expiry_sweeper::ExpirySweeper;
pub use ledger_service::LedgerService;
pub use redemption_service::{RedemptionService, generate_voucher_code};
pub use ride_service::RideService;
pub use settlement_service::SettlementService;
pub use user_service::UserService;
