//! 仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 需要原子性的操作（签发预留、状态迁移、骑行入账）在仓储内部完成
//! - PostgreSQL 与内存实现遵循同一组 trait，服务层只依赖 trait
//! - 定义 trait 接口以支持 mock 测试

mod catalog_repo;
mod ledger_repo;
mod memory_store;
mod ride_repo;
mod sample_data;
mod traits;
mod user_repo;

pub use catalog_repo::CatalogRepository;
pub use ledger_repo::LedgerRepository;
pub use memory_store::MemoryStore;
pub use ride_repo::RideRepository;
pub use sample_data::{sample_partners, sample_rewards};
pub use traits::*;
pub use user_repo::UserRepository;
