//! 应用状态定义
//!
//! 包含 Axum 路由共享的服务实例

use std::sync::Arc;

use sqlx::PgPool;
use sykle_shared::config::RedemptionConfig;

use crate::clock::Clock;
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, LedgerRepository, LedgerRepositoryTrait,
    MemoryStore, RideRepository, RideRepositoryTrait, UserRepository, UserRepositoryTrait,
};
use crate::service::{
    CatalogService, ExpirySweeper, LedgerService, RedemptionService, RideService,
    SettlementService, UserService,
};

/// 仓储集合
///
/// PostgreSQL 与内存两种后端都通过 trait 对象注入服务层
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepositoryTrait>,
    pub catalog: Arc<dyn CatalogRepositoryTrait>,
    pub rides: Arc<dyn RideRepositoryTrait>,
    pub ledger: Arc<dyn LedgerRepositoryTrait>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            catalog: Arc::new(CatalogRepository::new(pool.clone())),
            rides: Arc::new(RideRepository::new(pool.clone())),
            ledger: Arc::new(LedgerRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            rides: store.clone(),
            ledger: store,
        }
    }
}

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub rides: Arc<RideService>,
    pub catalog: Arc<CatalogService>,
    pub ledger: Arc<LedgerService>,
    pub redemptions: Arc<RedemptionService>,
    pub settlement: Arc<SettlementService>,
    pub sweeper: Arc<ExpirySweeper>,
}

impl AppState {
    /// 组装服务层
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, config: &RedemptionConfig) -> Self {
        let sweeper = Arc::new(ExpirySweeper::new(repos.ledger.clone(), clock.clone()));
        let ledger = Arc::new(LedgerService::new(repos.ledger.clone(), sweeper.clone()));

        let users = Arc::new(UserService::new(
            repos.users.clone(),
            repos.rides.clone(),
            repos.ledger.clone(),
            ledger.clone(),
            clock.clone(),
        ));
        let rides = Arc::new(RideService::new(
            repos.users.clone(),
            repos.rides.clone(),
            clock.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(repos.catalog.clone()));
        let redemptions = Arc::new(RedemptionService::new(
            repos.users.clone(),
            repos.catalog.clone(),
            repos.ledger.clone(),
            sweeper.clone(),
            clock.clone(),
            config.clone(),
        ));
        let settlement = Arc::new(SettlementService::new(repos.ledger, clock, config));

        Self {
            users,
            rides,
            catalog,
            ledger,
            redemptions,
            settlement,
            sweeper,
        }
    }
}
