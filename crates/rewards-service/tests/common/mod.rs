//! 集成测试公共工具
//!
//! 基于内存存储与手动时钟组装完整服务层

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use sykle_rewards::{
    AppState, ManualClock, Repositories, clock::Clock, repository::CatalogRepositoryTrait,
    repository::MemoryStore, service::RideInput,
};
use sykle_shared::config::RedemptionConfig;

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// 写入示例商户与奖励后的服务
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));

        store
            .seed_sample_data(clock.now())
            .await
            .expect("写入示例数据失败");

        let config = RedemptionConfig {
            retry_initial_delay_ms: 1,
            ..RedemptionConfig::default()
        };
        let state = AppState::new(
            Repositories::memory(store.clone()),
            clock.clone(),
            &config,
        );

        Self {
            state,
            store,
            clock,
        }
    }

    /// 创建用户并通过一次骑行入账指定积分
    ///
    /// 积分 = floor(km * 100) + floor(min * 10)，这里用 km 与 min 拼出目标值
    pub async fn user_with_ride(&self, email: &str, distance_km: f64, duration_minutes: f64) -> String {
        let user = self
            .state
            .users
            .create_user(email, Some("Test Rider".to_string()))
            .await
            .expect("创建用户失败")
            .user;

        self.state
            .rides
            .sync_rides(
                &user.id,
                vec![ride(&format!("workout-{}", user.id), distance_km, duration_minutes)],
            )
            .await
            .expect("骑行同步失败");

        user.id
    }

    /// 创建持有整百积分的用户
    pub async fn user_with_points(&self, email: &str, points: i64) -> String {
        assert_eq!(points % 100, 0, "helper 只支持整百积分");
        self.user_with_ride(email, (points / 100) as f64, 0.0).await
    }

    pub async fn available(&self, user_id: &str) -> i64 {
        self.state
            .ledger
            .available_balance(user_id)
            .await
            .expect("查询余额失败")
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }
}

pub fn ride(external_id: &str, distance_km: f64, duration_minutes: f64) -> RideInput {
    let start = Utc::now() - Duration::hours(2);
    RideInput {
        external_id: external_id.to_string(),
        start_date: start,
        end_date: start + Duration::minutes(duration_minutes.ceil() as i64),
        distance_km,
        duration_minutes,
        calories_burned: None,
    }
}
