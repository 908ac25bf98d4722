//! 用户服务

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreatedUser, UserStats};
use super::ledger_service::LedgerService;
use crate::clock::Clock;
use crate::error::{Result, RewardsError};
use crate::models::{NewUser, User, round_tenth};
use crate::repository::{LedgerRepositoryTrait, RideRepositoryTrait, UserRepositoryTrait};

pub struct UserService {
    users: Arc<dyn UserRepositoryTrait>,
    rides: Arc<dyn RideRepositoryTrait>,
    ledger: Arc<dyn LedgerRepositoryTrait>,
    ledger_service: Arc<LedgerService>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepositoryTrait>,
        rides: Arc<dyn RideRepositoryTrait>,
        ledger: Arc<dyn LedgerRepositoryTrait>,
        ledger_service: Arc<LedgerService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            rides,
            ledger,
            ledger_service,
            clock,
        }
    }

    /// 创建用户
    ///
    /// 邮箱已注册时返回已有用户，`created = false`
    #[instrument(skip(self, name))]
    pub async fn create_user(&self, email: &str, name: Option<String>) -> Result<CreatedUser> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(RewardsError::Validation("邮箱格式不正确".to_string()));
        }
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let new_user = NewUser {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name,
            created_at: self.clock.now(),
        };
        let (user, created) = self.users.create_user(&new_user).await?;

        if created {
            info!(user_id = %user.id, "用户创建成功");
        }

        Ok(CreatedUser { user, created })
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| RewardsError::UserNotFound(id.to_string()))
    }

    /// 更新昵称，未提供时保留原值
    #[instrument(skip(self, name))]
    pub async fn update_user(&self, id: &str, name: Option<String>) -> Result<User> {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        self.users
            .update_name(id, name, self.clock.now())
            .await?
            .ok_or_else(|| RewardsError::UserNotFound(id.to_string()))
    }

    /// 用户统计
    #[instrument(skip(self))]
    pub async fn get_user_stats(&self, id: &str) -> Result<UserStats> {
        let user = self.get_user(id).await?;

        let available_points = self.ledger_service.available_balance(id).await?;
        let ride_stats = self.rides.ride_stats(id).await?;
        let redemption_stats = self.ledger.redemption_stats(id).await?;

        Ok(UserStats {
            total_points: user.total_points,
            available_points,
            total_rides: ride_stats.total_rides,
            total_distance_km: round_tenth(ride_stats.total_distance_km),
            total_duration_minutes: ride_stats.total_duration_minutes,
            total_co2_saved_g: ride_stats.total_co2_saved_g.round() as i64,
            total_redemptions: redemption_stats.total_redemptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{BalanceSnapshot, RedemptionStats, RideStats};
    use crate::repository::{
        MockLedgerRepositoryTrait, MockRideRepositoryTrait, MockUserRepositoryTrait,
    };
    use crate::service::ExpirySweeper;
    use chrono::Utc;

    fn user(name: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: "u-1".to_string(),
            email: "rider@example.com".to_string(),
            name: name.map(String::from),
            total_points: 1200,
            total_distance_km: 12.34,
            total_co2_saved_g: 1851.0,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(
        users: MockUserRepositoryTrait,
        rides: MockRideRepositoryTrait,
        ledger: MockLedgerRepositoryTrait,
    ) -> UserService {
        let clock = Arc::new(ManualClock::default());
        let ledger: Arc<dyn LedgerRepositoryTrait> = Arc::new(ledger);
        let sweeper = Arc::new(ExpirySweeper::new(ledger.clone(), clock.clone()));
        let ledger_service = Arc::new(LedgerService::new(ledger.clone(), sweeper));
        UserService::new(Arc::new(users), Arc::new(rides), ledger, ledger_service, clock)
    }

    #[tokio::test]
    async fn test_create_user_requires_at_sign() {
        let mut users = MockUserRepositoryTrait::new();
        users.expect_create_user().never();

        let err = service(
            users,
            MockRideRepositoryTrait::new(),
            MockLedgerRepositoryTrait::new(),
        )
        .create_user("not-an-email", None)
        .await
        .unwrap_err();
        assert!(matches!(err, RewardsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_user_reports_existing() {
        let mut users = MockUserRepositoryTrait::new();
        users
            .expect_create_user()
            .returning(|_| Ok((user(Some("Ada")), false)));

        let created = service(
            users,
            MockRideRepositoryTrait::new(),
            MockLedgerRepositoryTrait::new(),
        )
        .create_user(" rider@example.com ", Some("  ".to_string()))
        .await
        .unwrap();
        assert!(!created.created);
        assert_eq!(created.user.id, "u-1");
    }

    #[tokio::test]
    async fn test_user_stats_combines_ledger_and_rides() {
        let mut users = MockUserRepositoryTrait::new();
        users.expect_get_user().returning(|_| Ok(Some(user(None))));

        let mut rides = MockRideRepositoryTrait::new();
        rides.expect_ride_stats().returning(|_| {
            Ok(RideStats {
                total_rides: 3,
                total_distance_km: 12.34,
                total_duration_minutes: 55.0,
                total_points: 1200,
                total_co2_saved_g: 1851.0,
            })
        });

        let mut ledger = MockLedgerRepositoryTrait::new();
        ledger.expect_expire_stale_for_user().returning(|_, _| Ok(0));
        ledger
            .expect_balance_snapshot()
            .returning(|_| Ok(Some(BalanceSnapshot::new(1200, 500))));
        ledger.expect_redemption_stats().returning(|_| {
            Ok(RedemptionStats {
                total_redemptions: 1,
                total_points_spent: 500,
            })
        });

        let stats = service(users, rides, ledger)
            .get_user_stats("u-1")
            .await
            .unwrap();

        assert_eq!(stats.total_points, 1200);
        assert_eq!(stats.available_points, 700);
        assert_eq!(stats.total_rides, 3);
        assert!((stats.total_distance_km - 12.3).abs() < 1e-9);
        assert_eq!(stats.total_co2_saved_g, 1851);
        assert_eq!(stats.total_redemptions, 1);
    }
}
