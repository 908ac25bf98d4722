//! 内存存储
//!
//! 单个 `parking_lot::Mutex` 保护全部状态，每个仓储方法在一次加锁内完成，
//! 因此签发和状态迁移与 PostgreSQL 实现一样是原子的。
//! 适用于本地开发（`storage.backend = "memory"`）和测试。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::sample_data::{sample_partners, sample_rewards};
use super::traits::{
    CatalogRepositoryTrait, LedgerRepositoryTrait, RideRepositoryTrait, UserRepositoryTrait,
};
use crate::error::{Result, RewardsError};
use crate::models::{
    BalanceSnapshot, IngestOutcome, NewRedemption, NewRide, NewUser, Partner, PartnerSummary,
    Redemption, RedemptionStats, RedemptionStatus, RedemptionView, ReserveOutcome, Reward,
    RewardDetail, RewardFilter, Ride, RideStats, User, VoucherDetail,
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, User>,
    rides: HashMap<String, Ride>,
    /// external_id -> ride id
    ride_keys: HashMap<String, String>,
    partners: HashMap<String, Partner>,
    rewards: HashMap<String, Reward>,
    /// 按签发顺序追加，永不删除
    redemptions: Vec<Redemption>,
}

impl MemoryState {
    fn reserved_points(&self, user_id: &str) -> i64 {
        self.redemptions
            .iter()
            .filter(|r| r.user_id == user_id && r.status.reserves_points())
            .map(|r| r.points_spent)
            .sum()
    }

    fn expire_stale_for_user(&mut self, user_id: &str, now: DateTime<Utc>) -> u64 {
        let mut expired = 0;
        for redemption in self
            .redemptions
            .iter_mut()
            .filter(|r| r.user_id == user_id && r.is_stale_pending(now))
        {
            redemption.status = RedemptionStatus::Expired;
            expired += 1;
        }
        expired
    }

    fn reward_detail(&self, reward: &Reward) -> Option<RewardDetail> {
        let partner = self.partners.get(&reward.partner_id)?;
        Some(RewardDetail {
            reward: reward.clone(),
            partner_name: partner.name.clone(),
            partner_address: partner.address.clone(),
            partner_latitude: partner.latitude,
            partner_longitude: partner.longitude,
            partner_active: partner.is_active,
        })
    }
}

/// 内存仓储，同时实现全部四个仓储接口
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入商户（覆盖同 id）
    pub fn upsert_partner(&self, partner: Partner) {
        self.state.lock().partners.insert(partner.id.clone(), partner);
    }

    /// 直接写入奖励（覆盖同 id）
    pub fn upsert_reward(&self, reward: Reward) {
        self.state.lock().rewards.insert(reward.id.clone(), reward);
    }

    /// 兑换券总数（含全部状态）
    pub fn redemption_count(&self) -> usize {
        self.state.lock().redemptions.len()
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.state.lock().users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock();
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<(User, bool)> {
        let mut state = self.state.lock();

        if let Some(existing) = state.users.values().find(|u| u.email == user.email) {
            return Ok((existing.clone(), false));
        }

        let created = User {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            total_points: 0,
            total_distance_km: 0.0,
            total_co2_saved_g: 0.0,
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        state.users.insert(created.id.clone(), created.clone());

        Ok((created, true))
    }

    async fn update_name(
        &self,
        id: &str,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let mut state = self.state.lock();
        let Some(user) = state.users.get_mut(id) else {
            return Ok(None);
        };

        if let Some(name) = name {
            user.name = Some(name);
        }
        user.updated_at = now;

        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl CatalogRepositoryTrait for MemoryStore {
    async fn list_partners(&self, category: Option<String>) -> Result<Vec<PartnerSummary>> {
        let state = self.state.lock();

        let mut partners: Vec<PartnerSummary> = state
            .partners
            .values()
            .filter(|p| p.is_active)
            .filter(|p| category.as_deref().is_none_or(|c| p.category == c))
            .map(|p| PartnerSummary {
                partner: p.clone(),
                reward_count: state
                    .rewards
                    .values()
                    .filter(|w| w.partner_id == p.id && w.is_active)
                    .count() as i64,
                distance_km: None,
            })
            .collect();
        partners.sort_by(|a, b| a.partner.name.cmp(&b.partner.name));

        Ok(partners)
    }

    async fn get_partner(&self, id: &str) -> Result<Option<Partner>> {
        Ok(self.state.lock().partners.get(id).cloned())
    }

    async fn list_partner_rewards(&self, partner_id: &str) -> Result<Vec<Reward>> {
        let state = self.state.lock();

        let mut rewards: Vec<Reward> = state
            .rewards
            .values()
            .filter(|w| w.partner_id == partner_id && w.is_active)
            .cloned()
            .collect();
        rewards.sort_by(|a, b| a.points_cost.cmp(&b.points_cost).then(a.id.cmp(&b.id)));

        Ok(rewards)
    }

    async fn list_rewards(&self, filter: RewardFilter) -> Result<Vec<RewardDetail>> {
        let state = self.state.lock();

        let mut rewards: Vec<RewardDetail> = state
            .rewards
            .values()
            .filter(|w| filter.max_points.is_none_or(|max| w.points_cost <= max))
            .filter_map(|w| state.reward_detail(w))
            .filter(|d| d.is_redeemable())
            .filter(|d| {
                filter.category.as_deref().is_none_or(|c| {
                    state
                        .partners
                        .get(&d.reward.partner_id)
                        .is_some_and(|p| p.category == c)
                })
            })
            .collect();
        rewards.sort_by(|a, b| {
            a.reward
                .points_cost
                .cmp(&b.reward.points_cost)
                .then(a.reward.id.cmp(&b.reward.id))
        });

        Ok(rewards)
    }

    async fn get_reward(&self, id: &str) -> Result<Option<RewardDetail>> {
        let state = self.state.lock();
        Ok(state.rewards.get(id).and_then(|w| state.reward_detail(w)))
    }

    async fn seed_sample_data(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock();
        if !state.partners.is_empty() {
            return Ok(0);
        }

        let partners = sample_partners(now);
        let inserted = partners.len() as u64;
        for partner in partners {
            state.partners.insert(partner.id.clone(), partner);
        }
        for reward in sample_rewards(now) {
            state.rewards.insert(reward.id.clone(), reward);
        }

        Ok(inserted)
    }
}

#[async_trait]
impl RideRepositoryTrait for MemoryStore {
    async fn ingest_ride(&self, ride: &NewRide) -> Result<IngestOutcome> {
        let mut state = self.state.lock();

        if !state.users.contains_key(&ride.user_id) {
            return Err(RewardsError::UserNotFound(ride.user_id.clone()));
        }
        if state.ride_keys.contains_key(&ride.external_id) {
            return Ok(IngestOutcome::AlreadySynced);
        }

        let saved = ride.clone().into_ride();
        state
            .ride_keys
            .insert(saved.external_id.clone(), saved.id.clone());
        state.rides.insert(saved.id.clone(), saved.clone());

        if let Some(user) = state.users.get_mut(&saved.user_id) {
            user.total_points = user.total_points.saturating_add(saved.points_earned);
            user.total_distance_km += saved.distance_km;
            user.total_co2_saved_g += saved.co2_saved_g;
            user.updated_at = saved.synced_at;
        }

        Ok(IngestOutcome::Synced(saved))
    }

    async fn list_rides(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Ride>> {
        let state = self.state.lock();

        let mut rides: Vec<Ride> = state
            .rides
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));

        Ok(rides
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_rides(&self, user_id: &str) -> Result<i64> {
        let state = self.state.lock();
        Ok(state.rides.values().filter(|r| r.user_id == user_id).count() as i64)
    }

    async fn get_ride(&self, id: &str) -> Result<Option<Ride>> {
        Ok(self.state.lock().rides.get(id).cloned())
    }

    async fn ride_stats(&self, user_id: &str) -> Result<RideStats> {
        let state = self.state.lock();

        let stats = state
            .rides
            .values()
            .filter(|r| r.user_id == user_id)
            .fold(RideStats::default(), |mut acc, r| {
                acc.total_rides += 1;
                acc.total_distance_km += r.distance_km;
                acc.total_duration_minutes += r.duration_minutes;
                acc.total_points += r.points_earned;
                acc.total_co2_saved_g += r.co2_saved_g;
                acc
            });

        Ok(stats)
    }
}

#[async_trait]
impl LedgerRepositoryTrait for MemoryStore {
    async fn balance_snapshot(&self, user_id: &str) -> Result<Option<BalanceSnapshot>> {
        let state = self.state.lock();
        Ok(state
            .users
            .get(user_id)
            .map(|u| BalanceSnapshot::new(u.total_points, state.reserved_points(user_id))))
    }

    async fn reserve_voucher(
        &self,
        voucher: &NewRedemption,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome> {
        let mut state = self.state.lock();

        let Some(total_earned) = state.users.get(&voucher.user_id).map(|u| u.total_points) else {
            return Err(RewardsError::UserNotFound(voucher.user_id.clone()));
        };

        state.expire_stale_for_user(&voucher.user_id, now);

        let balance = BalanceSnapshot::new(total_earned, state.reserved_points(&voucher.user_id));
        if !balance.can_afford(voucher.points_spent) {
            return Ok(ReserveOutcome::Insufficient { balance });
        }

        if state.redemptions.iter().any(|r| r.code == voucher.code) {
            return Err(RewardsError::DuplicateVoucherCode(voucher.code.clone()));
        }

        let redemption = voucher.clone().into_redemption();
        state.redemptions.push(redemption.clone());

        Ok(ReserveOutcome::Reserved {
            redemption,
            balance: balance.after_reserving(voucher.points_spent),
        })
    }

    async fn find_voucher_by_code(&self, code: &str) -> Result<Option<VoucherDetail>> {
        let state = self.state.lock();

        let Some(redemption) = state.redemptions.iter().find(|r| r.code == code) else {
            return Ok(None);
        };
        let reward_name = state
            .rewards
            .get(&redemption.reward_id)
            .map(|w| w.name.clone())
            .unwrap_or_default();
        let (user_name, user_email) = state
            .users
            .get(&redemption.user_id)
            .map(|u| (u.name.clone(), u.email.clone()))
            .unwrap_or_default();

        Ok(Some(VoucherDetail {
            redemption: redemption.clone(),
            reward_name,
            user_name,
            user_email,
        }))
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: RedemptionStatus,
        next: RedemptionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if !expected.can_transition_to(next) {
            return Err(RewardsError::Internal(format!(
                "非法的兑换状态迁移: {} -> {}",
                expected, next
            )));
        }

        let mut state = self.state.lock();
        let Some(redemption) = state.redemptions.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if redemption.status != expected {
            return Ok(false);
        }

        match next {
            RedemptionStatus::Completed if !redemption.is_past_expiry(at) => {
                redemption.status = RedemptionStatus::Completed;
                redemption.redeemed_at = Some(at);
                Ok(true)
            }
            RedemptionStatus::Expired if redemption.is_past_expiry(at) => {
                redemption.status = RedemptionStatus::Expired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_stale_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64> {
        Ok(self.state.lock().expire_stale_for_user(user_id, now))
    }

    async fn expire_stale(&self, now: DateTime<Utc>, batch_size: i64) -> Result<u64> {
        let mut state = self.state.lock();
        let limit = batch_size.max(0) as usize;

        let mut stale: Vec<&mut Redemption> = state
            .redemptions
            .iter_mut()
            .filter(|r| r.is_stale_pending(now))
            .collect();
        stale.sort_by_key(|r| r.expires_at);

        let mut expired = 0;
        for redemption in stale.into_iter().take(limit) {
            redemption.status = RedemptionStatus::Expired;
            expired += 1;
        }

        Ok(expired)
    }

    async fn list_vouchers(
        &self,
        user_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<RedemptionView>> {
        let state = self.state.lock();

        let mut vouchers: Vec<RedemptionView> = state
            .redemptions
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| {
                let reward = state.rewards.get(&r.reward_id);
                RedemptionView {
                    redemption: r.clone(),
                    reward_name: reward.map(|w| w.name.clone()).unwrap_or_default(),
                    reward_description: reward.and_then(|w| w.description.clone()),
                    partner_name: state
                        .partners
                        .get(&r.partner_id)
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                }
            })
            .collect();
        // Vec 按签发顺序追加，倒序即最新在前
        vouchers.reverse();
        vouchers.sort_by(|a, b| b.redemption.created_at.cmp(&a.redemption.created_at));

        Ok(vouchers)
    }

    async fn redemption_stats(&self, user_id: &str) -> Result<RedemptionStats> {
        let state = self.state.lock();

        let stats = state
            .redemptions
            .iter()
            .filter(|r| r.user_id == user_id && r.status.reserves_points())
            .fold(RedemptionStats::default(), |mut acc, r| {
                acc.total_redemptions += 1;
                acc.total_points_spent += r.points_spent;
                acc
            });

        Ok(stats)
    }
}
