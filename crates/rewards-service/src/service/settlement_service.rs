//! 兑换券核销服务
//!
//! 商户扫码后调用，是兑换券状态迁移的唯一入口。校验按顺序执行，首个失败即返回：
//!
//! 1. 兑换码不存在 -> `InvalidCode`
//! 2. 商户不匹配 -> `WrongLocation`
//! 3. 已核销 -> `AlreadyUsed`（附带核销时间）
//! 4. 已过期或 `now > expires_at` -> 标记为 expired，返回 `Expired`
//! 5. 否则 pending -> completed，返回 `Success`
//!
//! 状态迁移使用比较并迁移；同一兑换码被并发扫描时只有一次能成功，
//! 其余调用重新读取后观察到 `AlreadyUsed`。

use std::sync::Arc;

use sykle_shared::config::RedemptionConfig;
use sykle_shared::observability::metrics;
use sykle_shared::retry::{RetryPolicy, retry_with_policy};
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::error::{Result, RewardsError};
use crate::models::{RedemptionStatus, SettlementOutcome};
use crate::repository::LedgerRepositoryTrait;

pub struct SettlementService {
    ledger: Arc<dyn LedgerRepositoryTrait>,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
}

impl SettlementService {
    pub fn new(
        ledger: Arc<dyn LedgerRepositoryTrait>,
        clock: Arc<dyn Clock>,
        config: &RedemptionConfig,
    ) -> Self {
        Self {
            ledger,
            clock,
            retry_policy: RetryPolicy::conflict(
                config.max_conflict_retries,
                config.retry_initial_delay_ms,
            ),
        }
    }

    /// 校验并核销兑换码
    ///
    /// 业务拒绝以 `SettlementOutcome` 返回而不是错误；只有存储故障或重试耗尽的并发冲突才返回 `Err`。
    #[instrument(skip(self), fields(partner_id = %partner_id))]
    pub async fn verify_and_settle(&self, code: &str, partner_id: &str) -> Result<SettlementOutcome> {
        let code = code.trim();
        let partner_id = partner_id.trim();
        if code.is_empty() || partner_id.is_empty() {
            return Err(RewardsError::Validation(
                "qrCode 和 partnerId 不能为空".to_string(),
            ));
        }

        let outcome = retry_with_policy(
            &self.retry_policy,
            "verify_and_settle",
            RewardsError::is_retryable,
            || self.try_settle(code, partner_id),
        )
        .await?;

        metrics::record_settlement(outcome.label());
        match &outcome {
            SettlementOutcome::Success {
                redemption_id,
                points_spent,
                ..
            } => info!(
                redemption_id = %redemption_id,
                points_spent = *points_spent,
                "兑换券核销成功"
            ),
            other => warn!(outcome = other.label(), "兑换券核销被拒绝"),
        }

        Ok(outcome)
    }

    /// 单次核销尝试
    ///
    /// 比较并迁移失败说明其他调用抢先改变了状态，返回 `ConcurrencyConflict` 由外层重新读取
    async fn try_settle(&self, code: &str, partner_id: &str) -> Result<SettlementOutcome> {
        let now = self.clock.now();

        // 1. 兑换码
        let Some(voucher) = self.ledger.find_voucher_by_code(code).await? else {
            return Ok(SettlementOutcome::InvalidCode);
        };
        let redemption = &voucher.redemption;

        // 2. 商户
        if redemption.partner_id != partner_id {
            return Ok(SettlementOutcome::WrongLocation);
        }

        match redemption.status {
            // 3. 已核销
            RedemptionStatus::Completed => Ok(SettlementOutcome::AlreadyUsed {
                used_at: redemption.redeemed_at,
            }),

            // 4. 已过期
            RedemptionStatus::Expired => Ok(SettlementOutcome::Expired {
                expires_at: redemption.expires_at,
            }),
            RedemptionStatus::Pending if redemption.is_past_expiry(now) => {
                let expired = self
                    .ledger
                    .compare_and_set_status(
                        &redemption.id,
                        RedemptionStatus::Pending,
                        RedemptionStatus::Expired,
                        now,
                    )
                    .await?;
                if !expired {
                    return Err(RewardsError::ConcurrencyConflict);
                }
                metrics::record_vouchers_expired("settlement", 1);
                Ok(SettlementOutcome::Expired {
                    expires_at: redemption.expires_at,
                })
            }

            // 5. 核销
            RedemptionStatus::Pending => {
                let completed = self
                    .ledger
                    .compare_and_set_status(
                        &redemption.id,
                        RedemptionStatus::Pending,
                        RedemptionStatus::Completed,
                        now,
                    )
                    .await?;
                if !completed {
                    return Err(RewardsError::ConcurrencyConflict);
                }
                Ok(SettlementOutcome::Success {
                    redemption_id: redemption.id.clone(),
                    reward_name: voucher.reward_name.clone(),
                    points_spent: redemption.points_spent,
                    redeemer: voucher.redeemer_display_name(),
                    redeemed_at: now,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Redemption, VoucherDetail};
    use crate::repository::MockLedgerRepositoryTrait;
    use chrono::{DateTime, Duration, Utc};
    use mockall::predicate::*;

    fn voucher(status: RedemptionStatus, expires_at: DateTime<Utc>) -> VoucherDetail {
        VoucherDetail {
            redemption: Redemption {
                id: "r-1".to_string(),
                user_id: "u-1".to_string(),
                reward_id: "reward-2".to_string(),
                partner_id: "partner-1".to_string(),
                points_spent: 750,
                code: "SYKLE-ABCDEFGHJKLM".to_string(),
                status,
                expires_at,
                redeemed_at: match status {
                    RedemptionStatus::Completed => Some(expires_at - Duration::minutes(5)),
                    _ => None,
                },
                created_at: expires_at - Duration::minutes(15),
            },
            reward_name: "Pastry of the Day".to_string(),
            user_name: Some("Ada".to_string()),
            user_email: "ada@example.com".to_string(),
        }
    }

    fn service(ledger: MockLedgerRepositoryTrait, clock: Arc<ManualClock>) -> SettlementService {
        let config = RedemptionConfig {
            retry_initial_delay_ms: 1,
            ..RedemptionConfig::default()
        };
        SettlementService::new(Arc::new(ledger), clock, &config)
    }

    #[tokio::test]
    async fn test_unknown_code_is_invalid() {
        let mut ledger = MockLedgerRepositoryTrait::new();
        ledger.expect_find_voucher_by_code().returning(|_| Ok(None));

        let outcome = service(ledger, Arc::new(ManualClock::default()))
            .verify_and_settle("SYKLE-NOPE", "partner-1")
            .await
            .unwrap();
        assert_eq!(outcome, SettlementOutcome::InvalidCode);
    }

    #[tokio::test]
    async fn test_wrong_partner_wins_over_status() {
        let now = Utc::now();
        let mut ledger = MockLedgerRepositoryTrait::new();
        // 已核销且已过期，但商户不匹配优先
        ledger
            .expect_find_voucher_by_code()
            .returning(move |_| Ok(Some(voucher(RedemptionStatus::Completed, now - Duration::hours(1)))));
        ledger.expect_compare_and_set_status().never();

        let outcome = service(ledger, Arc::new(ManualClock::new(now)))
            .verify_and_settle("SYKLE-ABCDEFGHJKLM", "partner-2")
            .await
            .unwrap();
        assert_eq!(outcome, SettlementOutcome::WrongLocation);
    }

    #[tokio::test]
    async fn test_already_used_reports_redeemed_at() {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(10);
        let mut ledger = MockLedgerRepositoryTrait::new();
        ledger
            .expect_find_voucher_by_code()
            .returning(move |_| Ok(Some(voucher(RedemptionStatus::Completed, expires_at))));

        let outcome = service(ledger, Arc::new(ManualClock::new(now)))
            .verify_and_settle("SYKLE-ABCDEFGHJKLM", "partner-1")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::AlreadyUsed {
                used_at: Some(expires_at - Duration::minutes(5))
            }
        );
    }

    #[tokio::test]
    async fn test_unswept_past_expiry_is_expired() {
        let now = Utc::now();
        let expires_at = now - Duration::seconds(1);
        let mut ledger = MockLedgerRepositoryTrait::new();
        ledger
            .expect_find_voucher_by_code()
            .returning(move |_| Ok(Some(voucher(RedemptionStatus::Pending, expires_at))));
        ledger
            .expect_compare_and_set_status()
            .with(
                eq("r-1"),
                eq(RedemptionStatus::Pending),
                eq(RedemptionStatus::Expired),
                eq(now),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let outcome = service(ledger, Arc::new(ManualClock::new(now)))
            .verify_and_settle("SYKLE-ABCDEFGHJKLM", "partner-1")
            .await
            .unwrap();
        assert_eq!(outcome, SettlementOutcome::Expired { expires_at });
    }

    #[tokio::test]
    async fn test_pending_voucher_settles() {
        let now = Utc::now();
        let mut ledger = MockLedgerRepositoryTrait::new();
        ledger.expect_find_voucher_by_code().returning(move |_| {
            Ok(Some(voucher(
                RedemptionStatus::Pending,
                now + Duration::minutes(10),
            )))
        });
        ledger
            .expect_compare_and_set_status()
            .with(
                eq("r-1"),
                eq(RedemptionStatus::Pending),
                eq(RedemptionStatus::Completed),
                eq(now),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let outcome = service(ledger, Arc::new(ManualClock::new(now)))
            .verify_and_settle(" SYKLE-ABCDEFGHJKLM ", "partner-1")
            .await
            .unwrap();

        match outcome {
            SettlementOutcome::Success {
                reward_name,
                points_spent,
                redeemer,
                redeemed_at,
                ..
            } => {
                assert_eq!(reward_name, "Pastry of the Day");
                assert_eq!(points_spent, 750);
                assert_eq!(redeemer, "Ada");
                assert_eq!(redeemed_at, now);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lost_race_rereads_and_reports_already_used() {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(10);

        let mut ledger = MockLedgerRepositoryTrait::new();
        let mut seq = mockall::Sequence::new();
        ledger
            .expect_find_voucher_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(voucher(RedemptionStatus::Pending, expires_at))));
        ledger
            .expect_compare_and_set_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(false));
        ledger
            .expect_find_voucher_by_code()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(voucher(RedemptionStatus::Completed, expires_at))));

        let outcome = service(ledger, Arc::new(ManualClock::new(now)))
            .verify_and_settle("SYKLE-ABCDEFGHJKLM", "partner-1")
            .await
            .unwrap();
        assert!(matches!(outcome, SettlementOutcome::AlreadyUsed { .. }));
    }

    #[tokio::test]
    async fn test_blank_input_is_validation_error() {
        let err = service(
            MockLedgerRepositoryTrait::new(),
            Arc::new(ManualClock::default()),
        )
        .verify_and_settle("", "partner-1")
        .await
        .unwrap_err();
        assert!(matches!(err, RewardsError::Validation(_)));
    }
}
