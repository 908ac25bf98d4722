//! 兑换券与余额模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::RedemptionStatus;

/// 兑换券
///
/// pending 状态持有积分预留；completed 永久扣除；expired 释放预留。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    pub partner_id: String,
    /// 签发时的奖励价格快照，之后奖励改价不影响已签发的券
    pub points_spent: i64,
    pub code: String,
    pub status: RedemptionStatus,
    pub expires_at: DateTime<Utc>,
    #[sqlx(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Redemption {
    /// 严格晚于过期时间才算过期
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 是否为可以被清理的过期 pending 券
    pub fn is_stale_pending(&self, now: DateTime<Utc>) -> bool {
        self.status == RedemptionStatus::Pending && self.is_past_expiry(now)
    }
}

/// 待签发的兑换券
#[derive(Debug, Clone)]
pub struct NewRedemption {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    pub partner_id: String,
    pub points_spent: i64,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewRedemption {
    pub fn into_redemption(self) -> Redemption {
        Redemption {
            id: self.id,
            user_id: self.user_id,
            reward_id: self.reward_id,
            partner_id: self.partner_id,
            points_spent: self.points_spent,
            code: self.code,
            status: RedemptionStatus::Pending,
            expires_at: self.expires_at,
            redeemed_at: None,
            created_at: self.created_at,
        }
    }
}

/// 兑换记录列表项（附带奖励与商户名称）
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub redemption: Redemption,
    pub reward_name: String,
    #[sqlx(default)]
    pub reward_description: Option<String>,
    pub partner_name: String,
}

/// 核销时读取的兑换券详情
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct VoucherDetail {
    #[sqlx(flatten)]
    pub redemption: Redemption,
    pub reward_name: String,
    #[sqlx(default)]
    pub user_name: Option<String>,
    pub user_email: String,
}

impl VoucherDetail {
    pub fn redeemer_display_name(&self) -> String {
        match self.user_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => self.user_email.clone(),
        }
    }
}

/// 余额快照
///
/// 同一次读取得到的累计积分与预留积分，保证 `available` 一致。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    /// 历史累计获得积分
    pub total_earned: i64,
    /// pending + completed 兑换券占用的积分
    pub reserved: i64,
}

impl BalanceSnapshot {
    pub fn new(total_earned: i64, reserved: i64) -> Self {
        Self {
            total_earned,
            reserved,
        }
    }

    /// 可用积分
    pub fn available(&self) -> i64 {
        self.total_earned - self.reserved
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.available() >= cost
    }

    /// 预留 `cost` 之后的快照
    pub fn after_reserving(&self, cost: i64) -> Self {
        Self::new(self.total_earned, self.reserved + cost)
    }
}

/// 原子预留的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    /// 签发成功，balance 为签发后的余额
    Reserved {
        redemption: Redemption,
        balance: BalanceSnapshot,
    },
    /// 可用积分不足，没有任何写入
    Insufficient { balance: BalanceSnapshot },
}

/// 商户核销结果
///
/// 除成功外的每一种结果都是"预期内的拒绝"，不是错误。
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    Success {
        redemption_id: String,
        reward_name: String,
        points_spent: i64,
        redeemer: String,
        redeemed_at: DateTime<Utc>,
    },
    /// 兑换码不存在
    InvalidCode,
    /// 兑换券不属于当前商户
    WrongLocation,
    /// 已经核销过
    AlreadyUsed { used_at: Option<DateTime<Utc>> },
    /// 已过期（本次核销可能顺带把它标记为 expired）
    Expired { expires_at: DateTime<Utc> },
}

impl SettlementOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// 指标标签与响应错误码使用的结果名
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::InvalidCode => "invalid_code",
            Self::WrongLocation => "wrong_location",
            Self::AlreadyUsed { .. } => "already_used",
            Self::Expired { .. } => "expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending(expires_at: DateTime<Utc>) -> Redemption {
        NewRedemption {
            id: "r-1".to_string(),
            user_id: "u-1".to_string(),
            reward_id: "w-1".to_string(),
            partner_id: "p-1".to_string(),
            points_spent: 300,
            code: "SYKLE-AAAA".to_string(),
            expires_at,
            created_at: expires_at - Duration::minutes(15),
        }
        .into_redemption()
    }

    #[test]
    fn test_expiry_is_strictly_after_deadline() {
        let deadline = Utc::now();
        let voucher = pending(deadline);

        assert!(!voucher.is_past_expiry(deadline));
        assert!(voucher.is_past_expiry(deadline + Duration::milliseconds(1)));
        assert!(voucher.is_stale_pending(deadline + Duration::seconds(1)));
    }

    #[test]
    fn test_balance_snapshot() {
        let balance = BalanceSnapshot::new(1000, 750);
        assert_eq!(balance.available(), 250);
        assert!(balance.can_afford(250));
        assert!(!balance.can_afford(251));

        let after = BalanceSnapshot::new(1000, 0).after_reserving(750);
        assert_eq!(after, balance);
    }

    #[test]
    fn test_settlement_labels() {
        assert_eq!(SettlementOutcome::InvalidCode.label(), "invalid_code");
        assert_eq!(
            SettlementOutcome::AlreadyUsed { used_at: None }.label(),
            "already_used"
        );
        assert!(!SettlementOutcome::WrongLocation.is_success());
    }
}
