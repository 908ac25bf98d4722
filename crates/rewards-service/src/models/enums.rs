//! 积分服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 兑换券状态
///
/// 状态机只有两条边：`Pending -> Completed`、`Pending -> Expired`。
/// Completed 与 Expired 均为终态，记录永不删除。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum RedemptionStatus {
    /// 待核销 - 已预留积分，等待商户扫码
    #[default]
    Pending,
    /// 已核销 - 积分永久扣除
    Completed,
    /// 已过期 - 预留的积分释放回可用余额
    Expired,
}

impl RedemptionStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }

    /// 该状态下的兑换券是否占用用户积分
    pub fn reserves_points(&self) -> bool {
        matches!(self, Self::Pending | Self::Completed)
    }

    /// 状态迁移是否合法
    pub fn can_transition_to(&self, next: RedemptionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed) | (Self::Pending, Self::Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedemptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            other => Err(format!("未知的兑换状态: {}", other)),
        }
    }
}

/// 单条骑行的同步结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideSyncStatus {
    /// 新入账
    Synced,
    /// 该 workout 已同步过，未重复计分
    AlreadySynced,
}
