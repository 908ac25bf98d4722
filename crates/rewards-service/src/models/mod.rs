//! 积分服务领域模型
//!
//! 包含用户、骑行、商户目录与兑换券的核心实体定义

pub mod catalog;
pub mod enums;
pub mod redemption;
pub mod ride;
pub mod user;

// 重新导出常用类型
pub use catalog::{
    Partner, PartnerSummary, Reward, RewardDetail, RewardFilter, haversine_km, round_tenth,
};
pub use enums::{RedemptionStatus, RideSyncStatus};
pub use redemption::{
    BalanceSnapshot, NewRedemption, Redemption, RedemptionView, ReserveOutcome,
    SettlementOutcome, VoucherDetail,
};
pub use ride::{IngestOutcome, NewRide, Ride, calculate_co2_saved, calculate_points};
pub use user::{NewUser, RedemptionStats, RideStats, User};
