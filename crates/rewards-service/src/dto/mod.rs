//! HTTP DTO 模块
//!
//! 包含所有请求和响应的数据传输对象

pub mod request;
pub mod response;

pub use request::{
    CreateUserRequest, PartnerListParams, RedeemRequest, RedemptionListParams, RewardListParams,
    RideListParams, SyncRidesRequest, UpdateUserRequest, VerifyRequest,
};
pub use response::{ApiResponse, ServiceInfo, VerifyResponse};
