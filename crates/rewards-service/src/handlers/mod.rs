//! HTTP 请求处理器模块

pub mod catalog;
pub mod redemption;
pub mod ride;
pub mod user;
