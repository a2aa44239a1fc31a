//! NanoMail 客户端数据一致性核心
//!
//! 先缓存后刷新的邮件数据读取、跨标签页认证同步、单飞 Token 刷新与推送驱动的缓存失效。

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod mail;
pub mod store;
pub mod sync;
pub mod transport;
pub mod utils;

pub use client::{Origin, Tab};
pub use transport::ApiError;
