//! satsvault - BTC 地址托管后端
//!
//! 派生并跟踪用户的 Bitcoin 地址，链上托管与余额查询委托给
//! Bitnob 支付服务商，钱包/地址/交易记录落在本地关系库

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod repository;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::AppError;
