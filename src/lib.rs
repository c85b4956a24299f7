//! Canary Vitals - 配置驱动的合成HTTP监控执行器
//!
//! 这是一个用Rust编写的合成监控（canary）执行器，支持：
//! - 声明式HTTP探测配置
//! - 状态码与响应时间断言
//! - 失败重试策略
//! - 结构化日志记录
//!
//! 给定一份探测请求配置，依次发起HTTP请求、对响应评估断言、
//! 按策略重试，最终返回整体成败结论和诊断工件。

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod runner;

// 重新导出主要类型
pub use config::{Assertion, AssertionKind, AssertionOperator, Config, ProbeSpec, RetryPolicy};
pub use error::CanaryVitalsError;
pub use probe::{HttpProber, ProbeOutcome, ProbeReport, Prober, RequestExecutor};
pub use runner::{CanaryRunner, RunVerdict};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
