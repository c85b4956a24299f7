//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Canary Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum CanaryVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测请求相关错误
    #[error("探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// 断言评估相关错误
    #[error("断言错误: {0}")]
    Assertion(#[from] AssertionError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 探测错误类型
///
/// 覆盖一次HTTP探测中的传输层失败（连接、DNS、TLS、超时等）。
/// HTTP错误状态码（4xx/5xx）不属于此类错误，由断言评估处理。
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP请求错误（连接、DNS、TLS等传输层失败）
    #[error("HTTP请求失败: {0}")]
    RequestError(#[from] reqwest::Error),

    /// 超时错误
    #[error("请求超时")]
    Timeout,

    /// 无效的HTTP方法
    #[error("无效的HTTP方法: {method}")]
    InvalidMethod { method: String },

    /// 响应体解码错误（非UTF-8响应视为传输层失败）
    #[error("响应体解码失败: {0}")]
    Decode(String),
}

/// 断言错误类型
#[derive(Error, Debug)]
pub enum AssertionError {
    /// 不支持的比较操作符
    #[error("不支持的断言操作符: {operator}")]
    UnsupportedOperator { operator: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, CanaryVitalsError>;
