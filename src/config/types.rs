//! 配置数据结构定义
//!
//! 定义探测请求的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 主配置结构，包含所有待执行的探测请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 探测请求列表，按声明顺序依次执行
    pub requests: Vec<ProbeSpec>,
}

/// 单个探测请求的声明式定义
///
/// 必须指定 `url` 或 `script` 中的至少一个目标。
/// 验证通过后视为不可变，执行器只读。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeSpec {
    /// 探测目标URL
    pub url: Option<String>,
    /// 脚本目标（暂未实现，执行时总是失败并告警）
    pub script: Option<String>,
    /// HTTP方法
    #[serde(default = "default_method")]
    pub method: String,
    /// 请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 请求体（POST/PUT请求必需）
    pub body: Option<String>,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// 断言列表，全部通过时该次尝试才算成功
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    /// 重试策略
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// 断言类型枚举
///
/// URL探测只识别状态码和响应时间两种断言，
/// 未识别的类型在评估时跳过并告警，不影响探测结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssertionKind {
    /// HTTP状态码断言
    StatusCode,
    /// 响应时间断言（秒）
    ResponseTime,
    /// 未识别的断言类型
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssertionKind::StatusCode => write!(f, "STATUS_CODE"),
            AssertionKind::ResponseTime => write!(f, "RESPONSE_TIME"),
            AssertionKind::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// 断言比较操作符
///
/// 固定集合之外的操作符在评估时产生硬性失败，不会默认通过。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssertionOperator {
    /// 等于
    Equals,
    /// 不等于
    NotEquals,
    /// 大于
    GreaterThan,
    /// 小于
    LessThan,
    /// 不支持的操作符
    #[serde(other)]
    Unsupported,
}

impl std::fmt::Display for AssertionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssertionOperator::Equals => write!(f, "EQUALS"),
            AssertionOperator::NotEquals => write!(f, "NOT_EQUALS"),
            AssertionOperator::GreaterThan => write!(f, "GREATER_THAN"),
            AssertionOperator::LessThan => write!(f, "LESS_THAN"),
            AssertionOperator::Unsupported => write!(f, "UNSUPPORTED"),
        }
    }
}

/// 断言期望值
///
/// 数值的带标签变体：状态码为整数，响应时间为浮点秒数。
/// 避免无类型比较带来的歧义语义。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionValue {
    /// 整数值（状态码）
    Integer(i64),
    /// 浮点值（响应时间，秒）
    Float(f64),
}

impl AssertionValue {
    /// 统一为f64进行比较
    pub fn as_f64(&self) -> f64 {
        match self {
            AssertionValue::Integer(v) => *v as f64,
            AssertionValue::Float(v) => *v,
        }
    }

    /// 判断是否为整数值
    pub fn is_integer(&self) -> bool {
        matches!(self, AssertionValue::Integer(_))
    }
}

impl std::fmt::Display for AssertionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssertionValue::Integer(v) => write!(f, "{}", v),
            AssertionValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// 单条断言定义，三个字段均为必填
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// 断言类型
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    /// 比较操作符
    pub operator: AssertionOperator,
    /// 期望值
    pub value: AssertionValue,
}

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 尝试次数（至少为1）
    #[serde(default = "default_retry_count")]
    pub count: u32,
    /// 重试间隔（秒）
    #[serde(default = "default_retry_interval")]
    pub interval_seconds: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            count: default_retry_count(),
            interval_seconds: default_retry_interval(),
        }
    }
}

// 默认值函数
fn default_method() -> String {
    "GET".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_retry_count() -> u32 {
    3
}
fn default_retry_interval() -> u64 {
    5
}

/// 配置验证函数
///
/// 在执行任何探测之前对整个配置做快速失败校验。
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.requests.is_empty() {
        return Err("配置中至少需要一个探测请求".to_string());
    }

    for (index, spec) in config.requests.iter().enumerate() {
        validate_probe_spec(spec).map_err(|e| format!("请求 {} 无效: {}", index + 1, e))?;
    }

    Ok(())
}

/// 单个探测请求的验证函数
///
/// # 参数
/// * `spec` - 要验证的探测请求
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_probe_spec(spec: &ProbeSpec) -> Result<(), String> {
    // 必须指定URL或脚本目标之一
    if spec.url.is_none() && spec.script.is_none() {
        return Err("必须指定 url 或 script 目标之一".to_string());
    }

    // 验证URL格式
    if let Some(ref url) = spec.url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("URL格式无效: {}", url));
        }
    }

    // 验证HTTP方法
    let valid_methods = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];
    if !valid_methods.contains(&spec.method.as_str()) {
        return Err(format!(
            "HTTP方法 {} 无效，支持的方法: {:?}",
            spec.method, valid_methods
        ));
    }

    // POST/PUT请求必须携带请求体
    if matches!(spec.method.as_str(), "POST" | "PUT") && spec.body.is_none() {
        return Err(format!("{} 请求必须指定请求体", spec.method));
    }

    // 验证超时时间
    if spec.timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    // 验证重试策略
    if spec.retry.count == 0 {
        return Err("重试次数不能为0".to_string());
    }

    // 验证断言：状态码断言的期望值必须是整数
    for assertion in &spec.assertions {
        if assertion.kind == AssertionKind::StatusCode && !assertion.value.is_integer() {
            return Err(format!(
                "状态码断言的期望值必须是整数: {}",
                assertion.value
            ));
        }
    }

    Ok(())
}
