//! 探测结果数据结构
//!
//! 定义单次探测尝试的结果类型

use crate::config::types::{AssertionKind, AssertionOperator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// 响应体在结果工件中保留的最大字符数
pub const MAX_BODY_CHARS: usize = 10_000;

/// 单条断言的评估记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionCheck {
    /// 断言类型
    pub kind: AssertionKind,
    /// 比较操作符
    pub operator: AssertionOperator,
    /// 是否通过
    pub passed: bool,
}

/// 单次探测尝试的结果
///
/// 每次尝试创建一个新实例，创建后不再修改；
/// 聚合完成后只保留获胜（或最后一次）尝试的结果用于报告。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// 探测ID
    pub id: Uuid,
    /// 探测目标URL
    pub url: String,
    /// HTTP方法
    pub method: String,
    /// 探测时间戳
    pub timestamp: DateTime<Utc>,
    /// HTTP状态码（传输层失败时为空）
    pub status_code: Option<u16>,
    /// 响应时间
    #[serde(with = "duration_serde")]
    pub response_time: Duration,
    /// 响应头
    #[serde(default)]
    pub response_headers: HashMap<String, String>,
    /// 响应体完整大小（字节）
    pub response_size: Option<usize>,
    /// 响应体（超过上限时截断为前10000个字符）
    pub response_body: Option<String>,
    /// 各断言的评估记录
    #[serde(default)]
    pub assertion_results: Vec<AssertionCheck>,
    /// 本次尝试是否成功
    pub success: bool,
    /// 错误信息（如果有）
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    /// 创建新的探测结果
    ///
    /// # 参数
    /// * `url` - 探测目标URL
    /// * `method` - HTTP方法
    ///
    /// # 返回
    /// * `Self` - 探测结果实例
    pub fn new(url: String, method: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            method,
            timestamp: Utc::now(),
            status_code: None,
            response_time: Duration::from_millis(0),
            response_headers: HashMap::new(),
            response_size: None,
            response_body: None,
            assertion_results: Vec::new(),
            success: false,
            error_message: None,
        }
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// 设置响应时间
    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time = response_time;
        self
    }

    /// 设置响应头
    pub fn with_response_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.response_headers = headers;
        self
    }

    /// 记录响应体
    ///
    /// 完整大小按字节记录；工件中的响应体只保留前10000个字符，
    /// 超长部分截断，避免结果工件膨胀。
    pub fn with_response_body(mut self, body: &str) -> Self {
        self.response_size = Some(body.len());
        self.response_body = Some(truncate_body(body));
        self
    }

    /// 设置断言评估记录
    pub fn with_assertion_results(mut self, results: Vec<AssertionCheck>) -> Self {
        self.assertion_results = results;
        self
    }

    /// 设置成功标志
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    /// 设置错误信息
    pub fn with_error(mut self, error_message: String) -> Self {
        self.error_message = Some(error_message);
        self
    }

    /// 获取响应时间（毫秒）
    pub fn response_time_ms(&self) -> u64 {
        self.response_time.as_millis() as u64
    }

    /// 获取响应时间（秒，用于响应时间断言）
    pub fn response_time_secs(&self) -> f64 {
        self.response_time.as_secs_f64()
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// 截断响应体为前10000个字符
///
/// 按字符而非字节截断，保证UTF-8边界安全。
fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((index, _)) => body[..index].to_string(),
        None => body.to_string(),
    }
}

/// 整次探测（含重试）的执行报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// 探测是否成功
    pub success: bool,
    /// 实际执行的尝试次数
    pub attempts: u32,
    /// 获胜（或最后一次）尝试的结果工件
    pub outcome: Option<ProbeOutcome>,
}

/// Duration序列化模块
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
