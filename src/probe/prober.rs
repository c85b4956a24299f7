//! HTTP探测器实现
//!
//! 执行单次HTTP调用，采集状态码、响应体、响应头和耗时，不含重试逻辑

use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::info;

/// 一次探测的请求参数
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// 目标URL
    pub url: String,
    /// HTTP方法
    pub method: String,
    /// 请求头
    pub headers: HashMap<String, String>,
    /// 请求体
    pub body: Option<String>,
    /// 超时时间（覆盖发送到响应体读取完成的全过程）
    pub timeout: Duration,
}

/// 一次完整HTTP交换的观察结果
///
/// 4xx/5xx状态码属于正常交换结果而非错误，
/// 状态码作为断言评估的输入，不走错误路径。
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// HTTP状态码
    pub status_code: u16,
    /// 响应体（UTF-8文本）
    pub body: String,
    /// 响应头
    pub headers: HashMap<String, String>,
    /// 耗时，从发起请求到响应体读取完成
    pub elapsed: Duration,
}

/// 探测器trait，定义单次HTTP调用接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 执行单次HTTP探测
    ///
    /// # 参数
    /// * `request` - 请求参数
    ///
    /// # 返回
    /// * `Result<ProbeResponse, ProbeError>` - 交换结果，传输层失败时返回错误
    async fn probe(&self, request: &ProbeRequest)
        -> std::result::Result<ProbeResponse, ProbeError>;
}

/// 基于reqwest的HTTP探测器实现
///
/// TLS证书校验始终开启：监控工具必须暴露证书问题而不是掩盖它们。
pub struct HttpProber {
    /// HTTP客户端，连接池可在顺序探测间安全复用
    client: Client,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(ProbeError::RequestError)?;

        Ok(Self { client })
    }

    /// 构建HTTP请求
    ///
    /// 请求体只在POST/PUT方法且内容非空时附加。
    ///
    /// # 参数
    /// * `request` - 请求参数
    ///
    /// # 返回
    /// * `Result<reqwest::RequestBuilder, ProbeError>` - 请求构建器
    fn build_request(
        &self,
        request: &ProbeRequest,
    ) -> std::result::Result<reqwest::RequestBuilder, ProbeError> {
        // 解析HTTP方法
        let method =
            Method::from_str(&request.method.to_uppercase()).map_err(|_| {
                ProbeError::InvalidMethod {
                    method: request.method.clone(),
                }
            })?;

        let carries_payload = method == Method::POST || method == Method::PUT;
        let mut builder = self.client.request(method, &request.url);

        // 添加请求头
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        // 添加请求体（如果有）
        if carries_payload {
            if let Some(ref body) = request.body {
                if !body.is_empty() {
                    builder = builder.body(body.clone());
                }
            }
        }

        Ok(builder)
    }
}

impl ProbeError {
    /// 格式化传输层错误信息，使其更加清晰易读
    pub fn summary(&self) -> String {
        match self {
            ProbeError::Timeout => "Request timeout".to_string(),
            ProbeError::InvalidMethod { method } => format!("Invalid method: {}", method),
            ProbeError::Decode(e) => format!("Response decode error: {}", e),
            ProbeError::RequestError(error) => {
                if error.is_timeout() {
                    "Request timeout".to_string()
                } else if error.is_connect() {
                    "Connection refused".to_string()
                } else if error.is_request() {
                    "Invalid request".to_string()
                } else {
                    let error_str = error.to_string();
                    if error_str.contains("dns") || error_str.contains("DNS") {
                        "DNS resolution failed".to_string()
                    } else if error_str.contains("certificate")
                        || error_str.contains("tls")
                        || error_str.contains("ssl")
                    {
                        "SSL/TLS certificate error".to_string()
                    } else {
                        format!("Request failed: {}", error_str)
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(
        &self,
        request: &ProbeRequest,
    ) -> std::result::Result<ProbeResponse, ProbeError> {
        info!("发起 {} 请求: {}", request.method, request.url);

        let builder = self.build_request(request)?;

        // 耗时从请求发出前开始计量，到响应体完整读取为止
        let start_time = Instant::now();

        let exchange = timeout(request.timeout, async {
            let response = builder.send().await?;
            let status_code = response.status().as_u16();

            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.to_string(), v.to_string()))
                })
                .collect::<HashMap<String, String>>();

            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status_code, headers, bytes))
        })
        .await;

        let elapsed = start_time.elapsed();

        let (status_code, headers, bytes) = match exchange {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) => return Err(ProbeError::RequestError(e)),
            Err(_) => return Err(ProbeError::Timeout),
        };

        // 响应体统一按UTF-8文本处理，解码失败视为传输层失败
        let body = String::from_utf8(bytes.to_vec())
            .map_err(|e| ProbeError::Decode(e.to_string()))?;

        info!(
            "请求完成: 状态码 {}, 耗时 {:.2}秒",
            status_code,
            elapsed.as_secs_f64()
        );

        Ok(ProbeResponse {
            status_code,
            body,
            headers,
            elapsed,
        })
    }
}
