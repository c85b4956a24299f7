//! 请求执行器
//!
//! 围绕HTTP探测器编排重试循环和断言评估，决定单个探测请求的成败

use crate::config::types::{Assertion, AssertionKind, ProbeSpec};
use crate::error::{AssertionError, Result};
use crate::probe::assertion::evaluate_assertion;
use crate::probe::outcome::{AssertionCheck, ProbeOutcome, ProbeReport};
use crate::probe::prober::{ProbeRequest, ProbeResponse, Prober};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 触发canary用户代理替换的占位值
///
/// 配置中将User-Agent头设置为该值时，执行器会在发起请求前
/// 将其替换为平台canary标识字符串。
pub const CANARY_USER_AGENT_PLACEHOLDER: &str = "Synthetic Canary";

/// 默认canary用户代理字符串，提供者不可用时的回退值
pub const DEFAULT_CANARY_USER_AGENT: &str =
    concat!("canary-vitals/", env!("CARGO_PKG_VERSION"), " (reqwest)");

/// 用户代理提供者trait
///
/// 可选的外部能力，返回平台特定的canary标识字符串。
/// 执行器必须容忍提供者缺失或失败，不能因此中止探测。
pub trait UserAgentProvider: Send + Sync {
    /// 获取canary用户代理字符串
    fn canary_user_agent(&self) -> anyhow::Result<String>;
}

/// 请求执行器
///
/// 对单个探测请求运行重试循环：每次尝试调用探测器、
/// 评估全部断言、决定本次尝试成败，全部尝试耗尽后聚合最终结果。
pub struct RequestExecutor {
    /// HTTP探测器
    prober: Arc<dyn Prober>,
    /// 用户代理提供者（可选）
    user_agent_provider: Option<Arc<dyn UserAgentProvider>>,
}

impl RequestExecutor {
    /// 创建新的请求执行器
    ///
    /// # 参数
    /// * `prober` - HTTP探测器
    /// * `user_agent_provider` - 用户代理提供者（可选）
    ///
    /// # 返回
    /// * `Self` - 执行器实例
    pub fn new(
        prober: Arc<dyn Prober>,
        user_agent_provider: Option<Arc<dyn UserAgentProvider>>,
    ) -> Self {
        Self {
            prober,
            user_agent_provider,
        }
    }

    /// 执行单个探测请求
    ///
    /// 普通的探测失败通过返回值中的success标志表达，不作为错误抛出；
    /// 只有配置错误或程序错误才会向上传播。
    ///
    /// # 参数
    /// * `spec` - 探测请求定义
    ///
    /// # 返回
    /// * `Result<ProbeReport>` - 执行报告，只保留获胜（或最后一次）尝试的结果
    pub async fn execute(&self, spec: &ProbeSpec) -> Result<ProbeReport> {
        let url = match spec.url {
            Some(ref url) => url.clone(),
            None => {
                // 脚本目标暂未实现，不调用探测器，直接记为失败
                warn!("脚本类型的探测请求暂未实现");
                return Ok(ProbeReport {
                    success: false,
                    attempts: 0,
                    outcome: None,
                });
            }
        };

        let retry_count = spec.retry.count;
        let retry_interval = Duration::from_secs(spec.retry.interval_seconds);
        let headers = self.resolve_headers(&spec.headers);

        let request = ProbeRequest {
            url: url.clone(),
            method: spec.method.clone(),
            headers,
            body: spec.body.clone(),
            timeout: Duration::from_secs(spec.timeout_seconds),
        };

        let mut success = false;
        let mut attempts = 0;
        let mut last_outcome: Option<ProbeOutcome> = None;

        for attempt in 0..retry_count {
            attempts = attempt + 1;
            info!(
                "探测尝试 {}/{}: {} {}",
                attempts, retry_count, spec.method, url
            );

            match self.prober.probe(&request).await {
                Ok(response) => {
                    info!("响应状态码: {}", response.status_code);

                    let mut outcome = ProbeOutcome::new(url.clone(), spec.method.clone())
                        .with_status_code(response.status_code)
                        .with_response_time(response.elapsed)
                        .with_response_headers(response.headers.clone())
                        .with_response_body(&response.body);

                    // 评估全部断言；不支持的操作符使本次尝试硬性失败
                    match self.evaluate_assertions(&spec.assertions, &response) {
                        Ok((checks, all_passed)) => {
                            outcome = outcome
                                .with_assertion_results(checks)
                                .with_success(all_passed);

                            if all_passed {
                                success = true;
                                last_outcome = Some(outcome);
                                break;
                            }

                            warn!(
                                "尝试 {}/{} 因断言失败而未通过",
                                attempts, retry_count
                            );
                        }
                        Err(e) => {
                            error!("断言评估中止: {}", e);
                            outcome = outcome.with_error(e.to_string());
                        }
                    }

                    last_outcome = Some(outcome);
                }
                Err(e) => {
                    // 传输层失败：记录错误，本次尝试不评估断言
                    error!("HTTP请求失败: {}", e.summary());
                    last_outcome = Some(
                        ProbeOutcome::new(url.clone(), spec.method.clone())
                            .with_error(e.summary()),
                    );
                }
            }

            // 非最后一次尝试且尚未成功时，等待重试间隔
            if attempt < retry_count - 1 && !success {
                info!("等待 {} 秒后重试", spec.retry.interval_seconds);
                tokio::time::sleep(retry_interval).await;
            }
        }

        if success {
            info!("请求 {} 探测成功", url);
        } else {
            error!("请求 {} 在 {} 次尝试后仍然失败", url, retry_count);
        }

        Ok(ProbeReport {
            success,
            attempts,
            outcome: last_outcome,
        })
    }

    /// 评估一次尝试的全部断言
    ///
    /// 所有断言都会被评估和记录，首条失败后不短路，
    /// 以便日志中保留完整的诊断信息。
    /// 未识别的断言类型跳过并告警，不计入成败。
    ///
    /// # 参数
    /// * `assertions` - 断言列表
    /// * `response` - 本次HTTP交换的观察结果
    ///
    /// # 返回
    /// * `Result<(Vec<AssertionCheck>, bool), AssertionError>` - 评估记录和整体结论
    fn evaluate_assertions(
        &self,
        assertions: &[Assertion],
        response: &ProbeResponse,
    ) -> std::result::Result<(Vec<AssertionCheck>, bool), AssertionError> {
        let mut checks = Vec::with_capacity(assertions.len());
        let mut all_passed = true;

        for assertion in assertions {
            let actual_value = match assertion.kind {
                AssertionKind::StatusCode => f64::from(response.status_code),
                AssertionKind::ResponseTime => response.elapsed.as_secs_f64(),
                AssertionKind::Unknown => {
                    warn!("不支持的断言类型，已跳过");
                    continue;
                }
            };

            let passed = evaluate_assertion(assertion, actual_value)?;
            all_passed = all_passed && passed;

            if !passed {
                warn!(
                    "断言失败: {} 实际值 {}",
                    assertion.kind, actual_value
                );
            }

            checks.push(AssertionCheck {
                kind: assertion.kind,
                operator: assertion.operator,
                passed,
            });
        }

        Ok((checks, all_passed))
    }

    /// 解析生效的请求头
    ///
    /// User-Agent头为canary占位值时替换为平台标识字符串；
    /// 提供者缺失或失败时回退到内置默认值，替换过程不会中止探测。
    fn resolve_headers(&self, headers: &HashMap<String, String>) -> HashMap<String, String> {
        let mut resolved = headers.clone();

        if resolved.get("User-Agent").map(String::as_str) == Some(CANARY_USER_AGENT_PLACEHOLDER)
        {
            let user_agent = match self.user_agent_provider {
                Some(ref provider) => match provider.canary_user_agent() {
                    Ok(user_agent) => {
                        info!("使用平台canary用户代理: {}", user_agent);
                        user_agent
                    }
                    Err(e) => {
                        warn!("获取canary用户代理失败: {}", e);
                        DEFAULT_CANARY_USER_AGENT.to_string()
                    }
                },
                None => DEFAULT_CANARY_USER_AGENT.to_string(),
            };

            resolved.insert("User-Agent".to_string(), user_agent);
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{AssertionOperator, AssertionValue, RetryPolicy};
    use crate::error::ProbeError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按脚本顺序返回预设结果的探测器，并记录收到的请求
    struct ScriptedProber {
        responses: Mutex<VecDeque<std::result::Result<ProbeResponse, ProbeError>>>,
        requests: Mutex<Vec<ProbeRequest>>,
    }

    impl ScriptedProber {
        fn new(
            responses: Vec<std::result::Result<ProbeResponse, ProbeError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn recorded_requests(&self) -> Vec<ProbeRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(
            &self,
            request: &ProbeRequest,
        ) -> std::result::Result<ProbeResponse, ProbeError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProbeError::Timeout))
        }
    }

    fn response_with_status(status_code: u16) -> ProbeResponse {
        ProbeResponse {
            status_code,
            body: "test body".to_string(),
            headers: HashMap::new(),
            elapsed: Duration::from_millis(50),
        }
    }

    fn status_assertion(operator: AssertionOperator, value: i64) -> Assertion {
        Assertion {
            kind: AssertionKind::StatusCode,
            operator,
            value: AssertionValue::Integer(value),
        }
    }

    fn spec_with_retry(count: u32) -> ProbeSpec {
        ProbeSpec {
            url: Some("https://example.test/health".to_string()),
            script: None,
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
            timeout_seconds: 30,
            assertions: vec![status_assertion(AssertionOperator::Equals, 200)],
            retry: RetryPolicy {
                count,
                interval_seconds: 0,
            },
        }
    }

    fn executor_with(prober: Arc<ScriptedProber>) -> RequestExecutor {
        RequestExecutor::new(prober, None)
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_stops_retrying() {
        let prober = Arc::new(ScriptedProber::new(vec![
            Ok(response_with_status(200)),
            Ok(response_with_status(200)),
            Ok(response_with_status(200)),
        ]));
        let executor = executor_with(prober.clone());

        let report = executor.execute(&spec_with_retry(3)).await.unwrap();

        assert!(report.success);
        assert_eq!(report.attempts, 1);
        assert_eq!(prober.call_count(), 1);
        assert!(report.outcome.unwrap().success);
    }

    #[tokio::test]
    async fn test_success_on_second_attempt() {
        let prober = Arc::new(ScriptedProber::new(vec![
            Ok(response_with_status(503)),
            Ok(response_with_status(200)),
        ]));
        let executor = executor_with(prober.clone());

        let report = executor.execute(&spec_with_retry(2)).await.unwrap();

        assert!(report.success);
        assert_eq!(report.attempts, 2);
        assert_eq!(prober.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_failure_not_error() {
        let prober = Arc::new(ScriptedProber::new(vec![
            Ok(response_with_status(404)),
            Ok(response_with_status(404)),
        ]));
        let executor = executor_with(prober.clone());

        let report = executor.execute(&spec_with_retry(2)).await.unwrap();

        assert!(!report.success);
        assert_eq!(report.attempts, 2);
        assert_eq!(prober.call_count(), 2);

        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.status_code, Some(404));
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_transport_failure_skips_assertions_and_retries() {
        let prober = Arc::new(ScriptedProber::new(vec![
            Err(ProbeError::Timeout),
            Ok(response_with_status(200)),
        ]));
        let executor = executor_with(prober.clone());

        let report = executor.execute(&spec_with_retry(2)).await.unwrap();

        assert!(report.success);
        assert_eq!(prober.call_count(), 2);
    }

    #[tokio::test]
    async fn test_all_transport_failures_yield_failure_without_status() {
        let prober = Arc::new(ScriptedProber::new(vec![
            Err(ProbeError::Timeout),
            Err(ProbeError::Timeout),
        ]));
        let executor = executor_with(prober.clone());

        let report = executor.execute(&spec_with_retry(2)).await.unwrap();

        assert!(!report.success);
        let outcome = report.outcome.unwrap();
        // 传输层失败时没有状态码
        assert!(outcome.status_code.is_none());
        assert!(outcome.error_message.is_some());
    }

    #[tokio::test]
    async fn test_http_500_passes_matching_assertion() {
        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(500))]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(1);
        spec.assertions = vec![status_assertion(AssertionOperator::Equals, 500)];

        let report = executor.execute(&spec).await.unwrap();
        assert!(report.success);
    }

    #[tokio::test]
    async fn test_all_assertions_evaluated_without_short_circuit() {
        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(404))]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(1);
        spec.assertions = vec![
            status_assertion(AssertionOperator::Equals, 200),
            Assertion {
                kind: AssertionKind::ResponseTime,
                operator: AssertionOperator::LessThan,
                value: AssertionValue::Float(10.0),
            },
        ];

        let report = executor.execute(&spec).await.unwrap();
        assert!(!report.success);

        // 首条断言失败后，第二条仍被评估并记录
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.assertion_results.len(), 2);
        assert!(!outcome.assertion_results[0].passed);
        assert!(outcome.assertion_results[1].passed);
    }

    #[tokio::test]
    async fn test_unknown_assertion_kind_skipped() {
        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(200))]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(1);
        spec.assertions = vec![
            Assertion {
                kind: AssertionKind::Unknown,
                operator: AssertionOperator::Equals,
                value: AssertionValue::Integer(1),
            },
            status_assertion(AssertionOperator::Equals, 200),
        ];

        let report = executor.execute(&spec).await.unwrap();

        // 未识别的断言类型不计入成败
        assert!(report.success);
        assert_eq!(report.outcome.unwrap().assertion_results.len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_operator_fails_attempt_and_consumes_retries() {
        let prober = Arc::new(ScriptedProber::new(vec![
            Ok(response_with_status(200)),
            Ok(response_with_status(200)),
        ]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(2);
        spec.assertions = vec![Assertion {
            kind: AssertionKind::StatusCode,
            operator: AssertionOperator::Unsupported,
            value: AssertionValue::Integer(200),
        }];

        let report = executor.execute(&spec).await.unwrap();

        // 硬性失败但不向上抛出，重试仍被消耗
        assert!(!report.success);
        assert_eq!(prober.call_count(), 2);
        assert!(report
            .outcome
            .unwrap()
            .error_message
            .unwrap()
            .contains("不支持的断言操作符"));
    }

    #[tokio::test]
    async fn test_no_assertions_means_any_exchange_succeeds() {
        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(503))]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(1);
        spec.assertions = vec![];

        let report = executor.execute(&spec).await.unwrap();
        assert!(report.success);
    }

    #[tokio::test]
    async fn test_script_spec_fails_without_invoking_prober() {
        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(200))]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(3);
        spec.url = None;
        spec.script = Some("check.py".to_string());

        let report = executor.execute(&spec).await.unwrap();

        assert!(!report.success);
        assert_eq!(report.attempts, 0);
        assert_eq!(prober.call_count(), 0);
        assert!(report.outcome.is_none());
    }

    #[tokio::test]
    async fn test_user_agent_placeholder_replaced_with_default() {
        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(200))]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(1);
        spec.headers.insert(
            "User-Agent".to_string(),
            CANARY_USER_AGENT_PLACEHOLDER.to_string(),
        );

        executor.execute(&spec).await.unwrap();

        let requests = prober.recorded_requests();
        assert_eq!(
            requests[0].headers.get("User-Agent").map(String::as_str),
            Some(DEFAULT_CANARY_USER_AGENT)
        );
    }

    #[tokio::test]
    async fn test_user_agent_placeholder_replaced_by_provider() {
        struct FixedProvider;

        impl UserAgentProvider for FixedProvider {
            fn canary_user_agent(&self) -> anyhow::Result<String> {
                Ok("platform-canary/2.0".to_string())
            }
        }

        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(200))]));
        let executor = RequestExecutor::new(prober.clone(), Some(Arc::new(FixedProvider)));

        let mut spec = spec_with_retry(1);
        spec.headers.insert(
            "User-Agent".to_string(),
            CANARY_USER_AGENT_PLACEHOLDER.to_string(),
        );

        executor.execute(&spec).await.unwrap();

        let requests = prober.recorded_requests();
        assert_eq!(
            requests[0].headers.get("User-Agent").map(String::as_str),
            Some("platform-canary/2.0")
        );
    }

    #[tokio::test]
    async fn test_failing_provider_falls_back_to_default() {
        struct FailingProvider;

        impl UserAgentProvider for FailingProvider {
            fn canary_user_agent(&self) -> anyhow::Result<String> {
                Err(anyhow::anyhow!("provider unavailable"))
            }
        }

        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(200))]));
        let executor =
            RequestExecutor::new(prober.clone(), Some(Arc::new(FailingProvider)));

        let mut spec = spec_with_retry(1);
        spec.headers.insert(
            "User-Agent".to_string(),
            CANARY_USER_AGENT_PLACEHOLDER.to_string(),
        );

        // 提供者失败不会中止探测
        let report = executor.execute(&spec).await.unwrap();
        assert!(report.success);

        let requests = prober.recorded_requests();
        assert_eq!(
            requests[0].headers.get("User-Agent").map(String::as_str),
            Some(DEFAULT_CANARY_USER_AGENT)
        );
    }

    #[tokio::test]
    async fn test_ordinary_user_agent_left_untouched() {
        let prober = Arc::new(ScriptedProber::new(vec![Ok(response_with_status(200))]));
        let executor = executor_with(prober.clone());

        let mut spec = spec_with_retry(1);
        spec.headers
            .insert("User-Agent".to_string(), "custom-agent/1.0".to_string());

        executor.execute(&spec).await.unwrap();

        let requests = prober.recorded_requests();
        assert_eq!(
            requests[0].headers.get("User-Agent").map(String::as_str),
            Some("custom-agent/1.0")
        );
    }
}
