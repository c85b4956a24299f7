//! 运行编排器
//!
//! 按声明顺序依次执行配置中的所有探测请求，聚合整体结论

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use crate::probe::executor::{RequestExecutor, UserAgentProvider};
use crate::probe::prober::HttpProber;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 整次canary运行的最终结论
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunVerdict {
    /// 所有探测请求是否全部成功
    pub success: bool,
    /// 错误描述（如果有）
    pub error: Option<String>,
}

impl RunVerdict {
    /// 创建成功/失败的结论
    pub fn from_success(success: bool) -> Self {
        Self {
            success,
            error: None,
        }
    }

    /// 创建携带错误描述的失败结论
    pub fn from_error(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// canary运行编排器
///
/// 持有HTTP客户端连接池（通过执行器内的探测器），
/// 在顺序执行的各个探测之间复用连接。
pub struct CanaryRunner {
    /// 请求执行器
    executor: RequestExecutor,
}

impl CanaryRunner {
    /// 创建新的运行编排器
    ///
    /// # 返回
    /// * `Result<Self>` - 编排器实例
    pub fn new() -> Result<Self> {
        Self::with_user_agent_provider(None)
    }

    /// 创建带用户代理提供者的运行编排器
    ///
    /// # 参数
    /// * `user_agent_provider` - 用户代理提供者（可选）
    ///
    /// # 返回
    /// * `Result<Self>` - 编排器实例
    pub fn with_user_agent_provider(
        user_agent_provider: Option<Arc<dyn UserAgentProvider>>,
    ) -> Result<Self> {
        let prober = Arc::new(HttpProber::new()?);
        Ok(Self {
            executor: RequestExecutor::new(prober, user_agent_provider),
        })
    }

    /// 使用指定的执行器创建编排器（测试时注入假探测器）
    pub fn with_executor(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// 执行整个配置中的所有探测请求
    ///
    /// 该方法总是返回结论值，绝不向调用方抛出错误或终止进程：
    /// 任何未预期的内部错误都在此边界转换为失败结论。
    ///
    /// # 参数
    /// * `config` - 已加载的探测配置
    ///
    /// # 返回
    /// * `RunVerdict` - 整次运行的结论
    pub async fn run(&self, config: &Config) -> RunVerdict {
        info!("开始执行canary探测");

        let verdict = match self.run_all(config).await {
            Ok(success) => RunVerdict::from_success(success),
            Err(e) => {
                let error_message = format!("canary执行出错: {}", e);
                error!("{}", error_message);
                RunVerdict::from_error(error_message)
            }
        };

        info!("canary探测执行完成");
        verdict
    }

    /// 顺序执行全部探测请求并聚合结果
    async fn run_all(&self, config: &Config) -> Result<bool> {
        // 快速失败：执行任何探测之前验证整个配置，
        // 单个无效请求会中止整次运行
        validate_config(config).map_err(ConfigError::ValidationError)?;

        let total = config.requests.len();
        let mut all_succeeded = true;

        for (index, spec) in config.requests.iter().enumerate() {
            info!("处理请求 {}/{}", index + 1, total);

            let report = self.executor.execute(spec).await?;

            if let Some(ref outcome) = report.outcome {
                debug!("探测结果工件: {}", outcome.to_json()?);
            }

            all_succeeded = all_succeeded && report.success;
        }

        Ok(all_succeeded)
    }
}
