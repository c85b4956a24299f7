//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{ConfigLoader, TomlConfigLoader};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let path = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            let loader = TomlConfigLoader::new(true);
            let config = loader.load_from_file(&path).await?;

            println!("配置文件有效: {}", path.display());
            println!("探测请求数量: {}", config.requests.len());

            if *verbose {
                for (index, spec) in config.requests.iter().enumerate() {
                    let target = spec
                        .url
                        .as_deref()
                        .or(spec.script.as_deref())
                        .unwrap_or("<无目标>");
                    println!(
                        "  {}. {} {} (断言 {} 条, 重试 {} 次)",
                        index + 1,
                        spec.method,
                        target,
                        spec.assertions.len(),
                        spec.retry.count
                    );
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        // 检查文件是否已存在
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        // 创建目录（如果不存在）
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // 写入配置文件
        tokio::fs::write(config_path, Self::get_template_config()).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以添加您的探测请求");

        Ok(())
    }

    /// 获取配置模板
    fn get_template_config() -> &'static str {
        r#"# Canary Vitals 探测配置

[[requests]]
url = "https://example.com/health"
method = "GET"
timeout_seconds = 30

[requests.headers]
"User-Agent" = "Synthetic Canary"

[[requests.assertions]]
type = "STATUS_CODE"
operator = "EQUALS"
value = 200

[[requests.assertions]]
type = "RESPONSE_TIME"
operator = "LESS_THAN"
value = 5.0

[requests.retry]
count = 3
interval_seconds = 5
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::validate_config;

    #[tokio::test]
    async fn test_template_config_is_valid() {
        // 初始化模板必须能通过加载器和验证器
        let loader = TomlConfigLoader::new(false);
        let config = loader
            .load_from_string(InitCommand::get_template_config())
            .await
            .unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.requests.len(), 1);
        assert_eq!(config.requests[0].assertions.len(), 2);
    }

    #[tokio::test]
    async fn test_init_command_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let command = InitCommand;
        command
            .create_config_file(&config_path, false)
            .await
            .unwrap();

        assert!(config_path.exists());
        let content = tokio::fs::read_to_string(&config_path).await.unwrap();
        assert!(content.contains("[[requests]]"));
    }

    #[tokio::test]
    async fn test_init_command_does_not_overwrite_without_force() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        tokio::fs::write(&config_path, "existing").await.unwrap();

        let command = InitCommand;
        command
            .create_config_file(&config_path, false)
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&config_path).await.unwrap();
        assert_eq!(content, "existing");
    }

    #[tokio::test]
    async fn test_init_command_overwrites_with_force() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        tokio::fs::write(&config_path, "existing").await.unwrap();

        let command = InitCommand;
        command
            .create_config_file(&config_path, true)
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&config_path).await.unwrap();
        assert!(content.contains("[[requests]]"));
    }
}
