//! Canary Vitals 主程序入口
//!
//! 配置驱动的合成HTTP监控执行器

use anyhow::{Context, Result};
use canary_vitals::cli::args::{Args, Commands, OutputFormat};
use canary_vitals::cli::commands::{Command, InitCommand, ValidateCommand, VersionCommand};
use canary_vitals::config::{ConfigLoader, TomlConfigLoader};
use canary_vitals::logging::{LogConfig, LoggingSystem};
use canary_vitals::runner::CanaryRunner;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.log_level.clone().into(),
        console: true,
        json_format: false,
        ..Default::default()
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Canary Vitals v{} 启动", canary_vitals::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    match &args.command {
        Commands::Run { format } => execute_run_command(args, format).await,
        Commands::Validate { .. } => {
            let command = ValidateCommand;
            command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Init { .. } => {
            let command = InitCommand;
            command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Version { .. } => {
            let command = VersionCommand;
            command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
        }
    }
}

/// 执行run命令
///
/// 加载并验证配置，运行编排器，输出结论。
/// 编排器本身绝不终止进程；探测失败时的非零退出码是二进制
/// 入口的策略，由此函数之外的调用方处理。
async fn execute_run_command(args: &Args, format: &OutputFormat) -> Result<()> {
    let config_path = args.get_config_path();
    let loader = TomlConfigLoader::new(true);

    // 检查配置文件是否存在
    if !config_path.exists() {
        return Err(anyhow::anyhow!(
            "配置文件不存在: {}\n提示：请运行 'canary-vitals init' 创建默认配置文件",
            config_path.display()
        ));
    }

    let config = loader.load_from_file(&config_path).await.with_context(|| {
        format!(
            "加载配置文件失败: {}\n请检查配置文件格式是否正确",
            config_path.display()
        )
    })?;

    info!("配置加载完成，探测请求数量: {}", config.requests.len());

    let runner = CanaryRunner::new()?;
    let verdict = runner.run(&config).await;

    match format {
        OutputFormat::Json => {
            println!("{}", verdict.to_json()?);
        }
        OutputFormat::Text => {
            if verdict.success {
                println!("canary探测成功");
            } else {
                println!("canary探测失败");
                if let Some(ref error) = verdict.error {
                    println!("错误: {}", error);
                }
            }
        }
    }

    // 探测失败时以非零退出码结束，便于外部调度系统判断
    if !verdict.success {
        std::process::exit(1);
    }

    Ok(())
}
