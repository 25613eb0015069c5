//! 命令行入口
//!
//! `check` 对一段文本运行一次完整会话并打印建议；`env-docs` 打印环境变量说明；
//! `init-config` 生成示例配置文件。

use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use idiomatic_zh::correction::{
    build_backend, load_correction_config, BackendKind, ConfigManager, CorrectionConfig,
    CorrectionResult, OverlayPresenter, PresentRequest, SessionController, SessionOutcome,
    SkipReason,
};
use idiomatic_zh::env::{self, EnvVar};

#[derive(Parser)]
#[command(
    name = "idiomatic-zh",
    version,
    about = "Suggest idiomatic rewrites for Chinese text"
)]
struct Cli {
    /// 覆盖配置中的后端（local 或 cloud）
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// 配置文件路径（TOML 或 JSON）
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 纠正一段中文并打印建议
    Check {
        /// 要检查的文本
        text: String,
    },
    /// 打印支持的环境变量
    EnvDocs,
    /// 生成示例配置文件
    InitConfig {
        #[arg(value_name = "PATH")]
        path: String,
    },
}

/// 把建议打印到标准输出
struct StdoutPresenter;

impl OverlayPresenter for StdoutPresenter {
    fn present(&self, request: PresentRequest) {
        let suggestion = request.suggestion;
        println!("原文: {}", suggestion.original);
        println!("建议: {}", suggestion.suggestion);
        println!("有用性: {:.2}", suggestion.usefulness);
    }

    fn dismiss(&self) {}
}

fn init_logging() {
    let level = env::core::LogLevel::get()
        .ok()
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);
    let no_color = env::core::NoColor::get().unwrap_or(false);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!no_color)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> CorrectionResult<CorrectionConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?.into_config(),
        None => load_correction_config(),
    };

    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    Ok(config)
}

async fn check(config: &CorrectionConfig, text: &str) -> CorrectionResult<()> {
    let backend = build_backend(config)?;
    let controller = SessionController::new(backend, Arc::new(StdoutPresenter), config.into());

    match controller.process_text(text, None).await {
        SessionOutcome::Presented(_) => {}
        SessionOutcome::NothingToSend => println!("没有需要检查的句子"),
        SessionOutcome::NoChange | SessionOutcome::Superseded => println!("没有建议"),
        SessionOutcome::Skipped(SkipReason::Disabled) => println!("当前页面已禁用"),
        SessionOutcome::Skipped(SkipReason::Disconnected) => println!("目标元素已离开文档"),
    }

    let stats = controller.stats().snapshot();
    if stats.units_failed > 0 {
        eprintln!(
            "{} 个句子处理失败，详情见日志（IDIOMATIC_ZH_LOG_LEVEL=debug）",
            stats.units_failed
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::EnvDocs => {
            print!("{}", env::generate_env_docs());
            Ok(())
        }
        Command::InitConfig { path } => ConfigManager::generate_example_config(path).map(|_| {
            println!("已生成示例配置: {}", path);
        }),
        Command::Check { text } => match load_config(&cli) {
            Ok(config) => check(&config, text).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("错误: {}", e);
        process::exit(1);
    }
}
