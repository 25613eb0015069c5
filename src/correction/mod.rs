//! 中文纠错模块
//!
//! 把用户输入的中文变成地道改写建议，采用与翻译子系统相同的分层结构：
//! - **core**: 会话控制器、页面上下文、浮层接口
//! - **pipeline**: 文本提取、分句、网址过滤
//! - **storage**: 建议缓存和已接受集合
//! - **backend**: 本地/云端模型后端、提示词和宽松解析
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use idiomatic_zh::correction::{
//!     build_backend, load_correction_config, OverlayPresenter, PresentRequest, SessionController,
//! };
//!
//! struct Printer;
//!
//! impl OverlayPresenter for Printer {
//!     fn present(&self, request: PresentRequest) {
//!         println!("{}", request.suggestion.suggestion);
//!     }
//!     fn dismiss(&self) {}
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_correction_config();
//! let backend = build_backend(&config)?;
//! let controller = SessionController::new(backend, Arc::new(Printer), (&config).into());
//!
//! let outcome = controller.process_text("这个桥梁的涉及很独特。", None).await;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 模型后端模块 - 本地和云端两种实现
pub mod backend;

/// 配置管理模块
pub mod config;

/// 核心模块 - 会话控制器
pub mod core;

/// 错误处理模块
pub mod error;

/// 文本处理管道模块 - 提取、分句、网址过滤
pub mod pipeline;

/// 存储管理模块 - 建议缓存和已接受集合
pub mod storage;

/// 纠错结果类型
pub mod types;

// ============================================================================
// 公共API重新导出
// ============================================================================

pub use backend::{build_backend, Availability, CorrectionBackend, LanguageModel, LocalModelProvider};
pub use config::{load_correction_config, BackendKind, ConfigManager, CorrectionConfig, UrlFilterMode};
pub use core::{
    ControllerSettings, OverlayPresenter, PresentRequest, SessionController, SessionOutcome,
    SkipReason, Suggestion,
};
pub use error::{CorrectionError, CorrectionResult};
pub use pipeline::{EditableElement, ElementKind};
pub use types::{Correction, ErrorSpan, ErrorType};
