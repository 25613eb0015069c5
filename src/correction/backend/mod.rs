//! 纠错后端模块
//!
//! 本地模型和云端模型统一在 [`CorrectionBackend`] 接口之后，由配置选择，
//! 两者共享同一个三步流程（错误检测、改写、有用性评分）。

pub mod cloud;
pub mod flow;
pub mod local;
pub mod parser;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;

use crate::correction::config::{BackendKind, CorrectionConfig};
use crate::correction::error::CorrectionResult;
use crate::correction::types::Correction;

pub use cloud::{CloudBackend, MessagesClient};
pub use flow::run_correction;
pub use local::{HttpLocalProvider, HttpLocalSession, LocalBackend};
pub use parser::{extract_score, parse_error_spans, ParseOutcome};

/// 不透明的 `complete(prompt) -> text` 能力
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 发送提示词并返回模型的完整回答
    async fn complete(&self, prompt: &str) -> CorrectionResult<String>;

    /// 只需要很短回答的调用（评分），默认与 `complete` 相同
    async fn complete_brief(&self, prompt: &str) -> CorrectionResult<String> {
        self.complete(prompt).await
    }
}

/// 句子纠错后端
#[async_trait]
pub trait CorrectionBackend: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &str;

    /// 纠正一个句子；模型或凭据缺失时返回 `BackendUnavailable`
    async fn correct(&self, sentence: &str) -> CorrectionResult<Correction>;
}

/// 本地模型的可用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// 可以下载但尚未下载
    Downloadable,
    Downloading,
    Unavailable,
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// 本地模型提供者：检查可用性并创建长期会话
#[async_trait]
pub trait LocalModelProvider: Send + Sync {
    async fn availability(&self) -> CorrectionResult<Availability>;

    /// 创建一个会话；同一会话上的连续提示共享上下文
    async fn create_session(&self) -> CorrectionResult<Arc<dyn LanguageModel>>;
}

/// 按配置创建后端
pub fn build_backend(config: &CorrectionConfig) -> CorrectionResult<Arc<dyn CorrectionBackend>> {
    let backend: Arc<dyn CorrectionBackend> = match config.backend {
        BackendKind::Local => Arc::new(LocalBackend::from_config(config)?),
        BackendKind::Cloud => Arc::new(CloudBackend::from_config(config)?),
    };

    tracing::info!("使用纠错后端: {}", backend.name());
    Ok(backend)
}
