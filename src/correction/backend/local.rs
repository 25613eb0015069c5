//! 本地模型后端
//!
//! 会话在第一次使用时才创建（先检查可用性），之后所有调用复用同一个会话。
//! 模型不可用时立即返回 `BackendUnavailable`，不会回退到云端。
//!
//! 默认的提供者通过 HTTP 访问本机的 Ollama 风格服务：
//! `GET /api/tags` 查询已安装的模型，`POST /api/generate` 生成回答，
//! 并把返回的 `context` 带到下一次请求里以保持对话上下文。
//!
//! 同一会话上的调用依次执行。超时从拿到会话锁之后开始计算，排队等待不算在内。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};

use crate::correction::backend::{
    flow::run_correction, Availability, CorrectionBackend, LanguageModel, LocalModelProvider,
};
use crate::correction::config::CorrectionConfig;
use crate::correction::error::{helpers, CorrectionError, CorrectionResult};
use crate::correction::types::Correction;

// ============================================================================
// 本地后端
// ============================================================================

/// 本地模型纠错后端
pub struct LocalBackend {
    provider: Arc<dyn LocalModelProvider>,
    session: OnceCell<Arc<dyn LanguageModel>>,
}

impl LocalBackend {
    /// 单次调用的超时由提供者创建的会话负责
    pub fn new(provider: Arc<dyn LocalModelProvider>) -> Self {
        Self {
            provider,
            session: OnceCell::new(),
        }
    }

    /// 使用 HTTP 提供者创建
    pub fn from_config(config: &CorrectionConfig) -> CorrectionResult<Self> {
        let provider = HttpLocalProvider::from_config(config)?;
        Ok(Self::new(Arc::new(provider)))
    }

    /// 获取共享会话，第一次调用时创建
    ///
    /// 创建失败不会被缓存，下一次调用会重新检查可用性。
    async fn session(&self) -> CorrectionResult<Arc<dyn LanguageModel>> {
        self.session
            .get_or_try_init(|| async {
                let availability = self.provider.availability().await?;
                if !availability.is_ready() {
                    return Err(helpers::unavailable(format!(
                        "本地模型不可用: {:?}",
                        availability
                    )));
                }

                let session = self.provider.create_session().await?;
                tracing::info!("本地模型会话已创建");
                Ok::<_, CorrectionError>(session)
            })
            .await
            .cloned()
    }

    /// 会话是否已经创建
    pub fn has_session(&self) -> bool {
        self.session.initialized()
    }
}

#[async_trait]
impl CorrectionBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn correct(&self, sentence: &str) -> CorrectionResult<Correction> {
        let session = self.session().await?;
        run_correction(session.as_ref(), sentence, None).await
    }
}

// ============================================================================
// HTTP 提供者
// ============================================================================

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a [i64]>,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    context: Option<Vec<i64>>,
    #[serde(default)]
    error: Option<String>,
}

/// 已安装模型列表中是否包含目标模型（未写标签时按 `latest` 处理）
fn availability_from_tags(tags: &TagsResponse, model: &str) -> Availability {
    let latest = format!("{}:latest", model);
    if tags.models.iter().any(|m| m.name == model || m.name == latest) {
        Availability::Available
    } else {
        Availability::Downloadable
    }
}

/// 通过 HTTP 访问本机模型服务
pub struct HttpLocalProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    options: GenerateOptions,
    timeout: Duration,
}

impl HttpLocalProvider {
    pub fn from_config(config: &CorrectionConfig) -> CorrectionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.local_url.trim_end_matches('/').to_string(),
            model: config.local_model.clone(),
            options: GenerateOptions {
                temperature: config.local_temperature,
                top_k: config.local_top_k,
            },
            timeout: config.request_timeout(),
        })
    }
}

#[async_trait]
impl LocalModelProvider for HttpLocalProvider {
    async fn availability(&self) -> CorrectionResult<Availability> {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("无法连接本地模型服务 {}: {}", url, e);
                return Ok(Availability::Unavailable);
            }
        };

        if !response.status().is_success() {
            tracing::debug!("本地模型服务返回 HTTP {}", response.status());
            return Ok(Availability::Unavailable);
        }

        let tags: TagsResponse = response.json().await?;
        Ok(availability_from_tags(&tags, &self.model))
    }

    async fn create_session(&self) -> CorrectionResult<Arc<dyn LanguageModel>> {
        Ok(Arc::new(HttpLocalSession {
            client: self.client.clone(),
            generate_url: format!("{}/api/generate", self.base_url),
            model: self.model.clone(),
            options: self.options,
            timeout: self.timeout,
            context: Mutex::new(Vec::new()),
        }))
    }
}

/// 长期会话：每次回答后保存 `context`，下一次提示接着上一轮对话
pub struct HttpLocalSession {
    client: reqwest::Client,
    generate_url: String,
    model: String,
    options: GenerateOptions,
    timeout: Duration,
    context: Mutex<Vec<i64>>,
}

impl HttpLocalSession {
    async fn generate(&self, prompt: &str, context: &[i64]) -> CorrectionResult<GenerateResponse> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            context: (!context.is_empty()).then_some(context),
            options: self.options,
        };

        let response = self.client.post(&self.generate_url).json(&request).send().await?;
        let status = response.status();
        let body: GenerateResponse = response.json().await?;

        if let Some(error) = &body.error {
            return Err(helpers::transport_error(format!("本地模型返回错误: {}", error)));
        }
        if !status.is_success() {
            return Err(helpers::transport_error(format!("本地模型返回 HTTP {}", status)));
        }
        Ok(body)
    }
}

#[async_trait]
impl LanguageModel for HttpLocalSession {
    async fn complete(&self, prompt: &str) -> CorrectionResult<String> {
        // 一次只跑一个请求，保证上下文按顺序推进
        let mut context = self.context.lock().await;

        let body = tokio::time::timeout(self.timeout, self.generate(prompt, &context))
            .await
            .map_err(|_| {
                CorrectionError::TimeoutError(format!("本地模型超过 {:?} 未回答", self.timeout))
            })??;

        if let Some(next) = body.context {
            *context = next;
        }

        Ok(body.response)
    }
}
