//! 云端模型后端
//!
//! 使用托管的 messages 接口执行与本地相同的三步流程，每次调用都是独立的单次请求。
//! 凭据缺失属于硬错误，直接返回 `BackendUnavailable`，不重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::correction::backend::{flow::run_correction, CorrectionBackend, LanguageModel};
use crate::correction::config::{constants, CorrectionConfig};
use crate::correction::error::{helpers, CorrectionResult};
use crate::correction::types::Correction;

/// 云端纠错后端
pub struct CloudBackend {
    api_key: String,
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl CloudBackend {
    pub fn from_config(config: &CorrectionConfig) -> CorrectionResult<Self> {
        let client = MessagesClient::from_config(config)?;
        Ok(Self::with_model(&config.api_key, Arc::new(client), config.request_timeout()))
    }

    /// 使用任意模型实现创建（测试时替换网络层）
    pub fn with_model(api_key: &str, model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            model,
            timeout,
        }
    }
}

#[async_trait]
impl CorrectionBackend for CloudBackend {
    fn name(&self) -> &str {
        "cloud"
    }

    async fn correct(&self, sentence: &str) -> CorrectionResult<Correction> {
        if self.api_key.is_empty() {
            return Err(helpers::unavailable("未配置云端API密钥"));
        }
        run_correction(self.model.as_ref(), sentence, Some(self.timeout)).await
    }
}

// ============================================================================
// messages 接口客户端
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// 取出回答中的文本块；错误对象视为传输错误，空内容原样返回
fn response_text(response: MessagesResponse) -> CorrectionResult<String> {
    if let Some(error) = response.error {
        return Err(helpers::transport_error(format!("云端接口返回错误: {}", error.message)));
    }

    Ok(response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text)
        .collect())
}

/// 托管 messages 接口的客户端
pub struct MessagesClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl MessagesClient {
    pub fn from_config(config: &CorrectionConfig) -> CorrectionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_url: config.cloud_api_url.clone(),
            api_key: config.api_key.trim().to_string(),
            model: config.cloud_model.clone(),
            max_tokens: config.cloud_max_tokens,
        })
    }

    async fn send(&self, prompt: &str, max_tokens: u32) -> CorrectionResult<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", constants::DEFAULT_CLOUD_API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: MessagesResponse = response.json().await?;
        if body.error.is_none() && !status.is_success() {
            return Err(helpers::transport_error(format!("云端接口返回 HTTP {}", status)));
        }

        response_text(body)
    }
}

#[async_trait]
impl LanguageModel for MessagesClient {
    /// 检测和改写：空内容视为传输错误
    async fn complete(&self, prompt: &str) -> CorrectionResult<String> {
        let text = self.send(prompt, self.max_tokens).await?;
        if text.is_empty() {
            return Err(helpers::transport_error("云端接口返回空内容"));
        }
        Ok(text)
    }

    /// 评分：空内容交给评分解析，记 0 分
    async fn complete_brief(&self, prompt: &str) -> CorrectionResult<String> {
        self.send(prompt, constants::RATING_MAX_TOKENS).await
    }
}
