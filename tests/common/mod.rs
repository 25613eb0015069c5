// 集成测试公共模块
//
// 提供可编排的模型/后端、记录型浮层和假的可编辑元素

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use idiomatic_zh::correction::backend::{
    Availability, CorrectionBackend, LanguageModel, LocalModelProvider,
};
use idiomatic_zh::correction::core::{
    ControllerSettings, OverlayPresenter, PresentRequest, SessionController, Suggestion,
};
use idiomatic_zh::correction::error::{CorrectionError, CorrectionResult};
use idiomatic_zh::correction::pipeline::{EditableElement, ElementKind};
use idiomatic_zh::correction::types::Correction;

// ============================================================================
// 后端
// ============================================================================

/// 预设回答
#[derive(Clone)]
pub struct Reply {
    pub result: CorrectionResult<Correction>,
    pub delay: Duration,
}

/// 按句子返回预设结果的后端，并记录每次调用
#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, sentence: &str, text: &str, usefulness: f64) -> &Self {
        self.reply_after(sentence, text, usefulness, Duration::ZERO)
    }

    pub fn reply_after(&self, sentence: &str, text: &str, usefulness: f64, delay: Duration) -> &Self {
        self.replies.lock().unwrap().insert(
            sentence.to_string(),
            Reply {
                result: Ok(Correction::new(text, usefulness)),
                delay,
            },
        );
        self
    }

    pub fn fail(&self, sentence: &str, error: CorrectionError) -> &Self {
        self.replies.lock().unwrap().insert(
            sentence.to_string(),
            Reply {
                result: Err(error),
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CorrectionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn correct(&self, sentence: &str) -> CorrectionResult<Correction> {
        self.calls.lock().unwrap().push(sentence.to_string());

        let reply = self.replies.lock().unwrap().get(sentence).cloned();
        let Some(reply) = reply else {
            // 没有预设时按"无需改写"处理
            return Ok(Correction::no_change(Vec::new()));
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}

// ============================================================================
// 语言模型
// ============================================================================

/// 按顺序返回预设回答的语言模型，记录收到的提示词
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn push_replies(&self, replies: &[&str]) {
        self.replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> CorrectionResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CorrectionError::TransportError("没有更多预设回答".to_string()))
    }
}

/// 本地模型提供者，可随时改变可用状态
pub struct ScriptedProvider {
    availability: Mutex<Availability>,
    model: Arc<ScriptedModel>,
    sessions_created: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(availability: Availability, model: Arc<ScriptedModel>) -> Arc<Self> {
        Arc::new(Self {
            availability: Mutex::new(availability),
            model,
            sessions_created: AtomicUsize::new(0),
        })
    }

    pub fn set_availability(&self, availability: Availability) {
        *self.availability.lock().unwrap() = availability;
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalModelProvider for ScriptedProvider {
    async fn availability(&self) -> CorrectionResult<Availability> {
        Ok(*self.availability.lock().unwrap())
    }

    async fn create_session(&self) -> CorrectionResult<Arc<dyn LanguageModel>> {
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.model.clone())
    }
}

// ============================================================================
// 浮层与元素
// ============================================================================

/// 记录所有展示和关闭
#[derive(Default)]
pub struct RecordingPresenter {
    presented: Mutex<Vec<Suggestion>>,
    dismissed: AtomicUsize,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn presented(&self) -> Vec<Suggestion> {
        self.presented.lock().unwrap().clone()
    }

    pub fn dismiss_count(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }
}

impl OverlayPresenter for RecordingPresenter {
    fn present(&self, request: PresentRequest) {
        self.presented.lock().unwrap().push(request.suggestion);
    }

    fn dismiss(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

/// 假的可编辑元素
pub struct FakeElement {
    kind: ElementKind,
    text: Mutex<String>,
    connected: AtomicBool,
}

impl FakeElement {
    pub fn textarea(text: &str) -> Arc<Self> {
        Self::with_kind(ElementKind::TextArea, text)
    }

    pub fn with_kind(kind: ElementKind, text: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            text: Mutex::new(text.to_string()),
            connected: AtomicBool::new(true),
        })
    }

    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    pub fn detach(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl EditableElement for FakeElement {
    fn kind(&self) -> ElementKind {
        self.kind.clone()
    }

    fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ============================================================================
// 构建助手
// ============================================================================

pub fn controller_with(
    backend: Arc<dyn CorrectionBackend>,
    presenter: Arc<RecordingPresenter>,
) -> Arc<SessionController> {
    Arc::new(SessionController::new(
        backend,
        presenter,
        ControllerSettings::default(),
    ))
}

// ============================================================================
// 假的模型服务
// ============================================================================

/// 在本机随机端口启动一个 HTTP 服务，返回基础地址
///
/// `handler` 收到请求路径和 JSON 请求体，返回应答前的延迟和 JSON 应答。
/// 每个连接单独处理，应答后关闭连接。
pub async fn spawn_model_server<F>(handler: F) -> String
where
    F: Fn(&str, &Value) -> (Duration, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let Some((path, body)) = read_request(&mut socket).await else {
                    return;
                };
                let (delay, reply) = handler(&path, &body);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let payload = reply.to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

async fn read_request(socket: &mut TcpStream) -> Option<(String, Value)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head.split_whitespace().nth(1)?.to_string();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    Some((path, body))
}

/// 按提示词判断是三步中的哪一步
pub fn prompt_step(prompt: &str) -> &'static str {
    if prompt.contains("校对老师") {
        "detect"
    } else if prompt.contains("原句：") {
        "rate"
    } else {
        "rewrite"
    }
}
