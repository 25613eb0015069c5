//! 处理会话
//!
//! 每次防抖结束都会开始一个新会话。会话号是单调递增的代数计数，同一时刻只有
//! 最新的会话是活动的；旧会话可以跑完网络请求，但结果不会被展示。

use std::fmt;

use chrono::{DateTime, Utc};

/// 会话号（代数计数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Cancelled,
    Complete,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    /// 本次发送给后端的句子
    pub sentences: Vec<String>,
    pub status: SessionStatus,
}

/// 记录当前活动的会话
#[derive(Debug, Default)]
pub struct SessionTracker {
    next_id: u64,
    current: Option<Session>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新会话，之前仍在等待的会话被标记为已取消
    pub fn begin(&mut self) -> SessionId {
        self.cancel_active();

        self.next_id += 1;
        let id = SessionId(self.next_id);
        self.current = Some(Session {
            id,
            started_at: Utc::now(),
            sentences: Vec::new(),
            status: SessionStatus::Pending,
        });
        id
    }

    /// 取消当前会话（如果还在等待）
    pub fn cancel_active(&mut self) -> Option<SessionId> {
        let session = self.current.as_mut()?;
        if session.status != SessionStatus::Pending {
            return None;
        }

        session.status = SessionStatus::Cancelled;
        tracing::debug!("会话 {} 已被取代", session.id);
        Some(session.id)
    }

    /// 该会话的结果是否还可以展示
    pub fn is_active(&self, id: SessionId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.id == id && s.status != SessionStatus::Cancelled)
    }

    pub fn set_sentences(&mut self, id: SessionId, sentences: Vec<String>) {
        if let Some(session) = self.current.as_mut().filter(|s| s.id == id) {
            session.sentences = sentences;
        }
    }

    /// 标记会话完成，返回耗时（毫秒）
    pub fn complete(&mut self, id: SessionId) -> Option<i64> {
        let session = self
            .current
            .as_mut()
            .filter(|s| s.id == id && s.status == SessionStatus::Pending)?;

        session.status = SessionStatus::Complete;
        Some((Utc::now() - session.started_at).num_milliseconds())
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }
}
