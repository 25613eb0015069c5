//! 会话控制器统计
//!
//! 计数器使用原子操作，错误明细放在 `ErrorStats` 里由互斥锁保护。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::correction::error::{CorrectionError, ErrorStats};

#[derive(Debug, Default)]
pub struct ControllerStats {
    /// 开始的会话数
    pub sessions_started: AtomicUsize,

    /// 结果因被新会话取代而丢弃的会话数
    pub sessions_superseded: AtomicUsize,

    /// 交给浮层展示的建议数
    pub suggestions_presented: AtomicUsize,

    /// 实际发给后端的句子数（合并的重复请求不计）
    pub units_dispatched: AtomicUsize,

    /// 后端调用失败的句子数
    pub units_failed: AtomicUsize,

    /// 因已有缓存而跳过的句子数
    pub cache_hits: AtomicUsize,

    errors: Mutex<ErrorStats>,
}

impl ControllerStats {
    pub fn inc_sessions_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sessions_superseded(&self) {
        self.sessions_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_suggestions_presented(&self) {
        self.suggestions_presented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_units_dispatched(&self) {
        self.units_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次失败的后端调用
    pub fn record_failure(&self, error: &CorrectionError) {
        self.units_failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut errors) = self.errors.lock() {
            errors.record_error(error);
        }
    }

    /// 错误明细的副本
    pub fn errors(&self) -> ErrorStats {
        self.errors
            .lock()
            .map(|errors| errors.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> ControllerStatsSnapshot {
        ControllerStatsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_superseded: self.sessions_superseded.load(Ordering::Relaxed),
            suggestions_presented: self.suggestions_presented.load(Ordering::Relaxed),
            units_dispatched: self.units_dispatched.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// 统计数据的快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStatsSnapshot {
    pub sessions_started: usize,
    pub sessions_superseded: usize,
    pub suggestions_presented: usize,
    pub units_dispatched: usize,
    pub units_failed: usize,
    pub cache_hits: usize,
}

impl ControllerStatsSnapshot {
    /// 后端调用失败率
    pub fn failure_rate(&self) -> f64 {
        if self.units_dispatched == 0 {
            0.0
        } else {
            self.units_failed as f64 / self.units_dispatched as f64
        }
    }
}
