//! 页面上下文
//!
//! 一个页面实例的全部可变状态：建议缓存、已接受集合、会话记录和正在进行的请求。
//! 由会话控制器持有，不使用全局状态。

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};

use crate::correction::core::session::SessionTracker;
use crate::correction::storage::{AcceptedSet, SuggestionCache};
use crate::correction::types::Correction;

/// 正在进行的后端请求，相同句子的请求共享同一个结果
pub type InFlightRequest = Shared<BoxFuture<'static, Option<Correction>>>;

pub struct PageContext {
    pub cache: SuggestionCache,
    pub accepted: AcceptedSet,
    pub sessions: SessionTracker,
    pub in_flight: HashMap<String, InFlightRequest>,
    /// 每次清空加一；请求返回时代数不同则不写缓存
    pub epoch: u64,
}

impl PageContext {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: SuggestionCache::new(cache_capacity),
            accepted: AcceptedSet::new(),
            sessions: SessionTracker::new(),
            in_flight: HashMap::new(),
            epoch: 0,
        }
    }

    /// 输入框被清空时调用：清空缓存和已接受集合，并使当前会话失效
    pub fn clear(&mut self) {
        self.cache.clear();
        self.accepted.clear();
        self.in_flight.clear();
        self.sessions.cancel_active();
        self.epoch += 1;
        tracing::debug!("页面上下文已清空");
    }
}

impl Default for PageContext {
    fn default() -> Self {
        Self::new(crate::correction::config::constants::DEFAULT_CACHE_CAPACITY)
    }
}
