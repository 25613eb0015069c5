//! 会话控制器
//!
//! 把按键事件流变成一次去重、不闪烁的纠错建议。这是纠错系统的核心调度器，
//! 负责协调分句、缓存、后端调用和浮层展示。
//!
//! ## 处理流程
//!
//! 1. **防抖**: 每次按键重置计时器，输入停顿后才开始会话
//! 2. **开始会话**: 生成新的会话号，之前的会话全部失效
//! 3. **预过滤**: 去掉已接受的建议；没有中文则结束
//! 4. **缓存清理**: 删除被更长的完整句子包含的旧键
//! 5. **选句**: 去掉已缓存、已接受和过短的句子
//! 6. **分发**: 每个句子并发调用一次后端
//! 7. **汇合**: 等全部返回；会话已被取代则丢弃结果
//! 8. **过滤**: 只保留有用性严格大于阈值的结果
//! 9. **合并**: 在原文中替换每个句子的第一次出现
//! 10. **展示**: 合并结果与原文不同时交给浮层
//!
//! 每个成功的结果都会写入缓存，与是否展示无关，所以被取代的会话也会填充缓存。
//!
//! ## 取消语义
//!
//! 取消是协作式的：网络请求不会被中止，只在汇合时检查会话号。
//! 唯一的取消触发是新的防抖周期。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::future::{join_all, FutureExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::correction::backend::CorrectionBackend;
use crate::correction::config::{constants, CorrectionConfig};
use crate::correction::core::context::{InFlightRequest, PageContext};
use crate::correction::core::presenter::{OverlayPresenter, PresentRequest, Suggestion};
use crate::correction::core::stats::ControllerStats;
use crate::correction::error::{helpers, CorrectionError, CorrectionResult};
use crate::correction::pipeline::{
    contains_chinese, is_eligible, read_text, segment, EditableElement, UrlFilter,
};
use crate::correction::types::Correction;

/// 控制器参数
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub debounce: Duration,
    pub usefulness_threshold: f64,
    pub min_word_count: usize,
    pub cache_capacity: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            debounce: constants::DEFAULT_DEBOUNCE,
            usefulness_threshold: constants::DEFAULT_USEFULNESS_THRESHOLD,
            min_word_count: constants::DEFAULT_MIN_WORD_COUNT,
            cache_capacity: constants::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl From<&CorrectionConfig> for ControllerSettings {
    fn from(config: &CorrectionConfig) -> Self {
        Self {
            debounce: config.debounce(),
            usefulness_threshold: config.usefulness_threshold,
            min_word_count: config.min_word_count,
            cache_capacity: config.cache_capacity,
        }
    }
}

/// 会话没有展示建议的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 当前页面被网址过滤器禁用
    Disabled,
    /// 目标元素已经不在文档中
    Disconnected,
}

/// 一次会话的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// 建议已交给浮层
    Presented(Suggestion),
    /// 没有足够有用的改写
    NoChange,
    /// 没有需要发送的句子
    NothingToSend,
    Skipped(SkipReason),
    /// 会话在汇合前被新会话取代，结果只进入缓存
    Superseded,
}

/// 一个页面实例的会话控制器
///
/// 持有该页面的全部状态（[`PageContext`]），缓存和已接受集合只通过控制器的方法
/// 和浮层回调修改。状态由一把异步锁保护，调用后端时不持有该锁。
pub struct SessionController {
    backend: Arc<dyn CorrectionBackend>,
    presenter: Arc<dyn OverlayPresenter>,
    context: Arc<Mutex<PageContext>>,
    settings: ControllerSettings,
    /// 等待中的防抖计时器
    pending: StdMutex<Option<JoinHandle<()>>>,
    stats: Arc<ControllerStats>,
    url_filter: StdMutex<UrlFilter>,
    page_url: Option<String>,
    enabled: AtomicBool,
}

impl SessionController {
    /// 创建不关联页面网址的控制器（总是启用）
    pub fn new(
        backend: Arc<dyn CorrectionBackend>,
        presenter: Arc<dyn OverlayPresenter>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            backend,
            presenter,
            context: Arc::new(Mutex::new(PageContext::new(settings.cache_capacity))),
            settings,
            pending: StdMutex::new(None),
            stats: Arc::new(ControllerStats::default()),
            url_filter: StdMutex::new(UrlFilter::default()),
            page_url: None,
            enabled: AtomicBool::new(true),
        }
    }

    /// 为某个页面创建控制器
    ///
    /// 根据配置中的网址黑名单/白名单决定管道是否在该页面运行。
    ///
    /// # 参数
    ///
    /// * `config` - 纠错配置，提供控制器参数和网址规则
    /// * `backend` - 纠错后端
    /// * `presenter` - 浮层
    /// * `page_url` - 当前页面网址
    pub fn for_page(
        config: &CorrectionConfig,
        backend: Arc<dyn CorrectionBackend>,
        presenter: Arc<dyn OverlayPresenter>,
        page_url: &str,
    ) -> Self {
        let filter = UrlFilter::from_config(config);
        let enabled = filter.should_run(page_url);
        if !enabled {
            tracing::info!("网址规则禁用了此页面: {}", page_url);
        }

        Self {
            url_filter: StdMutex::new(filter),
            page_url: Some(page_url.to_string()),
            enabled: AtomicBool::new(enabled),
            ..Self::new(backend, presenter, ControllerSettings::from(config))
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// 页面上下文（测试和调试用）
    pub fn context(&self) -> &Arc<Mutex<PageContext>> {
        &self.context
    }

    // ========================================================================
    // 宿主事件
    // ========================================================================

    /// 可编辑元素的文本发生变化
    ///
    /// 非文本输入元素被忽略；文本为空时清空上下文并关闭浮层；不含中文时只取消
    /// 等待中的计时器。其余情况重置防抖计时器，计时结束后在独立任务里运行会话，
    /// 之后的按键不会中断已经开始的会话。
    pub async fn on_text_changed(self: &Arc<Self>, element: Arc<dyn EditableElement>) {
        if !self.is_enabled() || !element.kind().is_text_input() {
            return;
        }

        let text = read_text(element.as_ref());
        if text.trim().is_empty() {
            self.clear().await;
            return;
        }
        if !contains_chinese(&text) {
            self.cancel_pending();
            return;
        }

        let this = Arc::clone(self);
        let delay = self.settings.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(async move {
                let outcome = this.process_text(&text, Some(element)).await;
                tracing::debug!("会话结束: {:?}", outcome);
            });
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(timer) {
                previous.abort();
            }
        }
    }

    /// 取消等待中的防抖计时器
    pub fn cancel_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(timer) = pending.take() {
                timer.abort();
            }
        }
    }

    // ========================================================================
    // 会话
    // ========================================================================

    /// 对一段完整文本运行一次会话
    ///
    /// 防抖之外的全部步骤都在这里完成，CLI 和测试可以直接调用。
    ///
    /// # 参数
    ///
    /// * `raw` - 元素的完整文本
    /// * `target` - 展示建议时附带的目标元素；展示前会检查它是否仍在文档中
    ///
    /// # 返回值
    ///
    /// 返回本次会话的结果。后端错误不会返回给调用方，只记录到日志和统计中。
    pub async fn process_text(
        &self,
        raw: &str,
        target: Option<Arc<dyn EditableElement>>,
    ) -> SessionOutcome {
        if !self.is_enabled() {
            return SessionOutcome::Skipped(SkipReason::Disabled);
        }

        let (session_id, working, units, requests) = {
            let mut context = self.context.lock().await;
            let session_id = context.sessions.begin();
            self.stats.inc_sessions_started();
            tracing::debug!("开始会话 {}", session_id);

            let working = context.accepted.remove_accepted_substrings(raw);
            if working.is_empty() || !contains_chinese(&working) {
                context.sessions.complete(session_id);
                return SessionOutcome::NothingToSend;
            }

            context.cache.invalidate_substrings(raw);

            let units = self.select_units(&mut context, &working);
            if units.is_empty() {
                context.sessions.complete(session_id);
                return SessionOutcome::NothingToSend;
            }

            context.sessions.set_sentences(session_id, units.clone());
            let requests: Vec<InFlightRequest> = units
                .iter()
                .map(|unit| self.dispatch(&mut context, unit))
                .collect();

            (session_id, working, units, requests)
        };

        tracing::info!("会话 {} 发送 {} 个句子", session_id, units.len());
        let results = join_all(requests).await;

        let mut context = self.context.lock().await;
        if !context.sessions.is_active(session_id) {
            self.stats.inc_sessions_superseded();
            tracing::debug!("会话 {} 已被取代，丢弃结果", session_id);
            return SessionOutcome::Superseded;
        }
        if let Some(elapsed) = context.sessions.complete(session_id) {
            tracing::debug!("会话 {} 用时 {}ms", session_id, elapsed);
        }

        let Some(suggestion) = self.merge(&working, &units, &results) else {
            return SessionOutcome::NoChange;
        };

        if let Some(element) = &target {
            if !element.is_connected() {
                tracing::debug!("目标元素已离开文档，不展示建议");
                return SessionOutcome::Skipped(SkipReason::Disconnected);
            }
        }

        // 持锁展示，保证此时没有更新的会话开始
        self.presenter.present(PresentRequest {
            target,
            suggestion: suggestion.clone(),
        });
        self.stats.inc_suggestions_presented();
        drop(context);

        tracing::info!(
            "会话 {} 展示建议（有用性 {:.2}）",
            session_id,
            suggestion.usefulness
        );
        SessionOutcome::Presented(suggestion)
    }

    /// 选出需要发送的句子：去重，去掉已缓存、已接受和过短的句子
    fn select_units(&self, context: &mut PageContext, working: &str) -> Vec<String> {
        let mut units: Vec<String> = Vec::new();

        for unit in segment(working) {
            if units.contains(&unit) {
                continue;
            }
            if context.cache.get(&unit).is_some() {
                self.stats.inc_cache_hits();
                continue;
            }
            if context.accepted.is_accepted(&unit) {
                continue;
            }
            if !is_eligible(&unit, self.settings.min_word_count) {
                continue;
            }
            units.push(unit);
        }

        units
    }

    /// 为一个句子发起请求；同一句子已有请求在进行时复用它
    fn dispatch(&self, context: &mut PageContext, unit: &str) -> InFlightRequest {
        if let Some(existing) = context.in_flight.get(unit) {
            tracing::debug!("句子已在请求中，复用结果: {}", unit);
            return existing.clone();
        }

        let request = request_unit(
            Arc::clone(&self.backend),
            Arc::clone(&self.context),
            Arc::clone(&self.stats),
            unit.to_string(),
            context.epoch,
        )
        .boxed()
        .shared();

        context.in_flight.insert(unit.to_string(), request.clone());
        self.stats.inc_units_dispatched();
        request
    }

    /// 合并有用的结果；与原文相同时返回 None
    fn merge(
        &self,
        working: &str,
        units: &[String],
        results: &[Option<Correction>],
    ) -> Option<Suggestion> {
        let mut combined = working.to_string();
        let mut usefulness: f64 = 0.0;

        for (unit, result) in units.iter().zip(results) {
            let Some(correction) = result else {
                continue;
            };
            if !correction.is_useful(self.settings.usefulness_threshold) {
                continue;
            }

            // 只替换第一次出现
            if let Some(pos) = combined.find(unit.as_str()) {
                combined.replace_range(pos..pos + unit.len(), &correction.suggested_text);
            }
            usefulness = usefulness.max(correction.usefulness);
        }

        if combined == working {
            return None;
        }

        Some(Suggestion {
            original: working.to_string(),
            suggestion: combined,
            usefulness,
        })
    }

    // ========================================================================
    // 浮层回调
    // ========================================================================

    /// 用户接受了建议：记入已接受集合，之后不再发送
    pub async fn on_accept(&self, suggestion: &Suggestion) {
        self.context
            .lock()
            .await
            .accepted
            .mark_accepted(&suggestion.suggestion);
        self.presenter.dismiss();
        tracing::debug!("已接受建议: {}", suggestion.suggestion);
    }

    /// 用户拒绝了建议；结果已在缓存里，同样的句子不会再次发送
    pub async fn on_reject(&self) {
        self.presenter.dismiss();
        tracing::debug!("建议被拒绝");
    }

    /// 撤销最近一次接受，返回被移除的建议
    pub async fn on_undo(&self) -> Option<String> {
        let undone = self.context.lock().await.accepted.undo_last();
        if let Some(text) = &undone {
            tracing::debug!("撤销接受: {}", text);
        }
        undone
    }

    /// 清空页面状态并关闭浮层（元素文本变为空时）
    pub async fn clear(&self) {
        self.cancel_pending();
        self.context.lock().await.clear();
        self.presenter.dismiss();
    }

    // ========================================================================
    // 网址过滤
    // ========================================================================

    /// 在当前页面的主机上禁用管道，立即生效
    ///
    /// 返回新增的黑名单规则，调用方负责把 [`Self::url_patterns`] 写回设置。
    pub fn disable_for_current_page(&self) -> CorrectionResult<Option<String>> {
        let page_url = self
            .page_url
            .as_deref()
            .ok_or_else(|| helpers::validation_error("控制器没有关联页面网址"))?;

        let added = {
            let mut filter = self
                .url_filter
                .lock()
                .map_err(|e| CorrectionError::InternalError(format!("网址过滤器锁异常: {}", e)))?;
            let added = filter.disable_for_url(page_url)?;
            self.enabled
                .store(filter.should_run(page_url), Ordering::Relaxed);
            added
        };

        self.cancel_pending();
        self.presenter.dismiss();
        Ok(added)
    }

    /// 当前的网址规则
    pub fn url_patterns(&self) -> Vec<String> {
        self.url_filter
            .lock()
            .map(|filter| filter.patterns())
            .unwrap_or_default()
    }
}

/// 调用后端并把结果写入缓存
///
/// 失败的句子返回 None，不写缓存，不影响同一会话的其他句子。上下文在请求期间被
/// 清空过（代数变化）时不写缓存。
async fn request_unit(
    backend: Arc<dyn CorrectionBackend>,
    context: Arc<Mutex<PageContext>>,
    stats: Arc<ControllerStats>,
    unit: String,
    epoch: u64,
) -> Option<Correction> {
    let result = backend.correct(&unit).await;

    let mut context = context.lock().await;
    let current = context.epoch == epoch;
    if current {
        context.in_flight.remove(&unit);
    }

    match result {
        Ok(correction) => {
            if current {
                context.cache.put(unit, correction.clone());
            } else {
                tracing::debug!("上下文已清空，不缓存迟到的结果: {}", unit);
            }
            Some(correction)
        }
        Err(e) => {
            helpers::log_error(&e.clone().with_context(backend.name()));
            stats.record_failure(&e);
            None
        }
    }
}
