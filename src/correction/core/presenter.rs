//! 浮层展示接口
//!
//! 浮层由宿主实现，只需要展示一个字符串和接受/拒绝入口。接受、拒绝和撤销由浮层
//! 回调会话控制器的 `on_accept`、`on_reject`、`on_undo`。

use std::fmt;
use std::sync::Arc;

use crate::correction::pipeline::EditableElement;

/// 合并后的建议
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// 去掉已接受内容后的原文
    pub original: String,
    pub suggestion: String,
    /// 被采纳结果中的最高有用性
    pub usefulness: f64,
}

/// 一次展示请求
#[derive(Clone)]
pub struct PresentRequest {
    pub target: Option<Arc<dyn EditableElement>>,
    pub suggestion: Suggestion,
}

impl fmt::Debug for PresentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentRequest")
            .field("target", &self.target.as_ref().map(|t| t.kind()))
            .field("suggestion", &self.suggestion)
            .finish()
    }
}

pub trait OverlayPresenter: Send + Sync {
    fn present(&self, request: PresentRequest);

    fn dismiss(&self);
}
