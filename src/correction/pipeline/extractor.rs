//! 文本提取模块
//!
//! 从可编辑元素读取当前文本，并判断其中是否包含中文

use crate::correction::config::constants;

/// 可编辑元素的种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// `<input>`，附带其 `type` 属性
    Input(String),
    /// `<textarea>`
    TextArea,
    /// `contenteditable` 区域
    ContentEditable,
    /// 其他元素
    Other(String),
}

impl ElementKind {
    /// 是否是会触发纠错的文本输入元素
    pub fn is_text_input(&self) -> bool {
        match self {
            ElementKind::Input(input_type) => constants::TEXT_INPUT_TYPES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(input_type.trim())),
            ElementKind::TextArea | ElementKind::ContentEditable => true,
            ElementKind::Other(_) => false,
        }
    }
}

/// 宿主页面中的可编辑元素
///
/// 由宿主实现；核心只读取文本和连接状态，写回文本由浮层负责。
pub trait EditableElement: Send + Sync {
    /// 元素种类
    fn kind(&self) -> ElementKind;

    /// 当前完整文本（输入框的 value 或可编辑区域的 innerText）
    fn text(&self) -> String;

    /// 元素是否仍挂在文档上
    fn is_connected(&self) -> bool;
}

/// 读取元素文本；非文本输入元素返回空串
pub fn read_text(element: &dyn EditableElement) -> String {
    if !element.kind().is_text_input() {
        return String::new();
    }

    // contenteditable 的 innerText 常带不换行空格
    element.text().replace('\u{a0}', " ")
}

/// 是否是 CJK 统一表意文字（U+4E00–U+9FFF）
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// 文本中是否包含中文
pub fn contains_chinese(text: &str) -> bool {
    text.chars().any(is_cjk)
}
