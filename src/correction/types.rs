//! 纠错结果类型

use serde::{Deserialize, Serialize};

/// 模型发现的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ErrorType {
    #[serde(alias = "字词错误")]
    WordError,
    #[serde(alias = "标点误用")]
    PunctuationError,
    #[serde(alias = "语序问题")]
    WordOrderError,
    #[serde(alias = "语法问题")]
    GrammarError,
}

impl ErrorType {
    /// 提示词中使用的中文标签
    pub fn label(&self) -> &'static str {
        match self {
            ErrorType::WordError => "字词错误",
            ErrorType::PunctuationError => "标点误用",
            ErrorType::WordOrderError => "语序问题",
            ErrorType::GrammarError => "语法问题",
        }
    }

    /// 宽松地识别模型输出中的类别（中英文均可）
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "字词错误" | "WordError" => Some(ErrorType::WordError),
            "标点误用" | "标点错误" | "PunctuationError" => Some(ErrorType::PunctuationError),
            "语序问题" | "语序错误" | "WordOrderError" => Some(ErrorType::WordOrderError),
            "语法问题" | "语法错误" | "GrammarError" => Some(ErrorType::GrammarError),
            _ => None,
        }
    }
}

/// 一处被标记的错误
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSpan {
    pub text: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub suggestion: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub explanation_translated: String,
}

/// 单个句子的纠错结果，写入缓存后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub suggested_text: String,
    pub usefulness: f64,
    pub detected_errors: Vec<ErrorSpan>,
}

impl Correction {
    pub fn new(suggested_text: impl Into<String>, usefulness: f64) -> Self {
        Self {
            suggested_text: suggested_text.into(),
            usefulness: usefulness.clamp(0.0, 1.0),
            detected_errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<ErrorSpan>) -> Self {
        self.detected_errors = errors;
        self
    }

    /// 模型认为不需要改写
    pub fn no_change(errors: Vec<ErrorSpan>) -> Self {
        Self::new(String::new(), 0.0).with_errors(errors)
    }

    /// 是否超过有用性阈值（严格大于）
    pub fn is_useful(&self, threshold: f64) -> bool {
        self.usefulness > threshold && !self.suggested_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_span_wire_format() {
        let span: ErrorSpan = serde_json::from_str(
            r#"{"text":"涉及","type":"字词错误","suggestion":"设计","explanationTranslated":"design"}"#,
        )
        .unwrap();
        assert_eq!(span.error_type, ErrorType::WordError);
        assert_eq!(span.explanation, "");
        assert_eq!(span.explanation_translated, "design");

        let json = serde_json::to_string(&span).unwrap();
        assert!(json.contains(r#""type":"WordError""#));
        assert!(json.contains("explanationTranslated"));
    }

    #[test]
    fn test_from_label() {
        assert_eq!(ErrorType::from_label(" 标点误用 "), Some(ErrorType::PunctuationError));
        assert_eq!(ErrorType::from_label("GrammarError"), Some(ErrorType::GrammarError));
        assert_eq!(ErrorType::from_label("拼写"), None);
    }

    #[test]
    fn test_usefulness_gate_is_strict() {
        assert!(!Correction::new("我今天非常忙。", 0.5).is_useful(0.5));
        assert!(Correction::new("我今天非常忙。", 0.51).is_useful(0.5));
        assert!(!Correction::new("", 0.9).is_useful(0.5));
    }

    #[test]
    fn test_usefulness_is_clamped() {
        assert_eq!(Correction::new("x", 3.0).usefulness, 1.0);
        assert_eq!(Correction::new("x", -1.0).usefulness, 0.0);
    }
}
