//! 宽松的结构化输出解析器
//!
//! 模型的回答是自由文本，可能夹带代码块标记、解释或多个数组。这里的函数
//! 从不返回错误：解析不出来就当作"没有内容"。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::correction::types::{ErrorSpan, ErrorType};

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// 成功解析
    Parsed(T),
    /// 回答为空
    Empty,
    /// 有内容但无法解析
    Malformed(String),
}

impl ParseOutcome<Vec<ErrorSpan>> {
    /// 取出错误列表；空或无法解析时视为没有错误
    pub fn into_spans(self) -> Vec<ErrorSpan> {
        match self {
            ParseOutcome::Parsed(spans) => spans,
            ParseOutcome::Empty => Vec::new(),
            ParseOutcome::Malformed(reason) => {
                tracing::debug!("错误检测结果无法解析，按无错误处理: {}", reason);
                Vec::new()
            }
        }
    }
}

/// 去掉 Markdown 代码块标记
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 找到第一个格式正确的 JSON 数组
pub fn extract_first_array(text: &str) -> Option<Value> {
    for (start, _) in text.match_indices('[') {
        let Some(end) = matching_bracket(&text[start..]) else {
            continue;
        };

        if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(&text[start..start + end + 1]) {
            return Some(value);
        }
    }

    None
}

/// 返回与开头 `[` 配对的 `]` 的字节偏移，会跳过字符串中的括号
fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// 解析错误检测步骤的回答
pub fn parse_error_spans(response: &str) -> ParseOutcome<Vec<ErrorSpan>> {
    let cleaned = strip_code_fences(response);
    if cleaned.trim().is_empty() {
        return ParseOutcome::Empty;
    }

    let Some(Value::Array(items)) = extract_first_array(&cleaned) else {
        return ParseOutcome::Malformed("回答中没有 JSON 数组".to_string());
    };

    if items.is_empty() {
        return ParseOutcome::Parsed(Vec::new());
    }

    let spans: Vec<ErrorSpan> = items.iter().filter_map(span_from_value).collect();
    if spans.is_empty() {
        ParseOutcome::Malformed(format!("{} 项都不是有效的错误描述", items.len()))
    } else {
        ParseOutcome::Parsed(spans)
    }
}

fn span_from_value(value: &Value) -> Option<ErrorSpan> {
    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

    let text = field("text").filter(|t| !t.is_empty())?;
    let error_type = field("type").as_deref().and_then(ErrorType::from_label)?;
    let suggestion = field("suggestion")?;

    Some(ErrorSpan {
        text,
        error_type,
        suggestion,
        explanation: field("explanation").unwrap_or_default(),
        explanation_translated: field("explanationTranslated").unwrap_or_default(),
    })
}

fn score_regex() -> &'static Regex {
    static SCORE: OnceLock<Regex> = OnceLock::new();
    SCORE.get_or_init(|| Regex::new(r"([0-9]*\.?[0-9]+)").expect("score pattern is valid"))
}

/// 取回答中的第一个数字作为评分，限制在 [0, 1]；找不到时为 0
pub fn extract_score(response: &str) -> f64 {
    score_regex()
        .captures(response)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// 成对出现时才去掉的引号
const QUOTE_PAIRS: &[(char, char)] = &[('"', '"'), ('“', '”'), ('「', '」'), ('『', '』')];

fn strip_paired_quotes(text: &str) -> &str {
    QUOTE_PAIRS
        .iter()
        .find_map(|(open, close)| text.strip_prefix(*open)?.strip_suffix(*close))
        .map(str::trim)
        .unwrap_or(text)
}

/// 整理改写步骤的回答：去掉代码块、外层引号和多余的行
pub fn clean_rewrite(response: &str) -> String {
    let cleaned = strip_code_fences(response);
    let line = cleaned
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    let line = strip_paired_quotes(line);

    if line == "（无输出）" {
        String::new()
    } else {
        line.to_string()
    }
}
