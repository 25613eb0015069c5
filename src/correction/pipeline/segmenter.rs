//! 分句模块
//!
//! 以中西文句号为边界把文本切成句子，并统计"词数"以过滤过短的片段

use crate::correction::config::constants;
use crate::correction::pipeline::extractor::is_cjk;

/// 以句号结尾的完整句子（已去除首尾空白）
pub fn completed_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if constants::SENTENCE_TERMINATORS.contains(&c) {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    sentences
}

/// 把文本切分成句子单元
///
/// 末尾没有句号的残句会被丢弃；只有整段文本都没有句号时，才把整段
/// （去除空白后）当作唯一的单元，是否足够长由词数过滤决定。
pub fn segment(text: &str) -> Vec<String> {
    let has_terminator = text
        .chars()
        .any(|c| constants::SENTENCE_TERMINATORS.contains(&c));

    if has_terminator {
        completed_sentences(text)
    } else {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }
}

/// 统计词数：每个汉字算一个词，其余非空白字符的连续片段算一个词
pub fn word_count(text: &str) -> usize {
    let mut count = 0;
    let mut in_run = false;

    for c in text.chars() {
        if is_cjk(c) {
            count += 1;
            in_run = false;
        } else if c.is_whitespace() {
            in_run = false;
        } else if !in_run {
            count += 1;
            in_run = true;
        }
    }

    count
}

/// 句子是否足够长，值得发给模型
pub fn is_eligible(sentence: &str, min_words: usize) -> bool {
    word_count(sentence) >= min_words
}
