//! 建议缓存模块
//!
//! 以句子原文为键缓存纠错结果，并记录用户已经接受的建议，避免重复发送。

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::correction::config::constants;
use crate::correction::pipeline::segmenter::completed_sentences;
use crate::correction::types::Correction;

// ============================================================================
// 建议缓存
// ============================================================================

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub invalidations: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 句子 → 纠错结果
pub struct SuggestionCache {
    entries: LruCache<String, Correction>,
    stats: CacheStats,
}

impl SuggestionCache {
    /// 创建指定容量的缓存
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// 获取缓存结果；命中即权威，调用方不应再次请求
    pub fn get(&mut self, sentence: &str) -> Option<Correction> {
        match self.entries.get(sentence) {
            Some(correction) => {
                self.stats.hits += 1;
                Some(correction.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, sentence: &str) -> bool {
        self.entries.contains(sentence)
    }

    /// 写入结果；已有的条目保持不变，返回是否真正写入
    pub fn put(&mut self, sentence: String, correction: Correction) -> bool {
        if self.entries.contains(&sentence) {
            tracing::debug!("缓存已有结果，跳过写入: {}", sentence);
            return false;
        }

        if let Some((evicted, _)) = self.entries.push(sentence, correction) {
            tracing::debug!("缓存已满，淘汰: {}", evicted);
            self.stats.evictions += 1;
        }
        self.stats.inserts += 1;
        true
    }

    /// 删除被更长的完整句子包含的旧键
    ///
    /// 对 `full_text` 中的每个完整句子 S 和每个键 K，若 S 包含 K 且 S ≠ K，则删除 K。
    /// 这样半句时缓存的结果不会遮住后来补全的句子。
    pub fn invalidate_substrings(&mut self, full_text: &str) -> usize {
        let sentences = completed_sentences(full_text);
        if sentences.is_empty() {
            return 0;
        }

        let stale: Vec<String> = self
            .entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| sentences.iter().any(|s| s != *key && s.contains(key.as_str())))
            .cloned()
            .collect();

        for key in &stale {
            self.entries.pop(key);
            tracing::debug!("清理被包含的缓存键: {}", key);
        }

        self.stats.invalidations += stale.len() as u64;
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有缓存键（最近使用的在前）
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// 清空缓存
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(constants::DEFAULT_CACHE_CAPACITY)
    }
}

// ============================================================================
// 已接受集合
// ============================================================================

/// 用户已经写回文档的建议，按接受顺序保存以支持撤销
#[derive(Debug, Default, Clone)]
pub struct AcceptedSet {
    entries: Vec<String>,
}

impl AcceptedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条已接受的建议
    pub fn mark_accepted(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() || self.is_accepted(text) {
            return;
        }
        self.entries.push(text.to_string());
    }

    pub fn is_accepted(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e == text)
    }

    /// 移除指定的建议
    pub fn unmark_accepted(&mut self, text: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != text);
        before != self.entries.len()
    }

    /// 撤销最近一次接受
    pub fn undo_last(&mut self) -> Option<String> {
        self.entries.pop()
    }

    /// 从文本中去掉每条已接受建议的第一次出现，再修剪空白和残留标点
    pub fn remove_accepted_substrings(&self, text: &str) -> String {
        let mut result = text.to_string();

        for accepted in &self.entries {
            if let Some(pos) = result.find(accepted.as_str()) {
                result.replace_range(pos..pos + accepted.len(), "");
            }
        }

        result
            .trim()
            .trim_start_matches(constants::STRAY_PUNCTUATION)
            .trim()
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
