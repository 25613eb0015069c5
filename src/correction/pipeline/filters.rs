//! 网址过滤器模块
//!
//! 根据用户设置的黑名单/白名单决定管道是否在当前页面运行

use regex::Regex;
use url::Url;

use crate::correction::config::{CorrectionConfig, UrlFilterMode};
use crate::correction::error::{CorrectionError, CorrectionResult};

/// 网址过滤器
#[derive(Debug, Clone)]
pub struct UrlFilter {
    mode: UrlFilterMode,
    patterns: Vec<Regex>,
}

impl UrlFilter {
    /// 创建新的网址过滤器，无效的正则会被跳过并记录日志
    pub fn new(mode: UrlFilterMode, patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("跳过无效的网址规则 {}: {}", pattern, e);
                    None
                }
            })
            .collect();

        Self { mode, patterns }
    }

    /// 从配置创建
    pub fn from_config(config: &CorrectionConfig) -> Self {
        Self::new(config.url_filter_mode, &config.url_patterns)
    }

    /// 管道是否应在该页面运行
    pub fn should_run(&self, page_url: &str) -> bool {
        let matched = self.patterns.iter().any(|p| p.is_match(page_url));

        match self.mode {
            UrlFilterMode::Blocklist => !matched,
            UrlFilterMode::Allowlist => matched,
        }
    }

    /// 在当前页面的主机上禁用管道，返回新增的规则
    ///
    /// 白名单模式下改为移除匹配该网址的规则。
    pub fn disable_for_url(&mut self, page_url: &str) -> CorrectionResult<Option<String>> {
        let url = Url::parse(page_url)
            .map_err(|e| CorrectionError::InvalidInput(format!("网址无效 {}: {}", page_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CorrectionError::InvalidInput(format!("网址没有主机名: {}", page_url)))?;

        match self.mode {
            UrlFilterMode::Blocklist => {
                let pattern = format!(r"^https?://{}(?:[:/]|$)", regex::escape(host));
                if self.patterns.iter().any(|p| p.as_str() == pattern) {
                    return Ok(None);
                }
                self.patterns.push(Regex::new(&pattern)?);
                tracing::info!("已在 {} 上禁用", host);
                Ok(Some(pattern))
            }
            UrlFilterMode::Allowlist => {
                let before = self.patterns.len();
                self.patterns.retain(|p| !p.is_match(page_url));
                tracing::info!("已移除 {} 条匹配 {} 的白名单规则", before - self.patterns.len(), host);
                Ok(None)
            }
        }
    }

    /// 当前规则（用于回写设置）
    pub fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.as_str().to_string()).collect()
    }

    pub fn mode(&self) -> UrlFilterMode {
        self.mode
    }
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new(UrlFilterMode::Blocklist, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocklist() {
        let filter = UrlFilter::new(
            UrlFilterMode::Blocklist,
            &[r"^https://docs\.example\.com/".to_string()],
        );

        assert!(!filter.should_run("https://docs.example.com/page"));
        assert!(filter.should_run("https://mail.example.com/inbox"));
    }

    #[test]
    fn test_allowlist() {
        let filter = UrlFilter::new(
            UrlFilterMode::Allowlist,
            &[r"mail\.example\.com".to_string()],
        );

        assert!(filter.should_run("https://mail.example.com/inbox"));
        assert!(!filter.should_run("https://news.example.com/"));
    }

    #[test]
    fn test_empty_filter() {
        assert!(UrlFilter::default().should_run("https://anything.example.com/"));
        assert!(!UrlFilter::new(UrlFilterMode::Allowlist, &[]).should_run("https://a.example.com/"));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let filter = UrlFilter::new(
            UrlFilterMode::Blocklist,
            &["([".to_string(), "example".to_string()],
        );
        assert_eq!(filter.patterns().len(), 1);
        assert!(!filter.should_run("https://example.com/"));
    }

    #[test]
    fn test_disable_for_url() {
        let mut filter = UrlFilter::default();
        let added = filter
            .disable_for_url("https://www.example.com/path?q=1")
            .unwrap();
        assert!(added.is_some());

        assert!(!filter.should_run("https://www.example.com/other"));
        assert!(!filter.should_run("http://www.example.com"));
        assert!(filter.should_run("https://www.example.com.evil.test/"));

        // 重复禁用不会新增规则
        assert_eq!(filter.disable_for_url("https://www.example.com/").unwrap(), None);
        assert_eq!(filter.patterns().len(), 1);
    }

    #[test]
    fn test_disable_for_url_in_allowlist_mode() {
        let mut filter = UrlFilter::new(UrlFilterMode::Allowlist, &[r"example\.com".to_string()]);
        filter.disable_for_url("https://example.com/a").unwrap();
        assert!(!filter.should_run("https://example.com/a"));
    }

    #[test]
    fn test_disable_for_invalid_url() {
        let mut filter = UrlFilter::default();
        assert!(matches!(
            filter.disable_for_url("not a url"),
            Err(CorrectionError::InvalidInput(_))
        ));
    }
}
