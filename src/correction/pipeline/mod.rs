//! 文本处理管道模块
//!
//! 文本提取、分句和网址过滤

pub mod extractor;
pub mod filters;
pub mod segmenter;

pub use extractor::{contains_chinese, read_text, EditableElement, ElementKind};
pub use filters::UrlFilter;
pub use segmenter::{completed_sentences, is_eligible, segment, word_count};
