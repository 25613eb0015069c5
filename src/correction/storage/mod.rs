//! 存储模块

pub mod cache;

pub use cache::{AcceptedSet, CacheStats, SuggestionCache};
