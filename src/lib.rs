//! # idiomatic-zh
//!
//! 在用户输入中文时给出地道改写和语法纠错建议的库。
//!
//! ## 模块组织
//!
//! - `correction` - 纠错管道：分句、缓存、会话调度和模型后端
//! - `env` - 环境变量定义与文档

pub mod correction;
pub mod env;
