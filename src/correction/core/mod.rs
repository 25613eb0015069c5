//! 纠错系统核心模块
//!
//! 会话控制器及其依赖的页面状态、会话记录、浮层接口和统计。
//!
//! ## 模块依赖关系
//!
//! ```text
//! SessionController (controller.rs)
//!     ├── PageContext (context.rs)
//!     │       ├── SuggestionCache / AcceptedSet (storage/cache.rs)
//!     │       └── SessionTracker (session.rs)
//!     ├── CorrectionBackend (backend/mod.rs)
//!     ├── OverlayPresenter (presenter.rs)
//!     └── ControllerStats (stats.rs)
//! ```

pub mod context;
pub mod controller;
pub mod presenter;
pub mod session;
pub mod stats;

/// 会话控制器 - 主要的对外接口
pub use controller::{ControllerSettings, SessionController, SessionOutcome, SkipReason};

pub use context::PageContext;
pub use presenter::{OverlayPresenter, PresentRequest, Suggestion};
pub use session::{Session, SessionId, SessionStatus, SessionTracker};
pub use stats::{ControllerStats, ControllerStatsSnapshot};
