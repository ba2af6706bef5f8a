//! Ratatui 终端 UI 模块
//!
//! 批处理运行时的进度界面，以及结束后的文本摘要。

pub mod app;
pub mod components;
pub mod display;
pub mod event;
pub mod state;
pub mod theme;
pub mod ui;

pub use app::run_with_progress;
pub use display::display_summary;
pub use event::{EventPoll, TuiEvent};
pub use state::ProgressView;
pub use theme::{Theme, theme};
