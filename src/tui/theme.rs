//! 主题模块
//!
//! 进度界面与摘要使用的统一配色。

use ratatui::style::{Color, Modifier, Style};

/// 主题颜色配置
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// 背景色
    pub bg: Color,
    /// 前景色
    pub fg: Color,
    /// 强调色
    pub accent: Color,
    /// 成功色
    pub success: Color,
    /// 警告色
    pub warning: Color,
    /// 错误色
    pub error: Color,
    /// 次要文字色
    pub hint: Color,
    /// 边框色
    pub border: Color,
    /// 进度条颜色
    pub progress: Color,
}

impl Theme {
    pub fn normal(&self) -> Style {
        Style::new().fg(self.fg).bg(self.bg)
    }

    pub fn title(&self) -> Style {
        Style::new()
            .fg(self.accent)
            .bg(self.bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::new().fg(self.border).bg(self.bg)
    }

    pub fn hint(&self) -> Style {
        Style::new().fg(self.hint).bg(self.bg)
    }

    pub fn accent(&self) -> Style {
        Style::new().fg(self.accent).bg(self.bg)
    }

    pub fn success(&self) -> Style {
        Style::new().fg(self.success).bg(self.bg)
    }

    pub fn warning(&self) -> Style {
        Style::new().fg(self.warning).bg(self.bg)
    }

    pub fn error(&self) -> Style {
        Style::new().fg(self.error).bg(self.bg)
    }

    /// 进度条样式
    pub fn progress(&self) -> Style {
        Style::new().fg(self.progress).bg(self.bg)
    }
}

/// 全局主题实例
pub static THEME: Theme = Theme {
    bg: Color::Black,
    fg: Color::White,
    accent: Color::Cyan,
    success: Color::Green,
    warning: Color::Yellow,
    error: Color::Red,
    hint: Color::Gray,
    border: Color::Cyan,
    progress: Color::Cyan,
};

/// 获取全局主题引用
pub fn theme() -> &'static Theme {
    &THEME
}
