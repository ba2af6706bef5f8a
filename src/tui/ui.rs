//! UI渲染模块

use crate::tui::components::{render_hint, render_title_block, three_panel_layout};
use crate::tui::state::ProgressView;
use crate::tui::theme::theme;
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Constraint, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Gauge, Paragraph, Wrap},
};

/// 设置全局背景
fn set_background(area: Rect, buf: &mut Buffer) {
    let style = Style::new().bg(theme().bg);
    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut(Position { x, y }) {
                cell.set_style(style);
            }
        }
    }
}

/// 渲染进度界面
pub fn render(terminal: &mut DefaultTerminal, view: &ProgressView) -> std::io::Result<()> {
    terminal.draw(|frame| draw(frame, frame.area(), view))?;
    Ok(())
}

fn draw(frame: &mut Frame, area: Rect, view: &ProgressView) {
    set_background(area, frame.buffer_mut());

    let [header, body, footer] = three_panel_layout(area);
    render_title_block(&format!("Jasper Batch - {}", view.phase_label()), frame, header);

    let [gauge_area, stats_area, file_area, failures_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Min(1),
    ])
    .areas(body);

    let snapshot = &view.snapshot;
    let label = format!(
        "{}/{} ({}%)",
        snapshot.processed,
        snapshot.total,
        snapshot.percent()
    );
    let gauge = Gauge::default()
        .block(
            Block::bordered()
                .title(" Progress ")
                .border_type(BorderType::Rounded)
                .border_style(theme().border()),
        )
        .gauge_style(theme().progress())
        .ratio(view.progress_ratio())
        .label(label);
    frame.render_widget(gauge, gauge_area);

    let stats = Line::from(vec![
        Span::raw("Discovered: "),
        Span::styled(view.discovered.to_string(), theme().accent()),
        Span::raw("  Succeeded: "),
        Span::styled(snapshot.succeeded.to_string(), theme().success()),
        Span::raw("  Failed: "),
        Span::styled(snapshot.failed.to_string(), theme().error()),
    ]);
    frame.render_widget(Paragraph::new(stats).style(theme().normal()), stats_area);

    if !view.current_file.is_empty() {
        let current = format!("Current: {}", view.current_file);
        let current_widget = Paragraph::new(current)
            .style(theme().hint())
            .wrap(Wrap { trim: true });
        frame.render_widget(current_widget, file_area);
    }

    if !view.recent_failures.is_empty() {
        let lines: Vec<Line> = view
            .recent_failures
            .iter()
            .map(|(name, message)| {
                Line::from(vec![
                    Span::styled(format!("✗ {}", name), theme().error()),
                    Span::raw(" - "),
                    Span::styled(message.lines().next().unwrap_or_default().to_string(), theme().hint()),
                ])
            })
            .collect();
        let failures = Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(" Recent failures ")
                    .border_type(BorderType::Rounded)
                    .border_style(theme().border()),
            )
            .style(theme().normal())
            .wrap(Wrap { trim: true });
        frame.render_widget(failures, failures_area);
    }

    let hint = if view.finished {
        "Enter/Esc: close"
    } else if view.cancel_requested {
        "Stopping after the current file..."
    } else {
        "Esc/q: stop after the current file"
    };
    render_hint(hint, frame, footer);
}
