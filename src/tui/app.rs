//! 终端进度界面
//!
//! 批处理在后台线程运行，界面线程接收 `ProgressEvent` 并刷新。
//! 运行期间按 Esc/q/Ctrl+C 会在当前文件完成后停止。

use crate::batch::{BatchOrchestrator, BatchSummary};
use crate::error::Result;
use crate::progress::{ChannelSink, ProgressEvent};
use crate::tui::event::{EventPoll, TuiEvent};
use crate::tui::state::ProgressView;
use crate::tui::ui::render;
use ratatui::DefaultTerminal;
use std::sync::mpsc::Receiver;
use std::thread;

/// 在终端界面中运行一次批处理
///
/// 外层 `io::Result` 表示终端本身的错误，内层是批处理的结果。
pub fn run_with_progress(mut orchestrator: BatchOrchestrator) -> std::io::Result<Result<BatchSummary>> {
    let (sink, rx) = ChannelSink::new();
    orchestrator.set_sink(sink);

    let mut terminal = ratatui::init();
    let outcome = drive(&mut terminal, orchestrator, &rx);
    ratatui::restore();
    outcome
}

fn drain(rx: &Receiver<ProgressEvent>, view: &mut ProgressView) {
    while let Ok(event) = rx.try_recv() {
        view.apply(event);
    }
}

fn drive(
    terminal: &mut DefaultTerminal,
    orchestrator: BatchOrchestrator,
    rx: &Receiver<ProgressEvent>,
) -> std::io::Result<Result<BatchSummary>> {
    let events = EventPoll::default();
    let cancel = orchestrator.cancel_token();
    let mut view = ProgressView::new();

    let mut orchestrator = orchestrator;
    let handle = thread::spawn(move || orchestrator.run());

    while !handle.is_finished() {
        drain(rx, &mut view);
        render(terminal, &view)?;

        if events.next() == TuiEvent::Cancel && !view.cancel_requested {
            cancel.cancel();
            view.cancel_requested = true;
        }
    }

    let result = handle
        .join()
        .map_err(|_| std::io::Error::other("batch worker panicked"))?;
    drain(rx, &mut view);

    // 出错时直接返回，由调用方打印错误
    if result.is_err() {
        return Ok(result);
    }

    view.finished = true;
    loop {
        render(terminal, &view)?;
        if matches!(events.next(), TuiEvent::Cancel | TuiEvent::Enter) {
            break;
        }
    }

    Ok(result)
}
