//! 进度界面状态
//!
//! 由 `ProgressEvent` 驱动，渲染时只读取这里的字段。

use crate::batch::Phase;
use crate::compile::CompileResult;
use crate::progress::{BatchSnapshot, ProgressEvent};
use crate::tui::components::truncate_head;
use std::collections::VecDeque;

/// 当前文件显示的最大宽度
const CURRENT_FILE_WIDTH: usize = 50;

/// 保留的最近失败条数
const RECENT_FAILURES: usize = 5;

/// 进度状态
#[derive(Debug, Default)]
pub struct ProgressView {
    /// 当前阶段
    pub phase: Phase,
    /// 已发现的设计文件数
    pub discovered: usize,
    /// 最新计数
    pub snapshot: BatchSnapshot,
    /// 当前文件（已截断）
    pub current_file: String,
    /// 最近的失败（文件名, 错误信息）
    pub recent_failures: VecDeque<(String, String)>,
    /// 用户已请求取消
    pub cancel_requested: bool,
    /// 批处理已结束
    pub finished: bool,
}

impl ProgressView {
    pub fn new() -> Self {
        Self::default()
    }

    /// 应用一条进度通知
    pub fn apply(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase(phase) => self.phase = phase,
            ProgressEvent::Discovered { count } => self.discovered = count,
            ProgressEvent::Started { total } => {
                self.snapshot = BatchSnapshot {
                    total,
                    ..BatchSnapshot::default()
                };
            }
            ProgressEvent::FileStarted { path, snapshot } => {
                self.set_current_file(&path.display().to_string());
                self.update(snapshot);
            }
            ProgressEvent::FileFinished { result, snapshot } => {
                if let CompileResult::Failure { source, message } = &result {
                    let name = source
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    self.recent_failures.push_back((name, message.clone()));
                    while self.recent_failures.len() > RECENT_FAILURES {
                        self.recent_failures.pop_front();
                    }
                }
                self.update(snapshot);
            }
            ProgressEvent::Tick(snapshot) => self.update(snapshot),
            ProgressEvent::Complete(snapshot) => {
                self.snapshot = snapshot;
                self.current_file.clear();
                self.finished = true;
            }
        }
    }

    /// 只接受不倒退的计数
    fn update(&mut self, snapshot: BatchSnapshot) {
        if snapshot.processed >= self.snapshot.processed {
            self.snapshot = snapshot;
        }
    }

    /// 设置当前处理文件
    pub fn set_current_file(&mut self, file: &str) {
        self.current_file = truncate_head(file, CURRENT_FILE_WIDTH);
    }

    /// 进度比例
    pub fn progress_ratio(&self) -> f64 {
        self.snapshot.ratio().clamp(0.0, 1.0)
    }

    pub fn phase_label(&self) -> &'static str {
        match self.phase {
            Phase::Idle if self.finished => "Finished",
            Phase::Idle => "Idle",
            Phase::Initializing => "Initializing",
            Phase::Patching => "Patching designs",
            Phase::Compiling => "Compiling reports",
            Phase::Finalizing => "Finalizing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn snapshot(total: usize, succeeded: usize, failed: usize) -> BatchSnapshot {
        BatchSnapshot {
            total,
            processed: succeeded + failed,
            succeeded,
            failed,
            current_file: None,
        }
    }

    #[test]
    fn test_apply_tracks_progress() {
        let mut view = ProgressView::new();
        view.apply(ProgressEvent::Phase(Phase::Patching));
        view.apply(ProgressEvent::Discovered { count: 2 });
        view.apply(ProgressEvent::Started { total: 2 });
        view.apply(ProgressEvent::FileStarted {
            path: PathBuf::from("reports/a.jrxml"),
            snapshot: snapshot(2, 0, 0),
        });
        view.apply(ProgressEvent::FileFinished {
            result: CompileResult::Failure {
                source: PathBuf::from("reports/a.jrxml"),
                message: "bad".into(),
            },
            snapshot: snapshot(2, 0, 1),
        });

        assert_eq!(view.discovered, 2);
        assert_eq!(view.current_file, "reports/a.jrxml");
        assert_eq!(view.snapshot.failed, 1);
        assert_eq!(view.progress_ratio(), 0.5);
        assert_eq!(
            view.recent_failures.front(),
            Some(&("a.jrxml".to_string(), "bad".to_string()))
        );

        view.apply(ProgressEvent::Complete(snapshot(2, 1, 1)));
        view.apply(ProgressEvent::Phase(Phase::Idle));
        assert!(view.finished);
        assert!(view.current_file.is_empty());
        assert_eq!(view.phase_label(), "Finished");
    }

    #[test]
    fn test_stale_tick_ignored() {
        let mut view = ProgressView::new();
        view.apply(ProgressEvent::Started { total: 3 });
        view.apply(ProgressEvent::Tick(snapshot(3, 2, 0)));
        view.apply(ProgressEvent::Tick(snapshot(3, 1, 0)));
        assert_eq!(view.snapshot.processed, 2);
    }

    #[test]
    fn test_recent_failures_bounded() {
        let mut view = ProgressView::new();
        view.apply(ProgressEvent::Started { total: 10 });
        for i in 0..8 {
            view.apply(ProgressEvent::FileFinished {
                result: CompileResult::Failure {
                    source: PathBuf::from(format!("{}.jrxml", i)),
                    message: "bad".into(),
                },
                snapshot: snapshot(10, 0, i + 1),
            });
        }
        assert_eq!(view.recent_failures.len(), RECENT_FAILURES);
        assert_eq!(view.recent_failures.back().unwrap().0, "7.jrxml");
    }
}
