//! 汇总显示模块
//!
//! 批处理结束后在标准输出打印摘要。

use crate::batch::BatchSummary;
use crate::compile::CompileResult;

/// 最多列出的失败文件数
const MAX_LISTED_FAILURES: usize = 5;

/// 显示处理摘要
pub fn display_summary(summary: &BatchSummary) {
    println!("\n{}", "═".repeat(60));
    println!("{:^60}", "Compilation complete");
    println!("{}", "═".repeat(60));

    println!("\n  Statistics");
    println!("  {}", "─".repeat(40));
    println!("    > Total: {}", summary.total);
    println!("    ✓ Succeeded: {}", summary.succeeded);
    println!("    ✗ Failed: {}", summary.failed);
    println!("    ◷ Elapsed: {:.1}s", summary.elapsed_ms as f64 / 1000.0);

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        println!("\n  Failed designs");
        println!("  {}", "─".repeat(40));
        for (i, result) in failures.iter().take(MAX_LISTED_FAILURES).enumerate() {
            if let CompileResult::Failure { source, message } = result {
                println!(
                    "    {}. {} - {}",
                    i + 1,
                    source.file_name().unwrap_or_default().to_string_lossy(),
                    message.lines().next().unwrap_or_default()
                );
            }
        }
        if failures.len() > MAX_LISTED_FAILURES {
            println!("    ... and {} more", failures.len() - MAX_LISTED_FAILURES);
        }
    }

    if summary.cancelled {
        println!(
            "\n  Stopped early: {} of {} designs were not attempted",
            summary.total - summary.succeeded - summary.failed,
            summary.total
        );
    }

    if let Some(error) = &summary.cleanup_error {
        println!("\n  Staging directory was not removed: {}", error);
    }

    println!("\n{}", "═".repeat(60));
}
