//! Jasper Batch - batch compiler for JasperReports designs
//!
//! Rewrites one attribute across a directory of report designs, compiles
//! the rewritten copies through an external report compiler and keeps
//! success, error and fail-list logs of every run.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use jasper_batch::progress::LogSink;
use jasper_batch::{
    BatchOrchestrator, BatchSummary, Cli, CommandCompiler, CompileResult, RunConfig,
    display_summary, run_with_progress,
};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! CLI 输出美化模块
    //!
    //! 为命令行输出提供统一的颜色和格式样式。

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI 主题颜色
    pub struct CliTheme;

    impl CliTheme {
        /// 成功颜色（绿色）
        pub const SUCCESS: Color = Color::Green;
        /// 警告颜色（黄色）
        pub const WARNING: Color = Color::Yellow;
        /// 错误颜色（红色）
        pub const ERROR: Color = Color::Red;
        /// 提示颜色（暗灰色）
        pub const HINT: Color = Color::DarkGrey;
        /// 强调颜色（青色）
        pub const ACCENT: Color = Color::Cyan;
    }

    /// 打印分隔线
    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// 打印警告消息
    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// 打印提示消息
    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// 打印统计项
    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印处理结果行
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, detail: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(detail).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    /// 打印日志文件路径
    pub fn print_log_path(label: &str, path: &str) {
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style(format!("{}: ", label)).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    /// 打印空行
    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.init_config {
        std::fs::write(path, RunConfig::sample_config())?;
        println!("Sample configuration written to {}", path.display());
        return Ok(());
    }

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Jasper Batch starting");

    let mut config = load_config(&cli, &exe_dir)?;
    if config.log_dir.is_none() {
        config.log_dir = Some(exe_dir.join("Log"));
    }

    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    validate_config(&config)?;

    let compiler = CommandCompiler::new(config.compiler.clone());
    if !compiler.is_available() {
        warn!(program = compiler.program(), "Report compiler not found, every compile will fail");
    }

    let run_logs_dir = config.log_dir.clone();
    let mut orchestrator = BatchOrchestrator::new(config, compiler);

    let outcome = if cli.tui {
        run_with_progress(orchestrator)?
    } else {
        orchestrator.set_sink(LogSink);
        orchestrator.run()
    };

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Batch failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(ref path) = cli.summary {
        write_summary(&summary, path)?;
    }

    if cli.tui {
        display_summary(&summary);
    } else {
        print_cli_summary(&cli, &summary);
    }

    {
        use cli_output::*;
        print_separator();
        print_log_path("Log file", &log_path.display().to_string());
        if let Some(dir) = run_logs_dir {
            print_log_path("Run logs", &dir.display().to_string());
        }
    }

    info!(log_file = %log_path.display(), "Batch complete. Log saved to");
    Ok(())
}

fn print_cli_summary(cli: &Cli, summary: &BatchSummary) {
    use cli_output::*;

    print_separator();
    print_hint("Compilation complete");
    print_blank();
    print_stat("Total", &summary.total.to_string(), CliTheme::ACCENT);
    print_stat("Succeeded", &summary.succeeded.to_string(), CliTheme::SUCCESS);
    print_stat("Failed", &summary.failed.to_string(), CliTheme::ERROR);
    print_stat(
        "Elapsed",
        &format!("{:.1}s", summary.elapsed_ms as f64 / 1000.0),
        CliTheme::HINT,
    );
    print_blank();

    if cli.verbose {
        print_separator();
        print_hint("Detailed results");
        print_blank();

        for result in &summary.results {
            match result {
                CompileResult::Success { source, output } => print_result(
                    "✓",
                    CliTheme::SUCCESS,
                    &source.display().to_string(),
                    &format!("→ {}", output.display()),
                ),
                CompileResult::Failure { source, message } => print_result(
                    "✗",
                    CliTheme::ERROR,
                    &source.display().to_string(),
                    message.lines().next().unwrap_or_default(),
                ),
            }
        }
    }

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        print_separator();
        print_warning(&format!("Failed designs: {}", failures.len()));
        print_blank();
        for result in failures {
            if let CompileResult::Failure { source, message } = result {
                print_result(
                    "✗",
                    CliTheme::ERROR,
                    &source.display().to_string(),
                    message.lines().next().unwrap_or_default(),
                );
            }
        }
    }

    if summary.cancelled {
        print_separator();
        print_warning("The batch was stopped before every design was attempted");
    }

    if let Some(ref error) = summary.cleanup_error {
        print_separator();
        print_warning(&format!("Staging directory was not removed: {}", error));
    }
}

/// Write the run summary as pretty JSON
fn write_summary(summary: &BatchSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(summary)?)?;
    info!(path = %path.display(), "Summary written");
    Ok(())
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        log_dir
            .join(&config_name)
            .join(format!("{}_{}.log", config_name, timestamp))
    } else {
        log_dir.join(format!("CLIRun_{}.log", timestamp))
    }
}

/// Resolve config path - supports shorthand syntax
///
/// `nightly` finds `nightly.toml` in the working directory or in
/// `<exe_dir>/Config`.
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());
    let mut in_config_dir = exe_dir.join("Config").join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<RunConfig> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = RunConfig::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    Ok(config)
}

/// Setup logging (file, plus console unless the terminal view owns the screen)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let file_layer = if cli.json_log {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(non_blocking)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking)
            .boxed()
    };
    let console_layer = (!cli.tui).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}

/// Validate configuration before compiling
fn validate_config(config: &RunConfig) -> Result<()> {
    if !config.source_dir.exists() {
        anyhow::bail!("Source directory does not exist: {}", config.source_dir.display());
    }

    if config.attribute.trim().is_empty() {
        anyhow::bail!("Attribute name must not be empty");
    }

    if config.source_extension.trim().is_empty() {
        anyhow::bail!("Source extension must not be empty");
    }

    if let Some(ref output_dir) = config.output_dir
        && config.recursive
        && config.source_dir.is_dir()
        && output_dir.starts_with(&config.source_dir)
    {
        warn!(
            output = %output_dir.display(),
            source = %config.source_dir.display(),
            "Output directory is inside the source directory"
        );
    }

    Ok(())
}
