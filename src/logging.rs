use anyhow::{Context, Result};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Logger that writes to a rotating file and echoes to stderr
struct TermpasteLogger {
    file_writer: Mutex<RollingFileAppender>,
    file_level: LevelFilter,
    stderr_level: LevelFilter,
}

impl Log for TermpasteLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.file_level || metadata.level() <= self.stderr_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();

        if level <= self.file_level {
            if let Ok(mut writer) = self.file_writer.lock() {
                let _ = writeln!(
                    writer,
                    "{} [{}] {}: {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    level,
                    record.target(),
                    record.args()
                );
            }
        }

        if level <= self.stderr_level {
            let _ = writeln!(io::stderr().lock(), "[{}] {}", level, record.args());
        }
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.file_writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Parse log level string to LevelFilter
pub fn parse_level(level_str: &str) -> LevelFilter {
    match level_str.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize the rotating file logger
///
/// Files rotate daily and the three newest are kept.
pub fn init_logger(log_file_path: &Path, file_level: &str, stderr_level: &str) -> Result<()> {
    let log_dir = log_file_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid log file path {:?}", log_file_path))?;
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(3)
        .filename_prefix(
            log_file_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("termpaste"),
        )
        .filename_suffix(
            log_file_path
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("log"),
        )
        .build(log_dir)
        .context("Failed to create rotating file appender")?;

    let file_level = parse_level(file_level);
    let stderr_level = parse_level(stderr_level);

    let logger = TermpasteLogger {
        file_writer: Mutex::new(file_appender),
        file_level,
        stderr_level,
    };

    log::set_boxed_logger(Box::new(logger)).context("Failed to set global logger")?;
    log::set_max_level(file_level.max(stderr_level));

    Ok(())
}
