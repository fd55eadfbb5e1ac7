//! Inserting saved image paths into a terminal session

pub mod quote;
pub mod shell;

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

pub use quote::quote_path;
pub use shell::{ShellDialect, detect_shell};

/// Somewhere quoted text can be typed
pub trait TerminalSink {
    fn send_text(&mut self, text: &str, add_newline: bool) -> Result<()>;
}

/// Writes to the process's standard output
#[derive(Debug, Default)]
pub struct StdoutSink;

impl TerminalSink for StdoutSink {
    fn send_text(&mut self, text: &str, add_newline: bool) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if add_newline {
            stdout.write_all(b"\n").context("Failed to write to stdout")?;
        }
        stdout.flush().context("Failed to flush stdout")
    }
}

/// Quote a filesystem path for `dialect`
///
/// Names that are not valid UTF-8 are refused; a lossy conversion would
/// quote a different file.
pub fn quote_fs_path(path: &Path, dialect: ShellDialect) -> Result<String> {
    let text = path
        .to_str()
        .with_context(|| format!("Path {:?} is not valid UTF-8 and cannot be quoted", path))?;
    Ok(quote_path(text, dialect))
}

/// Quote `path` for `dialect` and send it to `sink`
///
/// Returns the quoted text that was sent.
pub fn insert_path(
    sink: &mut dyn TerminalSink,
    path: &Path,
    dialect: ShellDialect,
    add_newline: bool,
) -> Result<String> {
    let quoted = quote_fs_path(path, dialect)?;
    log::debug!("Inserting {} path {}", dialect, quoted);
    sink.send_text(&quoted, add_newline)?;
    Ok(quoted)
}
