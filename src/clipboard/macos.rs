//! macOS readers: pngpaste (dedicated tool) and osascript (built in)

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::backend::ClipboardReader;
use super::error::ClipboardError;
use super::file_path::PathListSource;
use super::format::{ClipboardImage, ImageFormat, MimeChoice, RAW_PREFERENCE};
use crate::exec::{CommandRunner, ExecOptions, ToolPath};

const PNGPASTE: &str = "pngpaste";
const OSASCRIPT: &str = "osascript";

/// Clipboard image reader using pngpaste (`brew install pngpaste`)
/// pngpaste always emits PNG
pub struct PngpasteReader {
    runner: Arc<dyn CommandRunner>,
    tool: ToolPath,
}

impl PngpasteReader {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        PngpasteReader {
            runner,
            tool: ToolPath::new(PNGPASTE),
        }
    }

    async fn paste(&self) -> Result<Vec<u8>, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run_binary(program, &["-"], None, &ExecOptions::binary())
            .await
            .map_err(|e| match e {
                // pngpaste exits 1 with "No PNG data found on the clipboard!"
                crate::exec::ExecError::Failed { code: Some(1), .. } => ClipboardError::NoImage,
                other => ClipboardError::from_exec(PNGPASTE, other),
            })?;
        if output.stdout.is_empty() {
            return Err(ClipboardError::NoImage);
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl ClipboardReader for PngpasteReader {
    fn name(&self) -> &'static str {
        "pngpaste"
    }

    fn required_tool(&self) -> String {
        "pngpaste (brew install pngpaste)".to_string()
    }

    async fn is_tool_available(&self) -> bool {
        self.tool.is_available(self.runner.as_ref())
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        match self.paste().await {
            Ok(_) => Ok(true),
            Err(e) => {
                log::debug!("pngpaste probe: {}", e);
                Ok(false)
            }
        }
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        self.paste().await.map(|_| ImageFormat::Png)
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        let data = self.paste().await?;
        Ok(ClipboardImage::new(data, ImageFormat::Png))
    }
}

/// Map `clipboard info` output (class, size pairs) to a choice
fn parse_clipboard_info(info: &str) -> MimeChoice {
    let mut offered = Vec::new();
    let mut generic = false;

    for entry in info.split(',').map(str::trim) {
        if entry.is_empty() || entry.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if entry.contains("PNGf") {
            offered.push(ImageFormat::Png);
        } else if entry.contains("JPEG") {
            offered.push(ImageFormat::Jpeg);
        } else if entry.contains("TIFF") {
            offered.push(ImageFormat::Tiff);
        } else if entry.contains("BMP") {
            offered.push(ImageFormat::Bmp);
        } else if entry.contains("GIF") || entry.contains("picture") {
            generic = true;
        }
    }

    match RAW_PREFERENCE.iter().find(|f| offered.contains(f)) {
        Some(best) => MimeChoice::Specific(*best),
        None if generic => MimeChoice::Generic,
        None => MimeChoice::None,
    }
}

/// AppleScript class used to coerce the clipboard to `format`
fn applescript_class(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "JPEG picture",
        ImageFormat::Tiff => "TIFF picture",
        ImageFormat::Bmp => "«class BMPf»",
        _ => "«class PNGf»",
    }
}

/// Clipboard image reader using the built-in osascript
pub struct OsascriptReader {
    runner: Arc<dyn CommandRunner>,
    tool: ToolPath,
}

impl OsascriptReader {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        OsascriptReader {
            runner,
            tool: ToolPath::new(OSASCRIPT),
        }
    }

    async fn clipboard_info(&self) -> Result<MimeChoice, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run(program, &["-e", "clipboard info"], &ExecOptions::text())
            .await
            .map_err(|e| ClipboardError::from_exec(OSASCRIPT, e))?;
        Ok(parse_clipboard_info(&output.stdout))
    }

    /// Write the clipboard as `format` into a temp file and read it back
    async fn export(&self, format: ImageFormat) -> Result<Vec<u8>, ClipboardError> {
        let temp = tempfile::Builder::new()
            .prefix("termpaste-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()
            .map_err(|source| ClipboardError::Io {
                path: std::env::temp_dir(),
                source,
            })?
            .into_temp_path();
        let temp_str = temp.to_string_lossy().into_owned();

        let coerce = format!("set imageData to the clipboard as {}", applescript_class(format));
        let program = self.tool.program(self.runner.as_ref());
        let result = self
            .runner
            .run(
                program,
                &[
                    "-e",
                    "on run argv",
                    "-e",
                    "set outFile to POSIX file (item 1 of argv)",
                    "-e",
                    &coerce,
                    "-e",
                    "set fileRef to open for access outFile with write permission",
                    "-e",
                    "set eof fileRef to 0",
                    "-e",
                    "write imageData to fileRef",
                    "-e",
                    "close access fileRef",
                    "-e",
                    "end run",
                    &temp_str,
                ],
                &ExecOptions::text(),
            )
            .await
            .map_err(|e| ClipboardError::from_exec(OSASCRIPT, e));

        let data = match result {
            Ok(_) => tokio::fs::read(&temp)
                .await
                .map_err(|source| ClipboardError::Io {
                    path: temp.to_path_buf(),
                    source,
                }),
            Err(e) => Err(e),
        };

        if let Err(e) = temp.close() {
            log::warn!("Failed to remove temp file {}: {}", temp_str, e);
        }
        data
    }
}

#[async_trait]
impl ClipboardReader for OsascriptReader {
    fn name(&self) -> &'static str {
        "osascript"
    }

    fn required_tool(&self) -> String {
        "osascript".to_string()
    }

    async fn is_tool_available(&self) -> bool {
        self.tool.is_available(self.runner.as_ref())
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        match self.clipboard_info().await {
            Ok(choice) => Ok(choice != MimeChoice::None),
            Err(e) => {
                log::debug!("osascript clipboard info failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        self.clipboard_info()
            .await?
            .detected()
            .ok_or(ClipboardError::NoImage)
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        let format = self
            .clipboard_info()
            .await?
            .fetch()
            .ok_or(ClipboardError::NoImage)?;
        let data = self.export(format).await?;
        if data.is_empty() {
            return Err(ClipboardError::NoImage);
        }
        Ok(ClipboardImage::new(data, format))
    }
}

/// Path list from a Finder file copy (the clipboard's file URL class)
pub struct FinderFileUrl {
    runner: Arc<dyn CommandRunner>,
    tool: ToolPath,
}

impl FinderFileUrl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        FinderFileUrl {
            runner,
            tool: ToolPath::new(OSASCRIPT),
        }
    }
}

#[async_trait]
impl PathListSource for FinderFileUrl {
    fn name(&self) -> &'static str {
        "osascript-file"
    }

    fn required_tool(&self) -> String {
        "osascript".to_string()
    }

    async fn is_tool_available(&self) -> bool {
        self.tool.is_available(self.runner.as_ref())
    }

    async fn list_paths(&self) -> Result<Vec<PathBuf>, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run(
                program,
                &["-e", "POSIX path of (the clipboard as «class furl»)"],
                &ExecOptions::text(),
            )
            .await
            .map_err(|e| ClipboardError::from_exec(OSASCRIPT, e))?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}
