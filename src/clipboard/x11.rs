use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::backend::ClipboardReader;
use super::error::ClipboardError;
use super::file_path::{PathListSource, parse_uri_list};
use super::format::{ClipboardImage, ImageFormat, MimeChoice, choose_mime};
use crate::exec::{CommandRunner, ExecOptions, ToolPath};

const XCLIP: &str = "xclip";

/// Shared xclip plumbing for the raw and file-path readers
struct Xclip {
    runner: Arc<dyn CommandRunner>,
    tool: ToolPath,
}

impl Xclip {
    fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Xclip {
            runner,
            tool: ToolPath::new(XCLIP),
        }
    }

    fn is_available(&self) -> bool {
        self.tool.is_available(self.runner.as_ref())
    }

    /// Read the clipboard selection as `target`
    async fn read_text(&self, target: &str) -> Result<String, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run(
                program,
                &["-selection", "clipboard", "-t", target, "-o"],
                &ExecOptions::text(),
            )
            .await
            .map_err(|e| ClipboardError::from_exec(XCLIP, e))?;
        Ok(output.stdout)
    }

    async fn read_bytes(&self, target: &str) -> Result<Vec<u8>, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run_binary(
                program,
                &["-selection", "clipboard", "-t", target, "-o"],
                None,
                &ExecOptions::binary(),
            )
            .await
            .map_err(|e| ClipboardError::from_exec(XCLIP, e))?;
        Ok(output.stdout)
    }

    async fn targets(&self) -> Result<MimeChoice, ClipboardError> {
        let targets = self.read_text("TARGETS").await?;
        Ok(choose_mime(targets.lines()))
    }
}

/// X11 clipboard image reader using xclip
pub struct XclipReader {
    xclip: Xclip,
}

impl XclipReader {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        XclipReader {
            xclip: Xclip::new(runner),
        }
    }
}

#[async_trait]
impl ClipboardReader for XclipReader {
    fn name(&self) -> &'static str {
        "xclip"
    }

    fn required_tool(&self) -> String {
        "xclip".to_string()
    }

    async fn is_tool_available(&self) -> bool {
        self.xclip.is_available()
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        match self.xclip.targets().await {
            Ok(choice) => Ok(choice != MimeChoice::None),
            Err(e) => {
                log::debug!("xclip TARGETS probe failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        self.xclip
            .targets()
            .await?
            .detected()
            .ok_or(ClipboardError::NoImage)
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        let format = self
            .xclip
            .targets()
            .await?
            .fetch()
            .ok_or(ClipboardError::NoImage)?;
        let mime = format.mime().unwrap_or("image/png");
        let data = self.xclip.read_bytes(mime).await?;
        if data.is_empty() {
            return Err(ClipboardError::NoImage);
        }
        Ok(ClipboardImage::new(data, format))
    }
}

/// Path list from the X11 clipboard's `text/uri-list` target
pub struct XclipUriList {
    xclip: Xclip,
}

impl XclipUriList {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        XclipUriList {
            xclip: Xclip::new(runner),
        }
    }
}

#[async_trait]
impl PathListSource for XclipUriList {
    fn name(&self) -> &'static str {
        "xclip-file"
    }

    fn required_tool(&self) -> String {
        "xclip".to_string()
    }

    async fn is_tool_available(&self) -> bool {
        self.xclip.is_available()
    }

    async fn list_paths(&self) -> Result<Vec<PathBuf>, ClipboardError> {
        let text = self.xclip.read_text("text/uri-list").await?;
        Ok(parse_uri_list(&text))
    }
}
