use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::backend::ClipboardReader;
use super::error::ClipboardError;
use super::file_path::{PathListSource, parse_uri_list};
use super::format::{ClipboardImage, ImageFormat, MimeChoice, choose_mime};
use crate::exec::{CommandRunner, ExecOptions, ToolPath};

const WL_PASTE: &str = "wl-paste";

/// Shared wl-paste plumbing
/// Requires wl-clipboard to be installed
struct WlPaste {
    runner: Arc<dyn CommandRunner>,
    tool: ToolPath,
}

impl WlPaste {
    fn new(runner: Arc<dyn CommandRunner>) -> Self {
        WlPaste {
            runner,
            tool: ToolPath::new(WL_PASTE),
        }
    }

    fn is_available(&self) -> bool {
        self.tool.is_available(self.runner.as_ref())
    }

    async fn list_types(&self) -> Result<MimeChoice, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run(program, &["--list-types"], &ExecOptions::text())
            .await
            .map_err(|e| ClipboardError::from_exec(WL_PASTE, e))?;
        Ok(choose_mime(output.stdout.lines()))
    }

    async fn read_text(&self, mime: &str) -> Result<String, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run(program, &["--no-newline", "--type", mime], &ExecOptions::text())
            .await
            .map_err(|e| ClipboardError::from_exec(WL_PASTE, e))?;
        Ok(output.stdout)
    }

    async fn read_bytes(&self, mime: &str) -> Result<Vec<u8>, ClipboardError> {
        let program = self.tool.program(self.runner.as_ref());
        let output = self
            .runner
            .run_binary(
                program,
                &["--no-newline", "--type", mime],
                None,
                &ExecOptions::binary(),
            )
            .await
            .map_err(|e| ClipboardError::from_exec(WL_PASTE, e))?;
        Ok(output.stdout)
    }
}

/// Wayland clipboard image reader using wl-paste
pub struct WlPasteReader {
    wl_paste: WlPaste,
}

impl WlPasteReader {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        WlPasteReader {
            wl_paste: WlPaste::new(runner),
        }
    }
}

#[async_trait]
impl ClipboardReader for WlPasteReader {
    fn name(&self) -> &'static str {
        "wl-paste"
    }

    fn required_tool(&self) -> String {
        "wl-clipboard (wl-paste)".to_string()
    }

    async fn is_tool_available(&self) -> bool {
        self.wl_paste.is_available()
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        match self.wl_paste.list_types().await {
            Ok(choice) => Ok(choice != MimeChoice::None),
            Err(e) => {
                // wl-paste exits non-zero when nothing is copied
                log::debug!("wl-paste --list-types failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        self.wl_paste
            .list_types()
            .await?
            .detected()
            .ok_or(ClipboardError::NoImage)
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        let format = self
            .wl_paste
            .list_types()
            .await?
            .fetch()
            .ok_or(ClipboardError::NoImage)?;
        let mime = format.mime().unwrap_or("image/png");
        let data = self.wl_paste.read_bytes(mime).await?;
        if data.is_empty() {
            return Err(ClipboardError::NoImage);
        }
        Ok(ClipboardImage::new(data, format))
    }
}

/// Path list from the Wayland clipboard's `text/uri-list` type
pub struct WlPasteUriList {
    wl_paste: WlPaste,
}

impl WlPasteUriList {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        WlPasteUriList {
            wl_paste: WlPaste::new(runner),
        }
    }
}

#[async_trait]
impl PathListSource for WlPasteUriList {
    fn name(&self) -> &'static str {
        "wl-paste-file"
    }

    fn required_tool(&self) -> String {
        "wl-clipboard (wl-paste)".to_string()
    }

    async fn is_tool_available(&self) -> bool {
        self.wl_paste.is_available()
    }

    async fn list_paths(&self) -> Result<Vec<PathBuf>, ClipboardError> {
        let text = self.wl_paste.read_text("text/uri-list").await?;
        Ok(parse_uri_list(&text))
    }
}
