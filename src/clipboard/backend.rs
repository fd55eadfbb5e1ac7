use async_trait::async_trait;

use super::error::ClipboardError;
use super::format::{ClipboardImage, ImageFormat};

/// Trait for clipboard image readers
/// One implementation per (OS, display server, tool) combination, plus the
/// fallback chain that composes them
///
/// Probes (`is_tool_available`, `has_image`) are best effort and concrete
/// readers answer `false` / `Ok(false)` on any failure. `detect_format` and
/// `read_image` fail with distinguishable errors and never retry internally.
#[async_trait]
pub trait ClipboardReader: Send + Sync {
    /// Stable reader identifier (for logging/diagnostics)
    fn name(&self) -> &'static str;

    /// Human-readable description of what must be installed
    fn required_tool(&self) -> String;

    /// Check whether the underlying tool can be run
    async fn is_tool_available(&self) -> bool;

    /// Check whether an image is currently on the clipboard
    async fn has_image(&self) -> Result<bool, ClipboardError>;

    /// Report the format of the clipboard image
    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError>;

    /// Fetch the clipboard image
    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError>;
}
