//! Readers for images copied as file references (e.g. from a file manager)
//!
//! The per-platform part is only how the path list is obtained; picking the
//! first image file and reading it from disk is shared.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

use super::backend::ClipboardReader;
use super::error::ClipboardError;
use super::format::{ClipboardImage, ImageFormat};

/// Platform-specific source of the clipboard's file path list
#[async_trait]
pub trait PathListSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn required_tool(&self) -> String;

    async fn is_tool_available(&self) -> bool;

    /// Local filesystem paths currently on the clipboard, in clipboard order
    async fn list_paths(&self) -> Result<Vec<PathBuf>, ClipboardError>;
}

/// ClipboardReader over any PathListSource
pub struct FilePathReader<S> {
    source: S,
}

impl<S: PathListSource> FilePathReader<S> {
    pub fn new(source: S) -> Self {
        FilePathReader { source }
    }

    /// First path with a recognized image extension
    async fn find_image_path(&self) -> Result<(PathBuf, ImageFormat), ClipboardError> {
        let paths = self.source.list_paths().await?;
        log::debug!("{} listed {} path(s)", self.source.name(), paths.len());
        first_image_path(&paths).ok_or(ClipboardError::NoImageFilePath)
    }
}

/// Pick the first entry whose extension maps to a known image format
pub fn first_image_path(paths: &[PathBuf]) -> Option<(PathBuf, ImageFormat)> {
    paths.iter().find_map(|p| {
        ImageFormat::from_path(p)
            .filter(|f| *f != ImageFormat::Unknown)
            .map(|f| (p.clone(), f))
    })
}

#[async_trait]
impl<S: PathListSource> ClipboardReader for FilePathReader<S> {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    fn required_tool(&self) -> String {
        self.source.required_tool()
    }

    async fn is_tool_available(&self) -> bool {
        self.source.is_tool_available().await
    }

    async fn has_image(&self) -> Result<bool, ClipboardError> {
        match self.find_image_path().await {
            Ok(_) => Ok(true),
            Err(e) => {
                log::debug!("{}: {}", self.source.name(), e);
                Ok(false)
            }
        }
    }

    async fn detect_format(&self) -> Result<ImageFormat, ClipboardError> {
        self.find_image_path().await.map(|(_, format)| format)
    }

    async fn read_image(&self) -> Result<ClipboardImage, ClipboardError> {
        let (path, format) = self.find_image_path().await?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| ClipboardError::Io {
                path: path.clone(),
                source,
            })?;
        log::debug!("Read {} bytes from copied file {:?}", data.len(), path);
        Ok(ClipboardImage::new(data, format))
    }
}

/// Parse a `text/uri-list` payload into local paths
/// `file://` URIs are percent-decoded; comment lines and non-file URIs are skipped;
/// bare absolute paths are accepted as-is
pub fn parse_uri_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            if line.starts_with("file:") {
                match Url::parse(line).ok().and_then(|u| u.to_file_path().ok()) {
                    Some(path) => Some(path),
                    None => {
                        log::debug!("Skipping unparseable file URI {:?}", line);
                        None
                    }
                }
            } else if Path::new(line).is_absolute() {
                Some(PathBuf::from(line))
            } else {
                None
            }
        })
        .collect()
}
