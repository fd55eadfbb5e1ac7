//! Acquire, convert and persist clipboard images
//!
//! A single lock serializes whole paste and drop operations, so two quick
//! pastes never interleave their clipboard reads or saves.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::clipboard::{ClipboardError, ClipboardReader, ImageFormat};
use crate::image::{ImageConverter, SaveFormat};
use crate::platform::PlatformDescriptor;
use crate::storage::ImageStore;

/// An image written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub format: ImageFormat,
    /// Format the bytes arrived in
    pub source_format: ImageFormat,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    Saved(SavedImage),
    /// Nothing image-like on the clipboard
    NoImage,
    /// No reader's tool is installed
    ToolMissing {
        required: String,
        /// True only the first time this service reports it
        first_notice: bool,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PasteError {
    #[error("failed to read clipboard image: {}", .0.first_cause())]
    Read(#[source] ClipboardError),

    #[error("failed to save image: {0:#}")]
    Store(anyhow::Error),

    #[error("failed to read dropped file {path:?}: {source}")]
    DroppedFile { path: PathBuf, source: io::Error },

    #[error("{path:?} is not a recognized image")]
    NotAnImage { path: PathBuf },
}

pub struct PasteService {
    reader: Box<dyn ClipboardReader>,
    converter: ImageConverter,
    store: Arc<dyn ImageStore>,
    platform: Arc<PlatformDescriptor>,
    save_format: SaveFormat,
    lock: Mutex<()>,
    tool_notice_shown: AtomicBool,
}

impl PasteService {
    pub fn new(
        reader: Box<dyn ClipboardReader>,
        converter: ImageConverter,
        store: Arc<dyn ImageStore>,
        platform: Arc<PlatformDescriptor>,
        save_format: SaveFormat,
    ) -> Self {
        PasteService {
            reader,
            converter,
            store,
            platform,
            save_format,
            lock: Mutex::new(()),
            tool_notice_shown: AtomicBool::new(false),
        }
    }

    /// Save the clipboard image, if there is one
    pub async fn paste(&self) -> Result<PasteOutcome, PasteError> {
        let _guard = self.lock.lock().await;

        if !self.reader.is_tool_available().await {
            let required = self.reader.required_tool();
            let first_notice = !self.tool_notice_shown.swap(true, Ordering::SeqCst);
            if first_notice {
                log::warn!("No clipboard tool found. Install {}", required);
            }
            return Ok(PasteOutcome::ToolMissing {
                required,
                first_notice,
            });
        }

        if !self.reader.has_image().await.map_err(PasteError::Read)? {
            log::info!("No image on the clipboard");
            return Ok(PasteOutcome::NoImage);
        }

        let image = self.reader.read_image().await.map_err(|e| {
            log::error!("Clipboard reported an image but reading it failed: {}", e);
            PasteError::Read(e)
        })?;

        let saved = self.convert_and_store(image.data, image.format).await?;
        Ok(PasteOutcome::Saved(saved))
    }

    /// Save image files dropped onto the terminal
    ///
    /// Each file is handled on its own; one bad file does not stop the rest.
    pub async fn ingest_dropped(&self, paths: &[PathBuf]) -> Vec<Result<SavedImage, PasteError>> {
        let _guard = self.lock.lock().await;

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.ingest_one(path).await;
            if let Err(e) = &result {
                log::warn!("Skipping dropped file: {}", e);
            }
            results.push(result);
        }
        results
    }

    async fn ingest_one(&self, path: &Path) -> Result<SavedImage, PasteError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| PasteError::DroppedFile {
                path: path.to_path_buf(),
                source,
            })?;
        let format = sniff_format(&data, path).ok_or_else(|| PasteError::NotAnImage {
            path: path.to_path_buf(),
        })?;
        log::debug!("Dropped file {:?} is {}", path, format);
        self.convert_and_store(data, format).await
    }

    async fn convert_and_store(
        &self,
        data: Vec<u8>,
        source_format: ImageFormat,
    ) -> Result<SavedImage, PasteError> {
        let converted = self
            .converter
            .convert(data, source_format, self.save_format, &self.platform)
            .await;

        let path = self
            .store
            .save(&converted.data, converted.format)
            .map_err(PasteError::Store)?;

        Ok(SavedImage {
            path,
            format: converted.format,
            source_format,
            size: converted.data.len(),
        })
    }
}

/// Identify image bytes by content, falling back to the file extension
fn sniff_format(data: &[u8], path: &Path) -> Option<ImageFormat> {
    match ::image::guess_format(data) {
        Ok(::image::ImageFormat::Png) => Some(ImageFormat::Png),
        Ok(::image::ImageFormat::Jpeg) => Some(ImageFormat::Jpeg),
        Ok(::image::ImageFormat::Tiff) => Some(ImageFormat::Tiff),
        Ok(::image::ImageFormat::Bmp) => Some(ImageFormat::Bmp),
        Ok(::image::ImageFormat::WebP) => Some(ImageFormat::Webp),
        Ok(::image::ImageFormat::Gif) => Some(ImageFormat::Gif),
        Ok(other) => {
            log::debug!("Unmapped image format {:?} for {:?}", other, path);
            Some(ImageFormat::Unknown)
        }
        Err(_) => ImageFormat::from_path(path),
    }
}
