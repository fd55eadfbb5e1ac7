use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::clipboard::ImageFormat;

const FILE_PREFIX: &str = "clipboard-";

/// Destination for pasted images
pub trait ImageStore: Send + Sync {
    /// Persist `data` and return the absolute path written
    fn save(&self, data: &[u8], format: ImageFormat) -> Result<PathBuf>;
}

/// Stores images as `<workspace>/<folder>/clipboard-<timestamp>.<ext>`
///
/// Files are created exclusively, so two saves in the same millisecond get
/// `-1`, `-2`, ... suffixes instead of overwriting each other. After every
/// save only the newest `max_images` clipboard files are kept.
pub struct FolderImageStore {
    folder: PathBuf,
    max_images: usize,
}

impl FolderImageStore {
    pub fn new(workspace: &Path, folder_name: &str, max_images: usize) -> Self {
        FolderImageStore {
            folder: workspace.join(folder_name),
            max_images,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn create_unique(&self, stem: &str, extension: &str, data: &[u8]) -> Result<PathBuf> {
        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{}.{}", stem, extension),
                n => format!("{}-{}.{}", stem, n, extension),
            };
            let path = self.folder.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(data)
                        .with_context(|| format!("Failed to write image to {:?}", path))?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {:?}", path));
                }
            }
        }
    }

    /// Remove the oldest clipboard images beyond `max_images`
    fn prune(&self) -> Result<usize> {
        if self.max_images == 0 {
            return Ok(0);
        }

        let mut images: Vec<(SystemTime, PathBuf)> = fs::read_dir(&self.folder)
            .with_context(|| format!("Failed to list {:?}", self.folder))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(FILE_PREFIX))
            })
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, entry.path()))
            })
            .collect();

        if images.len() <= self.max_images {
            return Ok(0);
        }

        // Newest first
        images.sort_by(|a, b| b.cmp(a));
        let mut removed = 0;
        for (_, path) in images.split_off(self.max_images) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove old image {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }
}

impl ImageStore for FolderImageStore {
    fn save(&self, data: &[u8], format: ImageFormat) -> Result<PathBuf> {
        fs::create_dir_all(&self.folder)
            .with_context(|| format!("Failed to create image folder {:?}", self.folder))?;

        let stem = format!(
            "{}{}",
            FILE_PREFIX,
            chrono::Local::now().format("%Y%m%d-%H%M%S-%3f")
        );
        let path = self.create_unique(&stem, format.extension(), data)?;
        log::info!("Saved {} image ({} bytes) to {:?}", format, data.len(), path);

        match self.prune() {
            Ok(0) => {}
            Ok(n) => log::debug!("Removed {} old images from {:?}", n, self.folder),
            Err(e) => log::warn!("Failed to prune image folder: {:#}", e),
        }

        Ok(path)
    }
}
