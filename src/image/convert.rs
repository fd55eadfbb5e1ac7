//! Best-effort image format conversion through native OS tools
//!
//! Conversion never fails a paste: any problem yields the original bytes and
//! format with a logged warning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;

use crate::clipboard::ImageFormat;
use crate::exec::{CommandRunner, ExecError, ExecOptions};
use crate::platform::{Os, PlatformDescriptor};

/// Configured save format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// Keep whatever the clipboard provided
    #[default]
    Auto,
    Png,
    Jpeg,
}

impl SaveFormat {
    /// Concrete target, or `None` for `Auto`
    pub fn target(self) -> Option<ImageFormat> {
        match self {
            SaveFormat::Auto => None,
            SaveFormat::Png => Some(ImageFormat::Png),
            SaveFormat::Jpeg => Some(ImageFormat::Jpeg),
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaveFormat::Auto => "auto",
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpeg",
        })
    }
}

/// Bytes after conversion
///
/// `format` is the requested target on success and the original source
/// format whenever conversion was skipped or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no conversion tool found (tried {0})")]
    NoTool(&'static str),

    #[error("no Windows PowerShell path available from WSL")]
    NoInteropPath,

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("{0} produced no output")]
    EmptyOutput(&'static str),

    #[error("temp file error: {0}")]
    Io(#[from] io::Error),
}

/// Native tools the converter knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionTool {
    /// macOS built-in `sips`
    Sips,
    /// System.Drawing hosted by PowerShell (Windows, WSL)
    PowerShell,
    ImageMagick,
    Ffmpeg,
}

impl ConversionTool {
    pub fn name(self) -> &'static str {
        match self {
            ConversionTool::Sips => "sips",
            ConversionTool::PowerShell => "powershell",
            ConversionTool::ImageMagick => "imagemagick",
            ConversionTool::Ffmpeg => "ffmpeg",
        }
    }

    /// Tool-specific identifier for a target format
    pub fn target_codec(self, target: ImageFormat) -> &'static str {
        let jpeg = target == ImageFormat::Jpeg;
        match self {
            ConversionTool::Sips | ConversionTool::ImageMagick => {
                if jpeg { "jpeg" } else { "png" }
            }
            ConversionTool::PowerShell => {
                if jpeg { "Jpeg" } else { "Png" }
            }
            ConversionTool::Ffmpeg => {
                if jpeg { "mjpeg" } else { "png" }
            }
        }
    }
}

/// ImageMagick names for the Linux path
const IMAGEMAGICK_BINARIES: &[&str] = &["magick", "convert"];

pub struct ImageConverter {
    runner: Arc<dyn CommandRunner>,
}

impl ImageConverter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        ImageConverter { runner }
    }

    /// Convert `data` from `source` to the configured target
    pub async fn convert(
        &self,
        data: Vec<u8>,
        source: ImageFormat,
        target: SaveFormat,
        platform: &PlatformDescriptor,
    ) -> ConversionResult {
        let Some(target) = target.target().filter(|t| *t != source) else {
            return ConversionResult {
                data,
                format: source,
            };
        };

        match self.try_convert(&data, source, target, platform).await {
            Ok(converted) => {
                log::info!(
                    "Converted image {} -> {} ({} -> {} bytes)",
                    source,
                    target,
                    data.len(),
                    converted.len()
                );
                ConversionResult {
                    data: converted,
                    format: target,
                }
            }
            Err(e) => {
                log::warn!(
                    "Image conversion {} -> {} failed, keeping original: {}",
                    source,
                    target,
                    e
                );
                ConversionResult {
                    data,
                    format: source,
                }
            }
        }
    }

    async fn try_convert(
        &self,
        data: &[u8],
        source: ImageFormat,
        target: ImageFormat,
        platform: &PlatformDescriptor,
    ) -> Result<Vec<u8>, ConvertError> {
        let converted = match platform.os {
            Os::Macos => self.with_sips(data, source, target).await?,
            Os::Windows => self.with_powershell("powershell", data, target).await?,
            Os::Linux if platform.is_wsl => {
                let powershell = platform
                    .shell_interop_path
                    .as_deref()
                    .ok_or(ConvertError::NoInteropPath)?;
                self.with_powershell(powershell, data, target).await?
            }
            Os::Linux => self.on_linux(data, source, target).await?,
        };

        if converted.is_empty() {
            return Err(ConvertError::EmptyOutput(match platform.os {
                Os::Macos => ConversionTool::Sips.name(),
                Os::Linux if !platform.is_wsl => "imagemagick/ffmpeg",
                _ => ConversionTool::PowerShell.name(),
            }));
        }
        Ok(converted)
    }

    /// sips works on files, so both sides go through temp files
    async fn with_sips(
        &self,
        data: &[u8],
        source: ImageFormat,
        target: ImageFormat,
    ) -> Result<Vec<u8>, ConvertError> {
        let input = temp_path(source)?;
        let output = temp_path(target)?;

        let result = self.run_sips(data, &input, &output, target).await;

        remove_temp(input);
        remove_temp(output);
        result
    }

    async fn run_sips(
        &self,
        data: &[u8],
        input: &Path,
        output: &Path,
        target: ImageFormat,
    ) -> Result<Vec<u8>, ConvertError> {
        tokio::fs::write(input, data).await?;
        let input_str = input.to_string_lossy();
        let output_str = output.to_string_lossy();
        self.runner
            .run(
                "sips",
                &[
                    "-s",
                    "format",
                    ConversionTool::Sips.target_codec(target),
                    &input_str,
                    "--out",
                    &output_str,
                ],
                &ExecOptions::binary(),
            )
            .await?;
        Ok(tokio::fs::read(output).await?)
    }

    async fn with_powershell(
        &self,
        program: &str,
        data: &[u8],
        target: ImageFormat,
    ) -> Result<Vec<u8>, ConvertError> {
        let script = format!(
            "Add-Type -AssemblyName System.Drawing; \
$stdin = [Console]::OpenStandardInput(); \
$buffer = New-Object System.IO.MemoryStream; \
$stdin.CopyTo($buffer); \
$buffer.Position = 0; \
$img = [System.Drawing.Image]::FromStream($buffer); \
$out = New-Object System.IO.MemoryStream; \
$img.Save($out, [System.Drawing.Imaging.ImageFormat]::{}); \
$stdout = [Console]::OpenStandardOutput(); \
$out.WriteTo($stdout); \
$stdout.Flush()",
            ConversionTool::PowerShell.target_codec(target)
        );
        let output = self
            .runner
            .run_binary(
                program,
                &["-NoProfile", "-NonInteractive", "-Command", &script],
                Some(data),
                &ExecOptions::binary(),
            )
            .await?;
        Ok(output.stdout)
    }

    async fn on_linux(
        &self,
        data: &[u8],
        source: ImageFormat,
        target: ImageFormat,
    ) -> Result<Vec<u8>, ConvertError> {
        if let Some(magick) = IMAGEMAGICK_BINARIES
            .iter()
            .find_map(|name| self.runner.which(name))
        {
            log::debug!("Converting with ImageMagick at {:?}", magick);
            let input = match source {
                ImageFormat::Unknown => "-".to_string(),
                known => format!("{}:-", known.as_str()),
            };
            let output = format!("{}:-", ConversionTool::ImageMagick.target_codec(target));
            let program = magick.to_string_lossy();
            let result = self
                .runner
                .run_binary(&program, &[&input, &output], Some(data), &ExecOptions::binary())
                .await?;
            return Ok(result.stdout);
        }

        if let Some(ffmpeg) = self.runner.which("ffmpeg") {
            log::debug!("Converting with ffmpeg at {:?}", ffmpeg);
            let program = ffmpeg.to_string_lossy();
            let result = self
                .runner
                .run_binary(
                    &program,
                    &[
                        "-hide_banner",
                        "-loglevel",
                        "error",
                        "-f",
                        "image2pipe",
                        "-i",
                        "pipe:0",
                        "-frames:v",
                        "1",
                        "-c:v",
                        ConversionTool::Ffmpeg.target_codec(target),
                        "-f",
                        "image2pipe",
                        "pipe:1",
                    ],
                    Some(data),
                    &ExecOptions::binary(),
                )
                .await?;
            return Ok(result.stdout);
        }

        Err(ConvertError::NoTool("magick, convert, ffmpeg"))
    }
}

fn temp_path(format: ImageFormat) -> io::Result<TempPath> {
    Ok(tempfile::Builder::new()
        .prefix("termpaste-convert-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()?
        .into_temp_path())
}

fn remove_temp(path: TempPath) {
    let display = path.to_path_buf();
    if let Err(e) = path.close() {
        log::warn!("Failed to remove temp file {:?}: {}", display, e);
    }
}
