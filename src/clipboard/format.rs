use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Image encodings the clipboard layer can report
///
/// `Unknown` means an image was present but its concrete type could not be
/// mapped. Callers may relabel it for storage but must not assume PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Webp,
    Gif,
    Unknown,
}

/// Preference order when a clipboard offers several image types
pub const RAW_PREFERENCE: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Webp,
    ImageFormat::Tiff,
    ImageFormat::Bmp,
];

impl ImageFormat {
    /// Map a MIME type to a format; unrecognized image types yield `Unknown`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        let format = match mime.as_str() {
            "image/png" => ImageFormat::Png,
            "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
            "image/webp" => ImageFormat::Webp,
            "image/tiff" => ImageFormat::Tiff,
            "image/bmp" | "image/x-bmp" | "image/x-ms-bmp" => ImageFormat::Bmp,
            "image/gif" => ImageFormat::Gif,
            other if other.starts_with("image/") => ImageFormat::Unknown,
            _ => return None,
        };
        Some(format)
    }

    /// Canonical MIME type; `Unknown` has none
    pub fn mime(self) -> Option<&'static str> {
        match self {
            ImageFormat::Png => Some("image/png"),
            ImageFormat::Jpeg => Some("image/jpeg"),
            ImageFormat::Tiff => Some("image/tiff"),
            ImageFormat::Bmp => Some("image/bmp"),
            ImageFormat::Webp => Some("image/webp"),
            ImageFormat::Gif => Some("image/gif"),
            ImageFormat::Unknown => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "bmp" => Some(ImageFormat::Bmp),
            "webp" => Some(ImageFormat::Webp),
            "gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    /// Format implied by a file name's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }

    /// File extension used when storing; `Unknown` is stored as png
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png | ImageFormat::Unknown => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Gif => "gif",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Gif => "gif",
            ImageFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image bytes read from the clipboard, owned by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl ClipboardImage {
    pub fn new(data: Vec<u8>, format: ImageFormat) -> Self {
        ClipboardImage { data, format }
    }
}

/// Outcome of choosing a type from a clipboard's advertised MIME list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeChoice {
    /// A recognized type, fetched as-is
    Specific(ImageFormat),
    /// Only a generic `image/*` type is offered; detection reports
    /// `Unknown` while the fetch asks for PNG
    Generic,
    None,
}

impl MimeChoice {
    pub fn detected(self) -> Option<ImageFormat> {
        match self {
            MimeChoice::Specific(format) => Some(format),
            MimeChoice::Generic => Some(ImageFormat::Unknown),
            MimeChoice::None => None,
        }
    }

    /// Format to request from the tool when fetching bytes
    pub fn fetch(self) -> Option<ImageFormat> {
        match self {
            MimeChoice::Specific(format) => Some(format),
            MimeChoice::Generic => Some(ImageFormat::Png),
            MimeChoice::None => None,
        }
    }
}

/// Pick the best image type from a newline-separated MIME list
pub fn choose_mime<'a, I>(types: I) -> MimeChoice
where
    I: IntoIterator<Item = &'a str>,
{
    let offered: Vec<ImageFormat> = types
        .into_iter()
        .filter_map(ImageFormat::from_mime)
        .collect();

    if let Some(best) = RAW_PREFERENCE.iter().find(|f| offered.contains(f)) {
        return MimeChoice::Specific(*best);
    }

    if offered.is_empty() {
        MimeChoice::None
    } else {
        MimeChoice::Generic
    }
}
