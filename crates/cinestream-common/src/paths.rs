//! Upload layout and file type helpers.
//!
//! Uploaded assets live under one directory per asset kind
//! (`<upload_dir>/movies`, `<upload_dir>/posters`) with file names derived
//! from the ingest timestamp plus the original extension.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// List of supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "webm", "mkv", "mov", "avi", "ts"];

/// List of supported image file extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// The two kinds of asset a movie record points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// The video file streamed by `/video`.
    Movie,
    /// The poster image.
    Poster,
}

impl AssetKind {
    /// Resolve a multipart field name to an asset kind.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "movie" => Some(Self::Movie),
            "poster" => Some(Self::Poster),
            _ => None,
        }
    }

    /// Sub-directory of the upload root holding this kind of asset.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Movie => "movies",
            Self::Poster => "posters",
        }
    }

    /// Whether an uploaded part with this MIME type is acceptable.
    pub fn accepts_mime(&self, mime: &str) -> bool {
        match self {
            Self::Movie => mime.starts_with("video/"),
            Self::Poster => mime.starts_with("image/"),
        }
    }

    /// Whether the client-side file name carries an extension of this kind.
    pub fn accepts_file_name(&self, name: &str) -> bool {
        let path = Path::new(name);
        match self {
            Self::Movie => is_video_file(path),
            Self::Poster => is_image_file(path),
        }
    }

    /// Directory for this asset kind under `upload_root`.
    pub fn dir(&self, upload_root: &Path) -> PathBuf {
        upload_root.join(self.dir_name())
    }
}

/// Build the stored file name for an upload: `<unix millis><.ext>`.
///
/// The extension is taken verbatim from the original file name; names
/// without an extension produce a bare timestamp.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use cinestream_common::paths::upload_file_name;
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(upload_file_name(at, "trailer.mp4"), "1700000000123.mp4");
/// assert_eq!(upload_file_name(at, "README"), "1700000000123");
/// ```
pub fn upload_file_name(at: DateTime<Utc>, original_name: &str) -> String {
    let stamp = at.timestamp_millis();
    match Path::new(original_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stamp}.{ext}"),
        None => stamp.to_string(),
    }
}

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cinestream_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("uploads/movies/1700000000123.mp4")));
/// assert!(!is_video_file(Path::new("poster.png")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Check if a path has an image file extension.
pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
