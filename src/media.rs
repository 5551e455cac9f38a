//! Media classification and pre-upload validation.
//!
//! Media bytes are never inspected; the kind is inferred from the MIME type
//! when one is known and from the file extension otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::MediaError;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];
const ALLOWED_IMAGE_MIMES: &[&str] = &["image/png", "image/jpeg", "image/jpg"];
const ALLOWED_VIDEO_MIMES: &[&str] = &["video/mp4", "video/webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Classify a URL or file name by its extension, ignoring query and fragment.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = extension(path)?;
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded clip as threaded between pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub url: String,
    pub kind: MediaKind,
}

impl MediaReference {
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

fn extension(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Guess a MIME type from a file name, for files read from disk.
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    match extension(path)?.as_str() {
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// MIME type first, then extension.
pub fn detect_file_type(name: &str, mime: Option<&str>) -> Option<MediaKind> {
    mime.filter(|m| !m.trim().is_empty())
        .and_then(MediaKind::from_mime)
        .or_else(|| MediaKind::from_path(name))
}

#[derive(Debug, Clone, Copy)]
pub struct FileCandidate<'a> {
    pub name: &'a str,
    pub mime: Option<&'a str>,
    pub size: u64,
}

pub fn validate_file(candidate: &FileCandidate<'_>, max_bytes: u64) -> Result<MediaKind, MediaError> {
    let kind = detect_file_type(candidate.name, candidate.mime).ok_or(MediaError::UnsupportedType)?;

    if candidate.size > max_bytes {
        return Err(MediaError::TooLarge {
            size: candidate.size,
            limit_mb: max_bytes / (1024 * 1024),
        });
    }

    let mime = candidate
        .mime
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    if let Some(mime) = mime {
        match kind {
            MediaKind::Image if !ALLOWED_IMAGE_MIMES.contains(&mime.as_str()) => {
                return Err(MediaError::DisallowedImageMime(mime));
            }
            MediaKind::Video if !ALLOWED_VIDEO_MIMES.contains(&mime.as_str()) => {
                return Err(MediaError::DisallowedVideoMime(mime));
            }
            _ => {}
        }
    }

    Ok(kind)
}
