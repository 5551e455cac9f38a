//! Capture/upload flow: validate a file, send it, and build the think-page link.

use std::path::Path;

use crate::app_config::UploadConfig;
use crate::backend::{MediaUpload, PoemBackend};
use crate::errors::UploadError;
use crate::handoff::ThinkParams;
use crate::media::{FileCandidate, MediaKind, mime_for_path, validate_file};
use crate::session::SessionStorage;

const EFFECT_VIDEO_NAME: &str = "effect-video.webm";
const ORIGINAL_VIDEO_NAME: &str = "original-video.webm";
const RECORDING_MIME: &str = "video/webm";
const FALLBACK_MIME: &str = "application/octet-stream";

/// A file picked by the visitor.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_for_path(&name).map(str::to_string);
        Ok(Self { name, mime, bytes })
    }

    pub fn candidate(&self) -> FileCandidate<'_> {
        FileCandidate {
            name: &self.name,
            mime: self.mime.as_deref(),
            size: self.bytes.len() as u64,
        }
    }
}

pub struct UploadFlow<'a> {
    backend: &'a dyn PoemBackend,
    max_bytes: u64,
}

impl<'a> UploadFlow<'a> {
    pub fn new(backend: &'a dyn PoemBackend, config: &UploadConfig) -> Self {
        Self {
            backend,
            max_bytes: config.max_bytes(),
        }
    }

    /// Validate and upload a picked file. Invalid files never reach the network.
    pub async fn upload_file(
        &self,
        session: &SessionStorage,
        file: LocalFile,
    ) -> Result<ThinkParams, UploadError> {
        let kind = validate_file(&file.candidate(), self.max_bytes)?;
        log::info!(
            "uploading {} as {kind} ({} bytes)",
            file.name,
            file.bytes.len()
        );

        let mime = file
            .mime
            .clone()
            .or_else(|| mime_for_path(&file.name).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        let receipt = self
            .backend
            .upload_media(MediaUpload {
                file_name: file.name,
                mime,
                bytes: file.bytes,
                kind,
                session_id: session.session_id.clone(),
            })
            .await?;

        Ok(ThinkParams::new(receipt.file_url).with_media_type(kind))
    }

    /// Upload a camera recording: the effect clip first, then the untouched original.
    ///
    /// Runs after the privacy agreement; the think link carries both URLs.
    pub async fn upload_recording(
        &self,
        session: &SessionStorage,
        effect: Vec<u8>,
        original: Vec<u8>,
    ) -> Result<ThinkParams, UploadError> {
        if !session.agreed_to_privacy {
            return Err(UploadError::PrivacyNotAccepted);
        }
        if effect.is_empty() || original.is_empty() {
            return Err(UploadError::NothingToUpload);
        }

        let effect = self
            .backend
            .upload_media(recording(session, EFFECT_VIDEO_NAME, effect))
            .await?;
        let original = self
            .backend
            .upload_media(recording(session, ORIGINAL_VIDEO_NAME, original))
            .await?;

        Ok(ThinkParams::new(effect.file_url)
            .with_original(original.file_url)
            .with_media_type(MediaKind::Video))
    }
}

fn recording(session: &SessionStorage, name: &str, bytes: Vec<u8>) -> MediaUpload {
    MediaUpload {
        file_name: name.to_string(),
        mime: RECORDING_MIME.to_string(),
        bytes,
        kind: MediaKind::Video,
        session_id: session.session_id.clone(),
    }
}

/// The think-page link, once the visitor has accepted the privacy policy.
pub fn confirm(session: &SessionStorage, params: &ThinkParams) -> Result<String, UploadError> {
    if !session.agreed_to_privacy {
        return Err(UploadError::PrivacyNotAccepted);
    }
    Ok(params.to_link())
}
