use std::sync::{Arc, Mutex};

use nvshu::api::{BilingualText, Dictionary, GeneratedCharacter, GlyphPoem, SimilarPoems};
use nvshu::app_config::UploadConfig;
use nvshu::backend::{MediaUpload, PoemBackend, UploadReceipt};
use nvshu::errors::{MediaError, StageError, UploadError};
use nvshu::handoff::ThinkParams;
use nvshu::media::MediaKind;
use nvshu::session::SessionStorage;
use nvshu::types::SessionId;
use nvshu::upload::{LocalFile, UploadFlow, confirm};

#[derive(Default)]
struct RecordingBackend {
    uploads: Mutex<Vec<MediaUpload>>,
    reject: Option<String>,
}

#[async_trait::async_trait]
impl PoemBackend for RecordingBackend {
    async fn describe_media(&self, _: &str) -> Result<BilingualText, StageError> {
        unreachable!()
    }

    async fn find_similar_poems(&self, _: &str) -> Result<SimilarPoems, StageError> {
        unreachable!()
    }

    async fn generate_poem(&self, _: &str, _: &[String]) -> Result<BilingualText, StageError> {
        unreachable!()
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<UploadReceipt, UploadError> {
        if let Some(reason) = &self.reject {
            return Err(UploadError::Rejected(reason.clone()));
        }
        let file_url = format!("/uploads/{}", upload.file_name);
        self.uploads.lock().unwrap().push(upload);
        Ok(UploadReceipt { file_url })
    }

    async fn replace_with_glyphs(&self, _: &str) -> Result<GlyphPoem, StageError> {
        unreachable!()
    }

    async fn generate_character(&self, _: &str) -> Result<GeneratedCharacter, StageError> {
        unreachable!()
    }

    async fn save_user_name(&self, _: &str) -> Result<(), StageError> {
        unreachable!()
    }

    async fn save_storage_preference(&self, _: &str) -> Result<(), StageError> {
        unreachable!()
    }

    async fn add_to_dictionary(&self) -> Result<(), StageError> {
        unreachable!()
    }

    async fn get_dictionary(&self) -> Result<Dictionary, StageError> {
        unreachable!()
    }

    async fn search_dictionary(&self, _: &str) -> Result<Dictionary, StageError> {
        unreachable!()
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn session(agreed: bool) -> SessionStorage {
    let mut session = SessionStorage::new(SessionId::new("visitor-1"));
    if agreed {
        session.agree_to_privacy();
    }
    session
}

fn file(name: &str, mime: Option<&str>, size: usize) -> LocalFile {
    LocalFile::new(name, mime.map(str::to_string), vec![0u8; size])
}

#[tokio::test]
async fn video_upload_produces_a_think_link() {
    let backend = Arc::new(RecordingBackend::default());
    let flow = UploadFlow::new(backend.as_ref(), &UploadConfig::default());
    let session = session(true);

    let params = flow
        .upload_file(&session, file("video.mp4", Some("video/mp4"), 1024))
        .await
        .unwrap();

    assert_eq!(params.media_url, "/uploads/video.mp4");
    assert_eq!(params.media_type, Some(MediaKind::Video));
    assert_eq!(
        confirm(&session, &params).unwrap(),
        "/think?media_url=%2Fuploads%2Fvideo.mp4&media_type=video"
    );

    let uploads = backend.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].kind, MediaKind::Video);
    assert_eq!(uploads[0].session_id.as_str(), "visitor-1");
}

#[tokio::test]
async fn image_without_mime_is_classified_by_extension() {
    let backend = RecordingBackend::default();
    let flow = UploadFlow::new(&backend, &UploadConfig::default());

    let params = flow
        .upload_file(&session(false), file("photo.png", None, 10))
        .await
        .unwrap();

    assert_eq!(params.media_type, Some(MediaKind::Image));
    assert_eq!(backend.uploads.lock().unwrap()[0].mime, "image/png");
}

#[tokio::test]
async fn unknown_extension_is_rejected_before_the_network() {
    let backend = RecordingBackend::default();
    let flow = UploadFlow::new(&backend, &UploadConfig::default());

    let err = flow
        .upload_file(&session(true), file("notes.txt", None, 10))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UploadError::Invalid(MediaError::UnsupportedType)
    ));
    assert!(backend.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_file_is_rejected_before_the_network() {
    let backend = RecordingBackend::default();
    let flow = UploadFlow::new(&backend, &UploadConfig { max_size_mb: 1 });

    let err = flow
        .upload_file(&session(true), file("big.mp4", Some("video/mp4"), 1024 * 1024 + 1))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "File size exceeds 1MB limit. Please choose a smaller file."
    );
    assert!(backend.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn disallowed_image_mime_is_rejected() {
    let backend = RecordingBackend::default();
    let flow = UploadFlow::new(&backend, &UploadConfig::default());

    let err = flow
        .upload_file(&session(true), file("anim.gif", Some("image/gif"), 10))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Please upload PNG or JPG images only.");
    assert!(backend.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn server_rejection_is_surfaced() {
    let backend = RecordingBackend {
        reject: Some("disk full".to_string()),
        ..RecordingBackend::default()
    };
    let flow = UploadFlow::new(&backend, &UploadConfig::default());

    let err = flow
        .upload_file(&session(true), file("video.mp4", Some("video/mp4"), 10))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Upload failed: disk full");
}

#[tokio::test]
async fn recording_uploads_effect_then_original() {
    let backend = RecordingBackend::default();
    let flow = UploadFlow::new(&backend, &UploadConfig::default());

    let params = flow
        .upload_recording(&session(true), vec![1, 2, 3], vec![4, 5])
        .await
        .unwrap();

    let names: Vec<String> = backend
        .uploads
        .lock()
        .unwrap()
        .iter()
        .map(|u| u.file_name.clone())
        .collect();
    assert_eq!(names, vec!["effect-video.webm", "original-video.webm"]);

    assert_eq!(params.media_url, "/uploads/effect-video.webm");
    assert_eq!(
        params.original_media_url.as_deref(),
        Some("/uploads/original-video.webm")
    );
    assert_eq!(params.describe_url(), "/uploads/original-video.webm");

    let reparsed = ThinkParams::parse(&params.to_link()).unwrap();
    assert_eq!(reparsed, params);
}

#[tokio::test]
async fn recording_requires_privacy_agreement() {
    let backend = RecordingBackend::default();
    let flow = UploadFlow::new(&backend, &UploadConfig::default());

    let err = flow
        .upload_recording(&session(false), vec![1], vec![2])
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::PrivacyNotAccepted));
    assert!(backend.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_recording_is_not_uploaded() {
    let backend = RecordingBackend::default();
    let flow = UploadFlow::new(&backend, &UploadConfig::default());

    let err = flow
        .upload_recording(&session(true), Vec::new(), vec![2])
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::NothingToUpload));
    assert!(backend.uploads.lock().unwrap().is_empty());
}
