use crate::api::{BilingualText, Dictionary, GeneratedCharacter, GlyphPoem, SimilarPoems};
use crate::app_config::BackendConfig;
use crate::errors::{StageError, UploadError};
use crate::media::MediaKind;
use crate::types::SessionId;

pub mod http;

pub use http::HttpBackend;

/// A media file ready to be sent to the upload endpoint.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_url: String,
}

/// The remote services behind the see/think/guess pages.
#[async_trait::async_trait]
pub trait PoemBackend: Send + Sync {
    /// Bilingual description of the media at `media_url`.
    async fn describe_media(&self, media_url: &str) -> Result<BilingualText, StageError>;

    async fn find_similar_poems(&self, description: &str) -> Result<SimilarPoems, StageError>;

    async fn generate_poem(
        &self,
        description: &str,
        similar_poems: &[String],
    ) -> Result<BilingualText, StageError>;

    async fn upload_media(&self, upload: MediaUpload) -> Result<UploadReceipt, UploadError>;

    /// The poem with some characters swapped for glyph markup.
    async fn replace_with_glyphs(&self, poem: &str) -> Result<GlyphPoem, StageError>;

    async fn generate_character(&self, poem: &str) -> Result<GeneratedCharacter, StageError>;

    async fn save_user_name(&self, user_name: &str) -> Result<(), StageError>;

    /// `"yes"` or `"no"`: whether the last generated character is kept.
    async fn save_storage_preference(&self, preference: &str) -> Result<(), StageError>;

    /// Stores the last generated character in the shared dictionary.
    async fn add_to_dictionary(&self) -> Result<(), StageError>;

    async fn get_dictionary(&self) -> Result<Dictionary, StageError>;

    /// Entries whose character contains `term`.
    async fn search_dictionary(&self, term: &str) -> Result<Dictionary, StageError>;

    fn name(&self) -> &str;
}

pub fn create_backend(config: &BackendConfig) -> Result<Box<dyn PoemBackend>, StageError> {
    let backend = HttpBackend::new(&config.base_url, config.timeout_secs)?;
    log::debug!("using backend {}", backend.base_url());
    Ok(Box::new(backend))
}
