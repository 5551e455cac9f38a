use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{MediaUpload, PoemBackend, UploadReceipt};
use crate::api::{
    BilingualText, DescribeRequest, DescribeResponse, Dictionary, DictionaryResponse,
    ErrorEnvelope, GeneratedCharacterResponse, GeneratePoemRequest, GeneratePoemResponse,
    GeneratedCharacter, GlyphPoem, GlyphPoemResponse, PoemRequest, SimilarPoems,
    SimilarPoemsRequest, SimilarPoemsResponse, StatusResponse, StoragePreferenceRequest,
    UploadResponse, UserNameRequest, reported_error,
};
use crate::errors::{StageError, UploadError};

const DESCRIBE_ROUTE: &str = "describe_video";
const SIMILAR_ROUTE: &str = "find_similar_poems";
const GENERATE_ROUTE: &str = "generate_poem";
const UPLOAD_ROUTE: &str = "upload";
const REPLACE_ROUTE: &str = "replace_with_created_char";
const CHARACTER_ROUTE: &str = "generate_char";
const USER_NAME_ROUTE: &str = "save_user_name";
const PREFERENCE_ROUTE: &str = "save_storage_preference";
const ADD_ENTRY_ROUTE: &str = "add_to_dictionary";
const DICTIONARY_ROUTE: &str = "get_dictionary";
const SEARCH_ROUTE: &str = "search_dictionary";

/// JSON-over-HTTP client for the poem service. The service keeps the
/// generated character in its cookie session, so the client holds cookies
/// across calls.
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StageError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| StageError::Endpoint(format!("{base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .cookie_store(true)
            .build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, route: &str) -> Result<Url, StageError> {
        self.base
            .join(route)
            .map_err(|e| StageError::Endpoint(format!("{route}: {e}")))
    }

    async fn post_json<Req, Resp>(&self, route: &str, body: &Req) -> Result<Resp, StageError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(route)?;
        log::debug!("POST {url}");
        let res = self.client.post(url).json(body).send().await?;
        Self::decode(res).await
    }

    async fn post_empty<Resp: DeserializeOwned>(&self, route: &str) -> Result<Resp, StageError> {
        let url = self.endpoint(route)?;
        log::debug!("POST {url}");
        let res = self.client.post(url).send().await?;
        Self::decode(res).await
    }

    async fn get_json<Resp: DeserializeOwned>(
        &self,
        route: &str,
        query: &[(&str, &str)],
    ) -> Result<Resp, StageError> {
        let url = self.endpoint(route)?;
        log::debug!("GET {url}");
        let res = self.client.get(url).query(query).send().await?;
        Self::decode(res).await
    }

    async fn decode<Resp: DeserializeOwned>(res: reqwest::Response) -> Result<Resp, StageError> {
        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            if let Some(reason) = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(ErrorEnvelope::reason)
            {
                return Err(StageError::Application(reason));
            }
            return Err(StageError::Status(status.as_u16()));
        }

        serde_json::from_str(&text).map_err(|e| StageError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PoemBackend for HttpBackend {
    async fn describe_media(&self, media_url: &str) -> Result<BilingualText, StageError> {
        let resp: DescribeResponse = self
            .post_json(DESCRIBE_ROUTE, &DescribeRequest { media_url })
            .await?;
        resp.into_result()
    }

    async fn find_similar_poems(&self, description: &str) -> Result<SimilarPoems, StageError> {
        let resp: SimilarPoemsResponse = self
            .post_json(
                SIMILAR_ROUTE,
                &SimilarPoemsRequest {
                    video_description: description,
                },
            )
            .await?;
        resp.into_result()
    }

    async fn generate_poem(
        &self,
        description: &str,
        similar_poems: &[String],
    ) -> Result<BilingualText, StageError> {
        let resp: GeneratePoemResponse = self
            .post_json(
                GENERATE_ROUTE,
                &GeneratePoemRequest {
                    video_description: description,
                    similar_poems,
                },
            )
            .await?;
        resp.into_result()
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<UploadReceipt, UploadError> {
        let url = self
            .endpoint(UPLOAD_ROUTE)
            .map_err(|e| UploadError::Endpoint(e.to_string()))?;

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)?;
        let form = Form::new()
            .part("file", part)
            .text("session_id", upload.session_id.as_str().to_string())
            .text("file_type", upload.kind.as_str());

        log::debug!("uploading {} ({})", upload.file_name, upload.mime);
        let res = self.client.post(url).multipart(form).send().await?;
        let status = res.status();
        let is_json = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        let text = res.text().await?;

        if !is_json {
            return Err(UploadError::NotJson {
                status: status.as_u16(),
            });
        }
        let result: UploadResponse = serde_json::from_str(&text).map_err(|_| {
            UploadError::InvalidJson(crate::sanitize::preview(&text, 200))
        })?;

        if !status.is_success() || result.success == Some(false) {
            let message = reported_error(result.error)
                .or(reported_error(result.message))
                .unwrap_or_else(|| "Unknown error occurred".to_string());
            return Err(UploadError::Rejected(message));
        }

        let file_url = result
            .file_url
            .filter(|u| !u.is_empty())
            .ok_or(UploadError::MissingUrl)?;
        Ok(UploadReceipt { file_url })
    }

    async fn replace_with_glyphs(&self, poem: &str) -> Result<GlyphPoem, StageError> {
        let resp: GlyphPoemResponse = self.post_json(REPLACE_ROUTE, &PoemRequest { poem }).await?;
        resp.into_result()
    }

    async fn generate_character(&self, poem: &str) -> Result<GeneratedCharacter, StageError> {
        let resp: GeneratedCharacterResponse =
            self.post_json(CHARACTER_ROUTE, &PoemRequest { poem }).await?;
        resp.into_result()
    }

    async fn save_user_name(&self, user_name: &str) -> Result<(), StageError> {
        let resp: StatusResponse = self
            .post_json(USER_NAME_ROUTE, &UserNameRequest { user_name })
            .await?;
        resp.into_result()
    }

    async fn save_storage_preference(&self, preference: &str) -> Result<(), StageError> {
        let resp: StatusResponse = self
            .post_json(
                PREFERENCE_ROUTE,
                &StoragePreferenceRequest {
                    storage_preference: preference,
                },
            )
            .await?;
        resp.into_result()
    }

    async fn add_to_dictionary(&self) -> Result<(), StageError> {
        let resp: StatusResponse = self.post_empty(ADD_ENTRY_ROUTE).await?;
        resp.into_result()
    }

    async fn get_dictionary(&self) -> Result<Dictionary, StageError> {
        let resp: DictionaryResponse = self.get_json(DICTIONARY_ROUTE, &[]).await?;
        resp.into_result()
    }

    async fn search_dictionary(&self, term: &str) -> Result<Dictionary, StageError> {
        let resp: DictionaryResponse = self.get_json(SEARCH_ROUTE, &[("term", term)]).await?;
        resp.into_result()
    }

    fn name(&self) -> &str {
        "http"
    }
}
