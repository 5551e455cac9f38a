//! Query-parameter handoff between the upload, think and guess pages.

use reqwest::Url;

use crate::errors::HandoffError;
use crate::media::{MediaKind, MediaReference};

pub const THINK_PATH: &str = "/think";
pub const GUESS_PATH: &str = "/guess";

/// Base used to resolve relative page links such as `/think?media_url=...`.
const RELATIVE_BASE: &str = "http://localhost/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkParams {
    pub media_url: String,
    pub original_media_url: Option<String>,
    pub media_type: Option<MediaKind>,
}

impl ThinkParams {
    pub fn new(media_url: impl Into<String>) -> Self {
        Self {
            media_url: media_url.into(),
            original_media_url: None,
            media_type: None,
        }
    }

    pub fn with_original(mut self, url: impl Into<String>) -> Self {
        self.original_media_url = Some(url.into());
        self
    }

    pub fn with_media_type(mut self, kind: MediaKind) -> Self {
        self.media_type = Some(kind);
        self
    }

    /// The URL handed to the describe call: the original clip when one was uploaded.
    pub fn describe_url(&self) -> &str {
        self.original_media_url.as_deref().unwrap_or(&self.media_url)
    }

    /// Explicit `media_type` wins, then the extension, then video.
    pub fn media(&self) -> MediaReference {
        let kind = self
            .media_type
            .or_else(|| MediaKind::from_path(&self.media_url))
            .unwrap_or(MediaKind::Video);
        MediaReference::new(self.media_url.clone(), kind)
    }

    pub fn parse(link: &str) -> Result<Self, HandoffError> {
        let url = resolve(link)?;
        Self::from_url(&url)
    }

    pub fn from_url(url: &Url) -> Result<Self, HandoffError> {
        let mut media_url = None;
        let mut original_media_url = None;
        let mut media_type = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "media_url" => media_url = Some(value.into_owned()),
                "original_media_url" => original_media_url = Some(value.into_owned()),
                "media_type" => {
                    let kind = MediaKind::parse(&value)
                        .ok_or_else(|| HandoffError::UnknownMediaType(value.to_string()))?;
                    media_type = Some(kind);
                }
                _ => {}
            }
        }

        let media_url = media_url
            .filter(|v| !v.is_empty())
            .ok_or(HandoffError::MissingParam("media_url"))?;

        Ok(Self {
            media_url,
            original_media_url: original_media_url.filter(|v| !v.is_empty()),
            media_type,
        })
    }

    pub fn to_url(&self, base: &Url) -> Result<Url, HandoffError> {
        let mut url = base
            .join(THINK_PATH)
            .map_err(|e| HandoffError::InvalidUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("media_url", &self.media_url);
            if let Some(original) = &self.original_media_url {
                query.append_pair("original_media_url", original);
            }
            if let Some(kind) = self.media_type {
                query.append_pair("media_type", kind.as_str());
            }
        }
        Ok(url)
    }

    pub fn to_link(&self) -> String {
        relative_link(self.to_url(&relative_base()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessParams {
    pub poem: String,
}

impl GuessParams {
    pub fn new(poem: impl Into<String>) -> Self {
        Self { poem: poem.into() }
    }

    pub fn parse(link: &str) -> Result<Self, HandoffError> {
        let url = resolve(link)?;
        Self::from_url(&url)
    }

    pub fn from_url(url: &Url) -> Result<Self, HandoffError> {
        url.query_pairs()
            .find(|(key, _)| key == "poem")
            .map(|(_, value)| value.into_owned())
            .filter(|poem| !poem.trim().is_empty())
            .map(|poem| Self { poem })
            .ok_or(HandoffError::MissingParam("poem"))
    }

    pub fn to_url(&self, base: &Url) -> Result<Url, HandoffError> {
        let mut url = base
            .join(GUESS_PATH)
            .map_err(|e| HandoffError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("poem", &self.poem);
        Ok(url)
    }

    pub fn to_link(&self) -> String {
        relative_link(self.to_url(&relative_base()))
    }
}

fn relative_base() -> Url {
    Url::parse(RELATIVE_BASE).expect("static base url is valid")
}

fn resolve(link: &str) -> Result<Url, HandoffError> {
    Url::parse(link)
        .or_else(|_| relative_base().join(link))
        .map_err(|e| HandoffError::InvalidUrl(format!("{link}: {e}")))
}

fn relative_link(url: Result<Url, HandoffError>) -> String {
    match url {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_link_encodes_both_urls() {
        let params = ThinkParams::new("/uploads/effect video.webm").with_original("/uploads/orig.webm");
        insta::assert_snapshot!(
            params.to_link(),
            @"/think?media_url=%2Fuploads%2Feffect+video.webm&original_media_url=%2Fuploads%2Forig.webm"
        );
    }

    #[test]
    fn think_params_roundtrip_through_relative_link() {
        let params = ThinkParams::new("/uploads/a.png").with_media_type(MediaKind::Image);
        let parsed = ThinkParams::parse(&params.to_link()).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn original_defaults_to_media_url() {
        let params = ThinkParams::parse("/think?media_url=%2Fuploads%2Fclip.mp4").unwrap();
        assert_eq!(params.describe_url(), "/uploads/clip.mp4");

        let with_original =
            ThinkParams::parse("/think?media_url=a.webm&original_media_url=b.webm").unwrap();
        assert_eq!(with_original.describe_url(), "b.webm");
    }

    #[test]
    fn media_kind_falls_back_to_extension_then_video() {
        assert_eq!(
            ThinkParams::new("/uploads/photo.jpg").media().kind,
            MediaKind::Image
        );
        assert_eq!(
            ThinkParams::new("/uploads/blob").media().kind,
            MediaKind::Video
        );
        assert_eq!(
            ThinkParams::new("/uploads/photo.jpg")
                .with_media_type(MediaKind::Video)
                .media()
                .kind,
            MediaKind::Video
        );
    }

    #[test]
    fn missing_media_url_is_reported() {
        assert_eq!(
            ThinkParams::parse("/think?media_type=video"),
            Err(HandoffError::MissingParam("media_url"))
        );
        assert!(matches!(
            ThinkParams::parse("/think?media_url=a.mp4&media_type=audio"),
            Err(HandoffError::UnknownMediaType(_))
        ));
    }

    #[test]
    fn guess_params_carry_the_poem() {
        let link = GuessParams::new("江永女书奇，闺中秘语稀。").to_link();
        assert!(link.starts_with("/guess?poem="));
        let parsed = GuessParams::parse(&link).unwrap();
        assert_eq!(parsed.poem, "江永女书奇，闺中秘语稀。");
        assert_eq!(
            GuessParams::parse("/guess"),
            Err(HandoffError::MissingParam("poem"))
        );
    }

    #[test]
    fn absolute_base_is_respected() {
        let base = Url::parse("https://poems.example/app/").unwrap();
        let url = GuessParams::new("诗").to_url(&base).unwrap();
        assert_eq!(url.host_str(), Some("poems.example"));
        assert_eq!(url.path(), "/guess");
    }
}
