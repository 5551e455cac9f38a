use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::StageError;
use crate::glyphs::GlyphToken;

/// A primary-language text and its translation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BilingualText {
    pub primary: String,
    pub secondary: String,
}

impl BilingualText {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

/// Poems retrieved for a description, paired with their translations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimilarPoems {
    pub poems: Vec<BilingualText>,
}

impl SimilarPoems {
    /// Primary-language poems, in the shape the generate call expects.
    pub fn primary_texts(&self) -> Vec<String> {
        self.poems.iter().map(|p| p.primary.clone()).collect()
    }
}

/// A blank `error` field is not a failure; only a non-empty one is.
pub fn reported_error(error: Option<String>) -> Option<String> {
    error.filter(|e| !e.trim().is_empty())
}

#[derive(Serialize, Debug)]
pub struct DescribeRequest<'a> {
    pub media_url: &'a str,
}

#[derive(Deserialize, Debug, Default)]
pub struct DescribeResponse {
    #[serde(default)]
    pub video_desc: Option<String>,
    #[serde(default)]
    pub video_desc_eng: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DescribeResponse {
    pub fn into_result(self) -> Result<BilingualText, StageError> {
        if let Some(error) = reported_error(self.error) {
            return Err(StageError::Application(error));
        }
        let primary = self
            .video_desc
            .ok_or_else(|| StageError::Decode("missing video_desc".to_string()))?;
        Ok(BilingualText::new(
            primary,
            self.video_desc_eng.unwrap_or_default(),
        ))
    }
}

#[derive(Serialize, Debug)]
pub struct SimilarPoemsRequest<'a> {
    pub video_description: &'a str,
}

#[derive(Deserialize, Debug, Default)]
pub struct SimilarPoemsResponse {
    #[serde(default)]
    pub similar_poems: Option<Vec<String>>,
    #[serde(default)]
    pub similar_poems_eng: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SimilarPoemsResponse {
    pub fn into_result(self) -> Result<SimilarPoems, StageError> {
        if let Some(error) = reported_error(self.error) {
            return Err(StageError::Application(error));
        }
        let primary = self
            .similar_poems
            .ok_or_else(|| StageError::Decode("missing similar_poems".to_string()))?;
        let mut translations = self.similar_poems_eng.into_iter();
        let poems = primary
            .into_iter()
            .map(|p| BilingualText::new(p, translations.next().unwrap_or_default()))
            .collect();
        Ok(SimilarPoems { poems })
    }
}

#[derive(Serialize, Debug)]
pub struct GeneratePoemRequest<'a> {
    pub video_description: &'a str,
    pub similar_poems: &'a [String],
}

#[derive(Deserialize, Debug, Default)]
pub struct GeneratePoemResponse {
    #[serde(default)]
    pub poem: Option<String>,
    #[serde(default)]
    pub poem_eng: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GeneratePoemResponse {
    pub fn into_result(self) -> Result<BilingualText, StageError> {
        if let Some(error) = reported_error(self.error) {
            return Err(StageError::Application(error));
        }
        let primary = self
            .poem
            .ok_or_else(|| StageError::Decode("missing poem".to_string()))?;
        Ok(BilingualText::new(primary, self.poem_eng.unwrap_or_default()))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct UploadResponse {
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct PoemRequest<'a> {
    pub poem: &'a str,
}

/// The poem with some characters swapped for glyph markup.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphPoem {
    #[serde(default)]
    pub poem_in_simple_el: String,
    #[serde(default)]
    pub poem_in_list: Vec<GlyphToken>,
    #[serde(default)]
    pub replaced_ind: Vec<usize>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GlyphPoemResponse {
    #[serde(flatten)]
    pub poem: GlyphPoem,
    #[serde(default)]
    pub error: Option<String>,
}

impl GlyphPoemResponse {
    pub fn into_result(self) -> Result<GlyphPoem, StageError> {
        if let Some(error) = reported_error(self.error) {
            return Err(StageError::Application(error));
        }
        if self.poem.poem_in_simple_el.is_empty() {
            return Err(StageError::Decode("missing poem_in_simple_el".to_string()));
        }
        Ok(self.poem)
    }
}

/// The character the guessing page reveals.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCharacter {
    #[serde(default)]
    pub char_cn: String,
    #[serde(default)]
    pub char_pos: usize,
    #[serde(default)]
    pub char_translate: String,
    #[serde(default)]
    pub simple_el: Vec<u32>,
    #[serde(default)]
    pub guess_char: Vec<String>,
    #[serde(default)]
    pub guess_char_eng: Vec<String>,
    #[serde(default)]
    pub char_img_path: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GeneratedCharacterResponse {
    #[serde(flatten)]
    pub character: GeneratedCharacter,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GeneratedCharacterResponse {
    pub fn into_result(self) -> Result<GeneratedCharacter, StageError> {
        if let Some(error) = reported_error(self.error) {
            let text = match self.message {
                Some(message) => format!("{error}: {message}"),
                None => error,
            };
            return Err(StageError::Application(text));
        }
        if self.character.char_cn.is_empty() {
            return Err(StageError::Decode("missing char_cn".to_string()));
        }
        Ok(self.character)
    }
}

#[derive(Serialize, Debug)]
pub struct UserNameRequest<'a> {
    pub user_name: &'a str,
}

#[derive(Serialize, Debug)]
pub struct StoragePreferenceRequest<'a> {
    pub storage_preference: &'a str,
}

/// `{"status": "success"}` or `{"status": "error", "message": ...}`.
#[derive(Deserialize, Debug, Default)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn into_result(self) -> Result<(), StageError> {
        if let Some(error) = reported_error(self.error) {
            return Err(StageError::Application(error));
        }
        if self.status.as_deref() == Some("error") {
            let message = reported_error(self.message)
                .unwrap_or_else(|| "Unknown error occurred".to_string());
            return Err(StageError::Application(message));
        }
        Ok(())
    }
}

/// A stored character. Older entries carry only the glyph components.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum DictionaryEntry {
    Components(Vec<u32>),
    Translated {
        #[serde(default)]
        char_3dim: Vec<u32>,
        #[serde(default)]
        char_translate: String,
    },
}

impl DictionaryEntry {
    pub fn components(&self) -> &[u32] {
        match self {
            Self::Components(components) => components,
            Self::Translated { char_3dim, .. } => char_3dim,
        }
    }

    /// English gloss, or the character itself when none was stored.
    pub fn translation<'a>(&'a self, character: &'a str) -> &'a str {
        match self {
            Self::Translated { char_translate, .. } if !char_translate.is_empty() => {
                char_translate
            }
            _ => character,
        }
    }
}

/// Kept characters keyed by the character itself.
pub type Dictionary = BTreeMap<String, DictionaryEntry>;

/// Dictionary bodies are a bare map, or `{"error": ...}` on failure.
#[derive(Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct DictionaryResponse(pub BTreeMap<String, serde_json::Value>);

impl DictionaryResponse {
    pub fn into_result(mut self) -> Result<Dictionary, StageError> {
        if let Some(serde_json::Value::String(error)) = self.0.remove("error") {
            if let Some(error) = reported_error(Some(error)) {
                return Err(StageError::Application(error));
            }
        }
        self.0
            .into_iter()
            .map(|(character, value)| {
                serde_json::from_value(value)
                    .map(|entry| (character.clone(), entry))
                    .map_err(|e| StageError::Decode(format!("entry {character}: {e}")))
            })
            .collect()
    }
}

/// The failure fields of a non-OK response body.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub fn reason(self) -> Option<String> {
        reported_error(self.error).or(reported_error(self.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describe_response_decodes_pair() {
        let resp: DescribeResponse = serde_json::from_value(json!({
            "video_desc": "我看到一朵花。",
            "video_desc_eng": "I see a flower."
        }))
        .unwrap();
        let text = resp.into_result().unwrap();
        assert_eq!(text.primary, "我看到一朵花。");
        assert_eq!(text.secondary, "I see a flower.");
    }

    #[test]
    fn error_field_wins_over_payload() {
        let resp: DescribeResponse = serde_json::from_value(json!({
            "video_desc": "ignored",
            "error": "vision model unavailable"
        }))
        .unwrap();
        match resp.into_result() {
            Err(StageError::Application(msg)) => assert_eq!(msg, "vision model unavailable"),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[test]
    fn blank_error_field_does_not_fail_the_stage() {
        let resp: DescribeResponse = serde_json::from_value(json!({
            "video_desc": "花",
            "video_desc_eng": "flower",
            "error": ""
        }))
        .unwrap();
        assert_eq!(resp.into_result().unwrap(), BilingualText::new("花", "flower"));

        let resp: GeneratePoemResponse = serde_json::from_value(json!({
            "poem": "花开",
            "error": "  "
        }))
        .unwrap();
        assert_eq!(resp.into_result().unwrap().primary, "花开");
    }

    #[test]
    fn missing_payload_is_a_decode_error() {
        let resp: GeneratePoemResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(resp.into_result(), Err(StageError::Decode(_))));
    }

    #[test]
    fn similar_poems_pair_up_and_tolerate_short_translation_list() {
        let resp: SimilarPoemsResponse = serde_json::from_value(json!({
            "similar_poems": ["一", "二", "三"],
            "similar_poems_eng": ["one", "two"]
        }))
        .unwrap();
        let poems = resp.into_result().unwrap();
        assert_eq!(poems.poems.len(), 3);
        assert_eq!(poems.poems[1], BilingualText::new("二", "two"));
        assert_eq!(poems.poems[2].secondary, "");
        assert_eq!(poems.primary_texts(), vec!["一", "二", "三"]);
    }

    #[test]
    fn generate_request_serializes_field_names() {
        let similar = vec!["江永女书奇".to_string()];
        let req = GeneratePoemRequest {
            video_description: "desc",
            similar_poems: &similar,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["video_description"], "desc");
        assert_eq!(json["similar_poems"][0], "江永女书奇");
    }

    #[test]
    fn generated_character_error_includes_message() {
        let resp: GeneratedCharacterResponse = serde_json::from_value(json!({
            "error": "参数错误",
            "message": "请提供有效的诗句数据"
        }))
        .unwrap();
        match resp.into_result() {
            Err(StageError::Application(msg)) => assert_eq!(msg, "参数错误: 请提供有效的诗句数据"),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[test]
    fn status_error_carries_the_server_message() {
        let resp: StatusResponse = serde_json::from_value(json!({
            "status": "error",
            "message": "Missing character data"
        }))
        .unwrap();
        match resp.into_result() {
            Err(StageError::Application(msg)) => assert_eq!(msg, "Missing character data"),
            other => panic!("expected application error, got {other:?}"),
        }

        let ok: StatusResponse = serde_json::from_value(json!({ "status": "success" })).unwrap();
        assert!(ok.into_result().is_ok());
    }

    #[test]
    fn dictionary_accepts_old_and_new_entries() {
        let resp: DictionaryResponse = serde_json::from_value(json!({
            "江": [14, 0, 16],
            "花": { "char_3dim": [3, 1, 2], "char_translate": "flower" }
        }))
        .unwrap();
        let dictionary = resp.into_result().unwrap();
        assert_eq!(dictionary["江"].components(), &[14, 0, 16]);
        assert_eq!(dictionary["江"].translation("江"), "江");
        assert_eq!(dictionary["花"].translation("花"), "flower");
    }

    #[test]
    fn dictionary_error_body_fails() {
        let resp: DictionaryResponse =
            serde_json::from_value(json!({ "error": "dictionary file missing" })).unwrap();
        assert!(matches!(
            resp.into_result(),
            Err(StageError::Application(ref m)) if m == "dictionary file missing"
        ));
    }

    #[test]
    fn glyph_poem_decodes_flattened_fields() {
        let resp: GlyphPoemResponse = serde_json::from_value(json!({
            "poem_orig": "江永女书奇，闺中秘语稀。",
            "poem_in_list": ["江", "永", [14, 0, 16]],
            "poem_in_simple_el": "江永[14,0,16]书奇，闺中秘语稀。",
            "replaced_ind": [2]
        }))
        .unwrap();
        let poem = resp.into_result().unwrap();
        assert_eq!(poem.replaced_ind, vec![2]);
        assert_eq!(poem.poem_in_list[2], GlyphToken::Glyph(vec![14, 0, 16]));
        assert!(poem.poem_in_simple_el.contains("[14,0,16]"));
    }
}
