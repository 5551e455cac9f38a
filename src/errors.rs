use thiserror::Error;

/// Failure of a single remote pipeline stage. Every variant is terminal for
/// the run; the message is meant for direct display.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("{0}")]
    Application(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

/// Input rejected by the capture/upload validator before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Unsupported file type. Please upload MP4, PNG, or JPG files.")]
    UnsupportedType,

    #[error("File size exceeds {limit_mb}MB limit. Please choose a smaller file.")]
    TooLarge { size: u64, limit_mb: u64 },

    #[error("Please upload PNG or JPG images only.")]
    DisallowedImageMime(String),

    #[error("Please upload MP4 videos only.")]
    DisallowedVideoMime(String),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] MediaError),

    #[error("No recording to upload")]
    NothingToUpload,

    #[error("Upload failed: {0}")]
    Rejected(String),

    #[error("Server returned a non-JSON response. Status: {status}")]
    NotJson { status: u16 },

    #[error("Server returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Upload failed: response carried no file_url")]
    MissingUrl,

    #[error("Upload failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    #[error("Privacy policy must be accepted before continuing")]
    PrivacyNotAccepted,

    #[error("Failed to read media file: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed glyph markup such as `江永[14,0` or `书]奇`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlyphParseError {
    #[error("unclosed '[' opened at offset {offset}")]
    UnclosedBracket { offset: usize },

    #[error("unexpected ']' at offset {offset}")]
    UnexpectedClose { offset: usize },

    #[error("nested '[' at offset {offset}")]
    NestedBracket { offset: usize },

    #[error("empty glyph list at offset {offset}")]
    EmptyList { offset: usize },

    #[error("invalid glyph index '{text}' at offset {offset}")]
    InvalidNumber { offset: usize, text: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    #[error("Missing query parameter: {0}")]
    MissingParam(&'static str),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown media type: {0}")]
    UnknownMediaType(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },
}

#[derive(Error, Debug)]
pub enum GuessError {
    #[error("No poem provided")]
    MissingPoem,

    #[error("Failed to process the poem: {0}")]
    Stage(#[from] StageError),

    #[error("Failed to parse glyph markup: {0}")]
    Markup(#[from] GlyphParseError),

    #[error("Character position {pos} is outside the poem ({len} items)")]
    PositionOutOfRange { pos: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum KeepError {
    #[error("Please enter your name")]
    MissingName,

    #[error("Failed to save: {0}")]
    Stage(#[from] StageError),
}
