pub mod api;
pub mod app_config;
pub mod backend;
pub mod config;
pub mod errors;
pub mod events;
pub mod glyphs;
pub mod guess;
pub mod handoff;
pub mod keep;
pub mod media;
pub mod pipeline;
pub mod poem;
pub mod reveal;
pub mod runtime;
pub mod sanitize;
pub mod session;
pub mod tracker;
pub mod types;
pub mod ui;
pub mod upload;

pub use crate::app_config::AppConfig;
pub use crate::backend::{HttpBackend, PoemBackend};
pub use crate::errors::{
    GuessError, KeepError, MediaError, PipelineError, StageError, UploadError,
};
pub use crate::handoff::{GuessParams, ThinkParams};
pub use crate::pipeline::{ThinkOutcome, ThinkPipeline};
pub use crate::tracker::StepTracker;
