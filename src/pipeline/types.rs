use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::BilingualText;

/// The remote stages of the think page, in run order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Describe,
    FindSimilar,
    Generate,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Describe, StageKind::FindSimilar, StageKind::Generate];

    pub fn index(&self) -> usize {
        match self {
            StageKind::Describe => 0,
            StageKind::FindSimilar => 1,
            StageKind::Generate => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Describe => "describe media",
            StageKind::FindSimilar => "find similar poems",
            StageKind::Generate => "generate poem",
        }
    }

    /// Step text while the stage is pending or running.
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Describe => "The agent is seeing...",
            StageKind::FindSimilar => "The agent is thinking...",
            StageKind::Generate => "The agent is reflecting...",
        }
    }

    pub fn completion_text(&self) -> &'static str {
        match self {
            StageKind::Describe => "Media analysis completed",
            StageKind::FindSimilar => "Found similar poems",
            StageKind::Generate => "Generated new poem",
        }
    }

    pub fn failure_prefix(&self) -> &'static str {
        match self {
            StageKind::Describe => "Failed to analyze media",
            StageKind::FindSimilar => "Failed to find similar poems",
            StageKind::Generate => "Failed to generate poem",
        }
    }

    pub fn next(&self) -> Option<StageKind> {
        StageKind::ALL.get(self.index() + 1).copied()
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Requesting(StageKind),
    Revealing(StageKind),
    Dwelling(StageKind),
    Advancing,
    Finished,
    Error(StageKind),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Failed { error: String },
}

/// What happened to one stage; appended to the run log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageKind,
    /// Offset of the stage start from the run start
    pub started_ms: u64,
    /// Time from stage start to response
    pub response_ms: u64,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

impl StageRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome == StageOutcome::Completed
    }
}

/// Result of a finished run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThinkOutcome {
    pub description: BilingualText,
    pub similar_poems: Vec<BilingualText>,
    pub poem: BilingualText,
    pub guess_link: String,
}
