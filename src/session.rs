//! Per-visitor state carried between pages.

use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Character the guessing page should emphasise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightHint {
    pub character: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStorage {
    pub session_id: SessionId,
    #[serde(default)]
    pub agreed_to_privacy: bool,
    #[serde(default)]
    pub highlight_hint: Option<HighlightHint>,
}

impl SessionStorage {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            agreed_to_privacy: false,
            highlight_hint: None,
        }
    }

    pub fn agree_to_privacy(&mut self) {
        self.agreed_to_privacy = true;
    }

    pub fn set_highlight(&mut self, character: impl Into<String>, position: usize) {
        self.highlight_hint = Some(HighlightHint {
            character: character.into(),
            position,
        });
    }

    pub fn take_highlight(&mut self) -> Option<HighlightHint> {
        self.highlight_hint.take()
    }
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new(SessionId::generate())
    }
}
