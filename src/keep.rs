//! After the guess: record who keeps the character, optionally add it to the
//! shared dictionary, and browse what has been kept so far.

use serde::Serialize;

use crate::api::Dictionary;
use crate::backend::PoemBackend;
use crate::errors::{KeepError, StageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePreference {
    Yes,
    No,
}

impl StoragePreference {
    pub fn from_flag(store: bool) -> Self {
        if store { Self::Yes } else { Self::No }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeepReceipt {
    pub user_name: String,
    pub preference: StoragePreference,
    pub stored: bool,
}

/// Save the keeper's name and storage choice for the character generated
/// earlier in this backend session. `Yes` also adds it to the dictionary.
pub async fn keep_character(
    backend: &dyn PoemBackend,
    user_name: &str,
    preference: StoragePreference,
) -> Result<KeepReceipt, KeepError> {
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return Err(KeepError::MissingName);
    }

    backend.save_user_name(user_name).await?;
    backend.save_storage_preference(preference.as_str()).await?;

    let stored = preference == StoragePreference::Yes;
    if stored {
        backend.add_to_dictionary().await?;
    }
    log::debug!(
        "kept character for {user_name} (storage: {})",
        preference.as_str()
    );

    Ok(KeepReceipt {
        user_name: user_name.to_string(),
        preference,
        stored,
    })
}

/// The whole dictionary, or only entries matching `term`. The term is
/// trimmed and lowercased; a blank term lists everything.
pub async fn lookup(
    backend: &dyn PoemBackend,
    term: Option<&str>,
) -> Result<Dictionary, StageError> {
    match term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(term) => backend.search_dictionary(&term.to_lowercase()).await,
        None => backend.get_dictionary().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_follows_the_flag() {
        assert_eq!(StoragePreference::from_flag(true).as_str(), "yes");
        assert_eq!(StoragePreference::from_flag(false).as_str(), "no");
    }

    #[test]
    fn receipt_serializes_lowercase_preference() {
        let receipt = KeepReceipt {
            user_name: "Mei".to_string(),
            preference: StoragePreference::Yes,
            stored: true,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["preference"], "yes");
        assert_eq!(json["stored"], true);
    }
}
