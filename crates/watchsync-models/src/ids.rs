use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// External identifiers for one title.
///
/// Two id spaces are carried: a primary content-database id (IMDb-style,
/// `tt` + digits) and a secondary numeric id (TMDb-style). Items from either
/// side may have any subset of these; matching never trusts a structurally
/// invalid primary id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<u64>,
}

impl ExternalIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary id, but only when it is structurally valid.
    ///
    /// A malformed id (wrong prefix, non-digits, too short) is treated as
    /// absent rather than matched against.
    pub fn validated_imdb_id(&self) -> Option<&str> {
        self.imdb_id
            .as_deref()
            .filter(|id| is_valid_imdb_id(id))
    }

    /// Merge ids from another set, only filling in missing values.
    pub fn merge(&mut self, other: &ExternalIds) {
        if self.imdb_id.is_none() {
            self.imdb_id = other.imdb_id.clone();
        }
        if self.tmdb_id.is_none() {
            self.tmdb_id = other.tmdb_id;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imdb_id.is_none() && self.tmdb_id.is_none()
    }

    /// Any available id as a string, preferring the primary space.
    pub fn any_id(&self) -> Option<String> {
        self.imdb_id
            .clone()
            .or_else(|| self.tmdb_id.map(|id| format!("tmdb:{}", id)))
    }
}

impl Hash for ExternalIds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.imdb_id.hash(state);
        self.tmdb_id.hash(state);
    }
}

/// Structural check for primary ids: `tt` prefix followed by at least
/// seven digits. Anything else is noise from a bad scrape.
pub fn is_valid_imdb_id(id: &str) -> bool {
    let Some(digits) = id.strip_prefix("tt") else {
        return false;
    };
    digits.len() >= 7 && digits.chars().all(|c| c.is_ascii_digit())
}
