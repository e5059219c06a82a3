use serde::{Deserialize, Serialize};

use crate::item::LocalItem;

/// A local item that failed remote matching (not found / invalid on the
/// service side). Suppressed from diffing until the registry-wide cooldown
/// expires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkipRecord {
    pub title: String,
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl SkipRecord {
    pub fn for_item(item: &LocalItem) -> Self {
        Self {
            title: item.title.clone(),
            year: item.year,
            external_id: item.ids.any_id(),
        }
    }

    pub fn matches(&self, item: &LocalItem) -> bool {
        record_matches(&self.title, self.year, self.external_id.as_deref(), item)
    }
}

/// A local item known to exist remotely under a different identity
/// (e.g. an alternate title), recorded so it is not resent every pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlreadyExistsRecord {
    pub title: String,
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl AlreadyExistsRecord {
    pub fn for_item(item: &LocalItem) -> Self {
        Self {
            title: item.title.clone(),
            year: item.year,
            external_id: item.ids.any_id(),
        }
    }

    pub fn matches(&self, item: &LocalItem) -> bool {
        record_matches(&self.title, self.year, self.external_id.as_deref(), item)
    }
}

/// A record matches an item on external id when both carry one, otherwise
/// on case-insensitive (title, year).
fn record_matches(
    title: &str,
    year: Option<u32>,
    external_id: Option<&str>,
    item: &LocalItem,
) -> bool {
    if let (Some(record_id), Some(item_id)) = (external_id, item.ids.any_id()) {
        if record_id == item_id {
            return true;
        }
    }
    title.eq_ignore_ascii_case(&item.title) && year == item.year
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ExternalIds;

    fn local(title: &str, year: Option<u32>, imdb: Option<&str>) -> LocalItem {
        LocalItem {
            library_id: 1,
            title: title.to_string(),
            year,
            episode: None,
            ids: ExternalIds {
                imdb_id: imdb.map(|s| s.to_string()),
                tmdb_id: None,
            },
            play_count: 0,
            in_collection: true,
            user_rating: None,
            files: Vec::new(),
            source: "videodb".to_string(),
        }
    }

    #[test]
    fn test_record_matches_by_external_id() {
        let record = SkipRecord {
            title: "Old Title".to_string(),
            year: Some(1999),
            external_id: Some("tt0133093".to_string()),
        };
        // Title changed locally, id did not.
        assert!(record.matches(&local("The Matrix", Some(1999), Some("tt0133093"))));
    }

    #[test]
    fn test_record_matches_by_title_year() {
        let record = AlreadyExistsRecord {
            title: "alpha".to_string(),
            year: Some(2001),
            external_id: None,
        };
        assert!(record.matches(&local("Alpha", Some(2001), None)));
        assert!(!record.matches(&local("Alpha", Some(2002), None)));
    }
}
