use serde::{Deserialize, Serialize};

use crate::ids::ExternalIds;
use crate::item::{EntityClass, EpisodeKey, LocalItem, RemoteItem};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperationKind {
    AddToCollection,
    RemoveFromCollection,
    MarkSeen,
    MarkUnseen,
    Rate,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::AddToCollection => "add_to_collection",
            OperationKind::RemoveFromCollection => "remove_from_collection",
            OperationKind::MarkSeen => "mark_seen",
            OperationKind::MarkUnseen => "mark_unseen",
            OperationKind::Rate => "rate",
        }
    }
}

/// One item inside a batch operation, carrying just enough identity for
/// the service to resolve it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationItem {
    #[serde(default)]
    pub ids: ExternalIds,
    pub title: String,
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl From<&LocalItem> for OperationItem {
    fn from(item: &LocalItem) -> Self {
        Self {
            ids: item.ids.clone(),
            title: item.title.clone(),
            year: item.year,
            episode: item.episode.clone(),
            rating: item.user_rating,
        }
    }
}

impl From<&RemoteItem> for OperationItem {
    fn from(item: &RemoteItem) -> Self {
        Self {
            ids: item.ids.clone(),
            title: item.title.clone(),
            year: item.year,
            episode: item.episode.clone(),
            rating: None,
        }
    }
}

/// A batch instruction for the remote service. Ephemeral: built by the
/// diff engine, consumed by the service client, discarded once the
/// response is classified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncOperation {
    pub entity: EntityClass,
    pub kind: OperationKind,
    pub items: Vec<OperationItem>,
}

impl SyncOperation {
    pub fn new(entity: EntityClass, kind: OperationKind, items: Vec<OperationItem>) -> Self {
        Self { entity, kind, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Per-item status in an operation response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    /// The service could not resolve the item (invalid / missing on its
    /// content database).
    NotFound,
    /// The service reports the item is already present under some identity.
    AlreadyExists,
    Failed,
}

/// Response to a submitted operation: an overall status plus, when the
/// service provides it, per-item statuses. Absent per-item detail the
/// whole batch is treated as all-succeeded or all-failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_outcomes: Option<Vec<ItemOutcome>>,
}

impl OperationResult {
    pub fn all_succeeded() -> Self {
        Self {
            success: true,
            item_outcomes: None,
        }
    }

    pub fn all_failed() -> Self {
        Self {
            success: false,
            item_outcomes: None,
        }
    }

    pub fn with_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let success = outcomes
            .iter()
            .all(|o| !matches!(o, ItemOutcome::Failed));
        Self {
            success,
            item_outcomes: Some(outcomes),
        }
    }

    /// Outcome for the item at `index`, falling back to the overall status
    /// when the service gave no per-item detail.
    pub fn outcome_for(&self, index: usize) -> ItemOutcome {
        match &self.item_outcomes {
            Some(outcomes) => outcomes
                .get(index)
                .copied()
                .unwrap_or(if self.success {
                    ItemOutcome::Success
                } else {
                    ItemOutcome::Failed
                }),
            None => {
                if self.success {
                    ItemOutcome::Success
                } else {
                    ItemOutcome::Failed
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_for_without_per_item_detail() {
        let ok = OperationResult::all_succeeded();
        assert_eq!(ok.outcome_for(0), ItemOutcome::Success);
        assert_eq!(ok.outcome_for(17), ItemOutcome::Success);

        let failed = OperationResult::all_failed();
        assert_eq!(failed.outcome_for(3), ItemOutcome::Failed);
    }

    #[test]
    fn test_outcome_for_with_per_item_detail() {
        let result = OperationResult::with_outcomes(vec![
            ItemOutcome::Success,
            ItemOutcome::NotFound,
            ItemOutcome::AlreadyExists,
        ]);
        assert!(result.success);
        assert_eq!(result.outcome_for(1), ItemOutcome::NotFound);
        assert_eq!(result.outcome_for(2), ItemOutcome::AlreadyExists);
    }
}
