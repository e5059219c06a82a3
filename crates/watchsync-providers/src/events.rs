use watchsync_models::LocalItem;

/// Which fields changed in an update notification.
///
/// Only play-count and user-rating changes trigger network activity;
/// everything else is noise to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangedFields {
    pub play_count: bool,
    pub user_rating: bool,
    pub other: bool,
}

impl ChangedFields {
    pub fn play_count() -> Self {
        Self {
            play_count: true,
            ..Self::default()
        }
    }

    pub fn user_rating() -> Self {
        Self {
            user_rating: true,
            ..Self::default()
        }
    }
}

/// Asynchronous local-library mutation notification.
///
/// Delivered at-least-once; handlers must tolerate duplicates.
#[derive(Debug, Clone)]
pub enum LibraryEvent {
    Inserted(LocalItem),
    Updated {
        item: LocalItem,
        changed: ChangedFields,
    },
    Deleted(LocalItem),
}
