use serde::{Deserialize, Serialize};

use crate::ids::ExternalIds;

/// Entity classes reconciled independently per pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityClass {
    Movies,
    Episodes,
}

impl EntityClass {
    pub const ALL: [EntityClass; 2] = [EntityClass::Movies, EntityClass::Episodes];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Movies => "movies",
            EntityClass::Episodes => "episodes",
        }
    }
}

/// Position of an episode within its show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    /// Local library id of the owning show. Only meaningful on the local side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_id: Option<u64>,
    pub season: u32,
    pub episode: u32,
}

/// One unit of local media as reported by the local library.
///
/// The engine only reads these; identity fields are mutated exclusively
/// through the library's own API (see `LocalLibrary::adopt_external_id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalItem {
    /// Stable identifier inside the local library.
    pub library_id: u64,
    pub title: String,
    pub year: Option<u32>,
    /// Set for episodes, absent for movies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeKey>,
    #[serde(default)]
    pub ids: ExternalIds,
    pub play_count: u32,
    pub in_collection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<u8>,
    #[serde(default)]
    pub files: Vec<String>,
    /// Which local-library source this item came from.
    pub source: String,
}

impl LocalItem {
    pub fn is_watched(&self) -> bool {
        self.play_count > 0
    }
}

/// The remote service's view of one title.
///
/// Read-only snapshot; the engine never mutates these, it only submits
/// operations referencing them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteItem {
    #[serde(default)]
    pub ids: ExternalIds,
    pub title: String,
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeKey>,
    pub play_count: u32,
    pub in_collection: bool,
    /// Service-side explicit not-watched mark. Takes precedence over a
    /// positive play count.
    #[serde(default)]
    pub unseen_override: bool,
}

impl RemoteItem {
    pub fn is_watched(&self) -> bool {
        self.play_count > 0 && !self.unseen_override
    }
}
