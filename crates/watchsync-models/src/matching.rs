/// Key space that produced a local-remote pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Exact match on a validated primary external id.
    PrimaryId,
    /// Exact match on the secondary external id.
    SecondaryId,
    /// Case-insensitive exact match on (title, year).
    TitleYear,
}

/// Transient pairing of one local item against a remote set.
///
/// Not persisted; recomputed on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Index into the remote set this item paired with, if any.
    pub remote_index: Option<usize>,
    pub tier: Option<MatchTier>,
    /// Valid primary id the remote carries but the local item lacks.
    /// The local library should adopt it; the matcher only reports it.
    pub backfill_imdb_id: Option<String>,
}

impl MatchResult {
    pub fn unmatched() -> Self {
        Self {
            remote_index: None,
            tier: None,
            backfill_imdb_id: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.remote_index.is_some()
    }
}
