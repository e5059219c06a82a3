// Identity matching between local items and remote sets

use watchsync_models::{ExternalIds, LocalItem, MatchResult, MatchTier, RemoteItem};

/// Find the best remote counterpart for one local item.
///
/// Precedence, first hit wins:
/// 1. exact match on a validated primary external id
/// 2. exact match on the secondary external id
/// 3. case-insensitive exact match on (title, year); episodes additionally
///    require the same season and episode numbers
///
/// There is no fuzzy or partial title matching: an ambiguous title stays
/// unmatched rather than risking a wrong pairing.
pub fn match_item(local: &LocalItem, remote_set: &[RemoteItem]) -> MatchResult {
    if let Some(local_imdb) = local.ids.validated_imdb_id() {
        for (index, remote) in remote_set.iter().enumerate() {
            if remote.ids.validated_imdb_id() == Some(local_imdb) {
                return matched(local, remote, index, MatchTier::PrimaryId);
            }
        }
    }

    if let Some(local_tmdb) = local.ids.tmdb_id {
        for (index, remote) in remote_set.iter().enumerate() {
            if remote.ids.tmdb_id == Some(local_tmdb) {
                return matched(local, remote, index, MatchTier::SecondaryId);
            }
        }
    }

    for (index, remote) in remote_set.iter().enumerate() {
        if title_year_matches(local, remote) {
            return matched(local, remote, index, MatchTier::TitleYear);
        }
    }

    MatchResult::unmatched()
}

/// True when the two id sets share a validated primary id or a secondary id.
pub fn ids_overlap(a: &ExternalIds, b: &ExternalIds) -> bool {
    if let (Some(a_imdb), Some(b_imdb)) = (a.validated_imdb_id(), b.validated_imdb_id()) {
        if a_imdb == b_imdb {
            return true;
        }
    }
    matches!((a.tmdb_id, b.tmdb_id), (Some(a_tmdb), Some(b_tmdb)) if a_tmdb == b_tmdb)
}

fn matched(local: &LocalItem, remote: &RemoteItem, index: usize, tier: MatchTier) -> MatchResult {
    // Surface a remote primary id the local item lacks so the library can
    // adopt it. The matcher itself never mutates anything.
    let backfill = match remote.ids.validated_imdb_id() {
        Some(remote_imdb) if local.ids.validated_imdb_id().is_none() => {
            Some(remote_imdb.to_string())
        }
        _ => None,
    };
    MatchResult {
        remote_index: Some(index),
        tier: Some(tier),
        backfill_imdb_id: backfill,
    }
}

fn title_year_matches(local: &LocalItem, remote: &RemoteItem) -> bool {
    if !local.title.eq_ignore_ascii_case(&remote.title) || local.year != remote.year {
        return false;
    }
    match (&local.episode, &remote.episode) {
        (None, None) => true,
        (Some(l), Some(r)) => l.season == r.season && l.episode == r.episode,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchsync_models::EpisodeKey;

    fn local(title: &str, year: Option<u32>, imdb: Option<&str>, tmdb: Option<u64>) -> LocalItem {
        LocalItem {
            library_id: 1,
            title: title.to_string(),
            year,
            episode: None,
            ids: ExternalIds {
                imdb_id: imdb.map(|s| s.to_string()),
                tmdb_id: tmdb,
            },
            play_count: 0,
            in_collection: true,
            user_rating: None,
            files: Vec::new(),
            source: "videodb".to_string(),
        }
    }

    fn remote(title: &str, year: Option<u32>, imdb: Option<&str>, tmdb: Option<u64>) -> RemoteItem {
        RemoteItem {
            ids: ExternalIds {
                imdb_id: imdb.map(|s| s.to_string()),
                tmdb_id: tmdb,
            },
            title: title.to_string(),
            year,
            episode: None,
            play_count: 0,
            in_collection: true,
            unseen_override: false,
        }
    }

    #[test]
    fn test_primary_id_beats_title_year() {
        let item = local("Alpha", Some(2001), Some("tt0000001"), None);
        let remotes = vec![
            remote("Alpha", Some(2001), None, None),
            remote("Something Else", Some(1990), Some("tt0000001"), None),
        ];
        let result = match_item(&item, &remotes);
        assert_eq!(result.remote_index, Some(1));
        assert_eq!(result.tier, Some(MatchTier::PrimaryId));
    }

    #[test]
    fn test_secondary_id_beats_title_year() {
        let item = local("Alpha", Some(2001), None, Some(42));
        let remotes = vec![
            remote("Alpha", Some(2001), None, None),
            remote("Renamed Alpha", Some(2001), None, Some(42)),
        ];
        let result = match_item(&item, &remotes);
        assert_eq!(result.remote_index, Some(1));
        assert_eq!(result.tier, Some(MatchTier::SecondaryId));
    }

    #[test]
    fn test_invalid_primary_id_is_treated_as_absent() {
        let item = local("Alpha", Some(2001), Some("bogus-id"), None);
        let remotes = vec![remote("Alpha", Some(2001), Some("bogus-id"), None)];
        let result = match_item(&item, &remotes);
        // Falls through to title/year, never pairs on the malformed id
        assert_eq!(result.tier, Some(MatchTier::TitleYear));
    }

    #[test]
    fn test_title_year_fallback_sets_backfill() {
        // A local item with no id pairs on title/year and flags the
        // remote's primary id for adoption.
        let item = local("alpha", Some(2001), None, None);
        let remotes = vec![remote("Alpha", Some(2001), Some("tt0000001"), None)];
        let result = match_item(&item, &remotes);
        assert_eq!(result.tier, Some(MatchTier::TitleYear));
        assert_eq!(result.backfill_imdb_id.as_deref(), Some("tt0000001"));
    }

    #[test]
    fn test_year_mismatch_is_unmatched() {
        let item = local("Alpha", Some(2001), None, None);
        let remotes = vec![remote("Alpha", Some(2002), None, None)];
        assert!(!match_item(&item, &remotes).is_match());
    }

    #[test]
    fn test_episode_fallback_requires_same_position() {
        let mut item = local("Some Show", Some(2010), None, None);
        item.episode = Some(EpisodeKey {
            show_id: Some(7),
            season: 2,
            episode: 5,
        });
        let mut other = remote("Some Show", Some(2010), None, None);
        other.episode = Some(EpisodeKey {
            show_id: None,
            season: 2,
            episode: 6,
        });
        let mut same = remote("Some Show", Some(2010), None, None);
        same.episode = Some(EpisodeKey {
            show_id: None,
            season: 2,
            episode: 5,
        });

        assert!(!match_item(&item, &[other.clone()]).is_match());
        let result = match_item(&item, &[other, same]);
        assert_eq!(result.remote_index, Some(1));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let item = local("Alpha", Some(2001), Some("tt0000001"), Some(42));
        let remotes = vec![
            remote("Alpha", Some(2001), Some("tt0000001"), None),
            remote("Alpha", Some(2001), None, Some(42)),
        ];
        let first = match_item(&item, &remotes);
        for _ in 0..10 {
            assert_eq!(match_item(&item, &remotes), first);
        }
    }
}
