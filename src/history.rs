//! Listening history as the weight engine consumes it.
//!
//! Built once per run from the catalog: top-track ranks, "too much"
//! occurrence counts, and, when an artist-level feature is on, per-artist
//! occurrence sums plus the name blacklist.
//!
//! Counting is by occurrence throughout. A track listed three times in the
//! "too much" playlist counts three times for the track and three times for
//! its artist.

use crate::catalog::{CatalogResult, CatalogService};
use crate::config::CurateConfig;
use crate::model::{ArtistId, PlayHistorySignal, PlaylistId, Track, TrackId};
use log::info;
use std::collections::HashMap;

/// Occurrences at which an artist counts as heard too much.
pub const TOO_MUCH_ARTIST_THRESHOLD: u32 = 3;
/// Occurrences at which an artist's name is blacklisted.
pub const BLACKLIST_THRESHOLD: u32 = 10;

/// Case-insensitive substring blacklist over artist display names.
///
/// An entry blacklists every artist whose name *contains* it, so `"Be"`
/// also catches `"Beyoncé"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    names: Vec<String>,
    lowered: Vec<String>,
}

impl Blacklist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        let lowered = names.iter().map(|name| name.to_lowercase()).collect();
        Self { names, lowered }
    }

    /// The entry that blacklists `artist_name`, if any.
    #[must_use]
    pub fn matching(&self, artist_name: &str) -> Option<&str> {
        let candidate = artist_name.to_lowercase();
        self.lowered
            .iter()
            .position(|entry| candidate.contains(entry.as_str()))
            .map(|idx| self.names[idx].as_str())
    }

    #[must_use]
    pub fn is_blacklisted(&self, artist_name: &str) -> bool {
        self.matching(artist_name).is_some()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-artist occurrence sums over the "too much" playlist.
///
/// Sums are keyed by display name, the same key the blacklist matches on.
/// Artist ids are kept only to tie a candidate track back to that name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistAggregates {
    /// Display name of every artist id seen in the list.
    pub names_by_id: HashMap<ArtistId, String>,
    pub by_name: HashMap<String, u32>,
}

impl ArtistAggregates {
    /// Sum `occurrences` per artist for every track in `info`.
    #[must_use]
    pub fn tally(occurrences: &HashMap<TrackId, u32>, info: &HashMap<TrackId, Track>) -> Self {
        let mut aggregates = Self::default();
        for (track_id, track) in info {
            let count = occurrences.get(track_id).copied().unwrap_or(1);
            *aggregates.by_name.entry(track.artist_name.clone()).or_default() += count;
            if let Some(artist_id) = &track.artist_id {
                aggregates
                    .names_by_id
                    .insert(artist_id.clone(), track.artist_name.clone());
            }
        }
        aggregates
    }

    /// Whether the artist behind `artist_id` reaches
    /// [`TOO_MUCH_ARTIST_THRESHOLD`] occurrences.
    #[must_use]
    pub fn hears_too_much(&self, artist_id: &str) -> bool {
        self.names_by_id
            .get(artist_id)
            .and_then(|name| self.by_name.get(name))
            .is_some_and(|&count| count >= TOO_MUCH_ARTIST_THRESHOLD)
    }

    /// Display names at or above `threshold`, sorted by count then name.
    #[must_use]
    pub fn names_at_least(&self, threshold: u32) -> Vec<(&str, u32)> {
        let mut names: Vec<(&str, u32)> = self
            .by_name
            .iter()
            .filter(|(_, count)| **count >= threshold)
            .map(|(name, &count)| (name.as_str(), count))
            .collect();
        names.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        names
    }
}

/// Everything the weight engine needs to know about the user's listening.
#[derive(Debug, Clone, Default)]
pub struct PlayHistory {
    top_positions: HashMap<TrackId, usize>,
    overplay_counts: HashMap<TrackId, u32>,
    artists: ArtistAggregates,
    blacklist: Blacklist,
}

impl PlayHistory {
    /// Assemble history from already-fetched lists.
    ///
    /// `top_tracks` is rank-ordered; `too_much` keeps its duplicates.
    #[must_use]
    pub fn from_parts(
        top_tracks: &[TrackId],
        too_much: &[TrackId],
        artists: ArtistAggregates,
        blacklist: Blacklist,
    ) -> Self {
        Self {
            top_positions: rank_positions(top_tracks),
            overplay_counts: count_occurrences(too_much),
            artists,
            blacklist,
        }
    }

    /// Fetch top tracks and the "too much" playlist, then derive the artist
    /// aggregates and blacklist the config asks for.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub fn gather<C: CatalogService + ?Sized>(
        catalog: &C,
        too_much_id: &PlaylistId,
        config: &CurateConfig,
    ) -> CatalogResult<Self> {
        let top_tracks = catalog.top_tracks(config.top_tracks_limit, config.top_tracks_time_range)?;
        let too_much = catalog.playlist_tracks(too_much_id)?;
        info!(
            "History: {} top tracks ({}), {} entries in the too-much list",
            top_tracks.len(),
            config.top_tracks_time_range,
            too_much.len()
        );

        let mut history = Self::from_parts(
            &top_tracks,
            &too_much,
            ArtistAggregates::default(),
            Blacklist::default(),
        );
        if !config.wants_artist_aggregates() || too_much.is_empty() {
            return Ok(history);
        }

        let distinct: Vec<TrackId> = history.overplay_counts.keys().cloned().collect();
        let info = catalog.tracks_info(&distinct)?;
        history.artists = ArtistAggregates::tally(&history.overplay_counts, &info);

        let heavy = history.artists.names_at_least(TOO_MUCH_ARTIST_THRESHOLD);
        if !heavy.is_empty() {
            info!(
                "Found {} artists with {TOO_MUCH_ARTIST_THRESHOLD}+ songs in the too-much list",
                heavy.len()
            );
            for (name, count) in &heavy {
                let status = if *count >= BLACKLIST_THRESHOLD { " (BLACKLISTED)" } else { "" };
                info!("  {name}: {count} songs{status}");
            }
        }

        if config.artist_blacklist {
            history.blacklist = Blacklist::new(
                history
                    .artists
                    .names_at_least(BLACKLIST_THRESHOLD)
                    .into_iter()
                    .map(|(name, _)| name.to_string()),
            );
            if !history.blacklist.is_empty() {
                info!("Blacklisted artists: {}", history.blacklist.names().join(", "));
            }
        }

        Ok(history)
    }

    #[must_use]
    pub fn signal(&self, track_id: &str) -> PlayHistorySignal {
        PlayHistorySignal {
            overplay_count: self.overplay_counts.get(track_id).copied().unwrap_or(0),
            top_rank: self.top_positions.get(track_id).copied(),
        }
    }

    /// Whether artist escalation may apply to `artist_id` at all. The
    /// penalty itself depends on which of the artist's tracks are up for
    /// selection, see [`crate::master::MasterAssembler::artist_escalation`].
    #[must_use]
    pub fn hears_too_much(&self, artist_id: &str) -> bool {
        self.artists.hears_too_much(artist_id)
    }

    #[must_use]
    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }
}

/// 0-based rank per id; the first occurrence wins.
fn rank_positions(ids: &[TrackId]) -> HashMap<TrackId, usize> {
    let mut positions = HashMap::with_capacity(ids.len());
    for (rank, id) in ids.iter().enumerate() {
        positions.entry(id.clone()).or_insert(rank);
    }
    positions
}

fn count_occurrences(ids: &[TrackId]) -> HashMap<TrackId, u32> {
    let mut counts = HashMap::new();
    for id in ids {
        *counts.entry(id.clone()).or_default() += 1;
    }
    counts
}
