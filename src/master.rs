//! Master assembler.
//!
//! Pools the configured source playlists, weighs every candidate against the
//! listening history, keeps each one with probability `weight / 10`, and
//! rewrites the Master playlist. With "split the deck" on, a quarter of the
//! previous Master is blended back in so turnover is gradual.

use crate::catalog::{CatalogResult, CatalogService, LIKED_SONGS};
use crate::config::CurateConfig;
use crate::history::{PlayHistory, TOO_MUCH_ARTIST_THRESHOLD};
use crate::model::{ArtistId, PlaylistId, Track, TrackId};
use crate::weight::{compute_weight_with_artist, WeightDecision};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Why a candidate did or did not make it into Master.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Skipped before weighing; holds the matching blacklist entry.
    Blacklisted(String),
    Weighed {
        decision: WeightDecision,
        /// Occurrence count that triggered artist escalation, if any.
        artist_overplay: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackDecision {
    pub track: Track,
    pub verdict: Verdict,
}

impl TrackDecision {
    #[must_use]
    pub fn included(&self) -> bool {
        matches!(
            self.verdict,
            Verdict::Weighed { decision: WeightDecision { included: true, .. }, .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterResult {
    /// Master contents in written order.
    pub track_ids: Vec<TrackId>,
    /// One entry per deduplicated candidate, in source order.
    pub decisions: Vec<TrackDecision>,
    /// Tracks carried over from the previous Master by split-the-deck.
    pub retained: usize,
}

/// Blend freshly `selected` tracks with the oldest quarter of `current`.
///
/// `selected` is shuffled and cut at its midpoint. The back half is mixed
/// with the first `current.len() / 4` tracks of `current` and shuffled again;
/// the result is the front half followed by that mix.
///
/// # Behavior
///
/// - The output always holds `selected.len() + current.len() / 4` ids.
///   Nothing is dropped or deduplicated, so a carried-over track that was
///   also selected again appears twice.
/// - Carried-over tracks only ever land after the first
///   `selected.len() / 2` positions.
/// - A `current` shorter than four tracks carries nothing over.
///
/// # Examples
///
/// ```
/// use playlistrx::master::split_the_deck;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let selected: Vec<String> = (0..6).map(|i| format!("new{i}")).collect();
/// let current: Vec<String> = (0..8).map(|i| format!("old{i}")).collect();
///
/// let deck = split_the_deck(selected, &current, &mut StdRng::seed_from_u64(7));
/// assert_eq!(deck.len(), 8);
/// assert!(deck[..3].iter().all(|id| id.starts_with("new")));
/// assert!(deck.contains(&"old0".to_string()) && deck.contains(&"old1".to_string()));
/// ```
pub fn split_the_deck<R: Rng + ?Sized>(
    mut selected: Vec<TrackId>,
    current: &[TrackId],
    rng: &mut R,
) -> Vec<TrackId> {
    let quarter = &current[..current.len() / 4];

    selected.shuffle(rng);
    let mut tail = selected.split_off(selected.len() / 2);
    tail.extend_from_slice(quarter);
    tail.shuffle(rng);

    info!(
        "Split the deck: {} fresh + {} blended ({} kept from a Master of {})",
        selected.len(),
        tail.len(),
        quarter.len(),
        current.len()
    );
    selected.extend(tail);
    selected
}

/// Resolve source names to track ids, in order.
///
/// `"Liked Songs"` reads the saved-tracks library; any other name is looked
/// up by exact playlist name. Names that resolve to nothing are skipped.
///
/// # Errors
///
/// Propagates catalog failures.
pub fn collect_sources<C: CatalogService + ?Sized>(
    catalog: &C,
    names: &[String],
) -> CatalogResult<Vec<TrackId>> {
    let mut ids = Vec::new();
    for name in names {
        if name == LIKED_SONGS {
            let liked = catalog.liked_tracks()?;
            debug!("Source '{name}': {} tracks", liked.len());
            ids.extend(liked);
        } else if let Some(playlist_id) = catalog.find_playlist_id_by_name(name)? {
            let tracks = catalog.playlist_tracks(&playlist_id)?;
            debug!("Source '{name}': {} tracks", tracks.len());
            ids.extend(tracks);
        } else {
            debug!("Source '{name}' not found, skipping");
        }
    }
    Ok(ids)
}

/// Dedupe by id, look up metadata, then dedupe again on `"<name> - <artist>"`.
/// The first track seen for a display key wins; ids the catalog cannot
/// describe are dropped.
///
/// # Errors
///
/// Propagates catalog failures.
pub fn resolve_candidates<C: CatalogService + ?Sized>(
    catalog: &C,
    raw: &[TrackId],
) -> CatalogResult<Vec<Track>> {
    let mut seen_ids = HashSet::new();
    let distinct: Vec<TrackId> = raw
        .iter()
        .filter(|id| seen_ids.insert(id.as_str()))
        .cloned()
        .collect();

    let mut info = catalog.tracks_info(&distinct)?;
    let mut seen_keys = HashSet::new();
    let candidates = distinct
        .iter()
        .filter_map(|id| info.remove(id))
        .filter(|track| seen_keys.insert(track.display_key()))
        .collect();
    Ok(candidates)
}

pub struct MasterAssembler<'a, C: ?Sized> {
    catalog: &'a C,
    history: &'a PlayHistory,
    config: &'a CurateConfig,
}

impl<'a, C: CatalogService + ?Sized> MasterAssembler<'a, C> {
    pub fn new(catalog: &'a C, history: &'a PlayHistory, config: &'a CurateConfig) -> Self {
        Self {
            catalog,
            history,
            config,
        }
    }

    /// Escalation counts for this batch of candidates, keyed by artist id.
    ///
    /// Only artists the history marks as heard too much are counted, and
    /// only through the candidates themselves: each candidate adds its own
    /// "too much" occurrences to its artist. An artist whose overplayed songs
    /// are all absent from the sources therefore gets no entry. Artists below
    /// [`TOO_MUCH_ARTIST_THRESHOLD`] are left out, as is everything when
    /// `artistIHearTooMuch` is off.
    #[must_use]
    pub fn artist_escalation(&self, candidates: &[Track]) -> HashMap<ArtistId, u32> {
        let mut sums: HashMap<ArtistId, u32> = HashMap::new();
        if !self.config.artist_i_hear_too_much {
            return sums;
        }
        for track in candidates {
            if let Some(artist_id) = track
                .artist_id
                .as_deref()
                .filter(|artist_id| self.history.hears_too_much(artist_id))
            {
                *sums.entry(artist_id.to_string()).or_default() +=
                    self.history.signal(&track.id).overplay_count;
            }
        }
        sums.retain(|_, count| *count >= TOO_MUCH_ARTIST_THRESHOLD);
        sums
    }

    /// Weigh one candidate.
    ///
    /// `artist_overplay` is the artist's escalation count from
    /// [`artist_escalation`](Self::artist_escalation); it is ignored while
    /// `artistIHearTooMuch` is off.
    pub fn judge<R: Rng + ?Sized>(
        &self,
        track: Track,
        artist_overplay: Option<u32>,
        rng: &mut R,
    ) -> TrackDecision {
        if self.config.artist_blacklist {
            if let Some(entry) = self.history.blacklist().matching(&track.artist_name) {
                return TrackDecision {
                    verdict: Verdict::Blacklisted(entry.to_string()),
                    track,
                };
            }
        }

        let artist_overplay = artist_overplay.filter(|_| self.config.artist_i_hear_too_much);
        let weight = compute_weight_with_artist(
            self.history.signal(&track.id),
            artist_overplay,
            self.config.weight_modifier,
        );

        TrackDecision {
            verdict: Verdict::Weighed {
                decision: WeightDecision::decide(weight, rng),
                artist_overplay,
            },
            track,
        }
    }

    /// Rebuild Master from `sources` and write it to `master_id`.
    ///
    /// # Pipeline
    ///
    /// 1. [`collect_sources`] pools the source playlists in order.
    /// 2. [`resolve_candidates`] dedupes by id and then by display string.
    /// 3. Each candidate is [judged](Self::judge): blacklisted artists are
    ///    skipped, everything else is weighed with the artist escalation from
    ///    [`artist_escalation`](Self::artist_escalation) and kept with
    ///    probability `weight / 10`.
    /// 4. The kept tracks are shuffled, or blended with the current Master
    ///    through [`split_the_deck`] when that option is on and Master is not
    ///    empty.
    /// 5. Master's contents are replaced in one call.
    ///
    /// An empty `sources` list, or sources that resolve to nothing, clears
    /// Master (apart from any split-the-deck carry-over).
    ///
    /// # Errors
    ///
    /// Propagates catalog failures from any step. Rate limiting is not
    /// handled here; wrap the catalog in a
    /// [`RetryingCatalog`](crate::catalog::RetryingCatalog) for that. Master
    /// is only written in the last step, so an error leaves it untouched.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use playlistrx::catalog::{CatalogService, SqliteCatalog};
    /// use playlistrx::config::CurateConfig;
    /// use playlistrx::history::PlayHistory;
    /// use playlistrx::master::MasterAssembler;
    /// use rand::rngs::StdRng;
    /// use rand::SeedableRng;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let catalog = SqliteCatalog::open(std::path::Path::new("library.db"))?;
    /// let config = CurateConfig {
    ///     playlists_to_include: Some(vec!["Liked Songs".to_string()]),
    ///     ..CurateConfig::default()
    /// };
    /// let master_id = catalog.get_or_create_playlist("[RX] Master", "")?;
    /// let result = MasterAssembler::new(&catalog, &PlayHistory::default(), &config)
    ///     .assemble(config.source_playlists()?, &master_id, &mut StdRng::seed_from_u64(1))?;
    /// println!("{} tracks", result.track_ids.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        sources: &[String],
        master_id: &PlaylistId,
        rng: &mut R,
    ) -> CatalogResult<MasterResult> {
        let raw = collect_sources(self.catalog, sources)?;
        let candidates = resolve_candidates(self.catalog, &raw)?;
        info!(
            "Weighing {} candidates from {} source entries",
            candidates.len(),
            raw.len()
        );

        let escalation = self.artist_escalation(&candidates);
        let mut result = MasterResult::default();
        let mut selected = Vec::new();
        for track in candidates {
            let artist_overplay = track
                .artist_id
                .as_deref()
                .and_then(|artist_id| escalation.get(artist_id).copied());
            let decision = self.judge(track, artist_overplay, rng);
            log_decision(&decision);
            if decision.included() {
                selected.push(decision.track.id.clone());
            }
            result.decisions.push(decision);
        }

        let current = if self.config.split_the_deck {
            self.catalog.playlist_tracks(master_id)?
        } else {
            Vec::new()
        };

        result.track_ids = if current.is_empty() {
            if self.config.split_the_deck {
                info!("No current Master tracks found, shuffling normally");
            }
            selected.shuffle(rng);
            selected
        } else {
            result.retained = current.len() / 4;
            split_the_deck(selected, &current, rng)
        };

        self.catalog.replace_playlist(master_id, &result.track_ids)?;
        info!(
            "Updated '{}' with {} tracks",
            self.config.playlist_names.master,
            result.track_ids.len()
        );
        Ok(result)
    }
}

fn log_decision(decision: &TrackDecision) {
    let track = &decision.track;
    match &decision.verdict {
        Verdict::Blacklisted(entry) => {
            debug!("{} by {}: BLACKLISTED (matches '{entry}')", track.name, track.artist_name);
        }
        Verdict::Weighed { decision: weighed, artist_overplay } => {
            if let Some(count) = artist_overplay {
                debug!(
                    "{} by {}: artist has {count} songs in the too-much list",
                    track.name, track.artist_name
                );
            }
            if weighed.penalised() || !weighed.included {
                let status = if weighed.included { "included" } else { "excluded" };
                debug!(
                    "{} by {}: weight={}, {status}",
                    track.name, track.artist_name, weighed.weight
                );
            }
        }
    }
}
