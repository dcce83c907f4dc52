//! Radio generator.
//!
//! Picks a handful of artists out of the current Master, builds a short mix for
//! each from the artist's top tracks with some slots swapped for popular deep
//! cuts, then rewrites the Radio playlist with the shuffled result.

use crate::catalog::{CatalogResult, CatalogService};
use crate::config::CurateConfig;
use crate::history::PlayHistory;
use crate::model::{AlbumTrack, Artist, PlaylistId, Track, TrackId};
use crate::weight::{compute_weight, should_include};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

pub const RADIO_DESCRIPTION: &str = "[RX] Radio generated by playlistrx";

/// What happened to one sampled artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistReport {
    pub artist: Artist,
    /// The blacklist entry that skipped this artist.
    pub blacklisted_by: Option<String>,
    pub mix: ArtistMix,
}

/// One artist's contribution to the radio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistMix {
    pub tracks: Vec<TrackId>,
    /// Slots filled from the artist's top tracks. Always `tracks.len()`.
    pub top_selected: usize,
    /// Slots later overwritten by a deep cut.
    pub replaced: usize,
    /// Candidates that failed the weight draw.
    pub rejected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadioResult {
    /// Radio contents in written order.
    pub track_ids: Vec<TrackId>,
    /// Tracks appended to Master; empty unless radio-in-master is on.
    pub appended_to_master: Vec<TrackId>,
    pub artists: Vec<ArtistReport>,
    /// Tracks dropped by the weight draw across all artists.
    pub filtered: usize,
}

/// Dedupe by id, sort by popularity (most popular first) and keep the top 75%
/// by count, rounded down.
#[must_use]
pub fn popular_cut(album_tracks: Vec<AlbumTrack>) -> Vec<AlbumTrack> {
    let mut seen = HashSet::new();
    let mut unique: Vec<AlbumTrack> = album_tracks
        .into_iter()
        .filter(|t| seen.insert(t.track.id.clone()))
        .collect();
    unique.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    unique.truncate(unique.len() * 3 / 4);
    unique
}

/// Build one artist's mix.
///
/// Up to `songs` tracks are taken from `top` in order, each one subject to
/// `keep`; a track that fails is skipped and the next one considered. Then
/// `pool` is shuffled and walked: every pool track not already chosen that
/// passes `keep` overwrites a uniformly random slot of the mix, at most
/// `random_songs` times. The mix never grows past the top-track selection.
pub fn mix_artist_tracks<R, F>(
    top: &[TrackId],
    mut pool: Vec<TrackId>,
    songs: usize,
    random_songs: usize,
    mut keep: F,
    rng: &mut R,
) -> ArtistMix
where
    R: Rng + ?Sized,
    F: FnMut(&TrackId, &mut R) -> bool,
{
    let mut rejected = 0;
    let mut selected: Vec<TrackId> = Vec::with_capacity(songs.min(top.len()));
    for id in top {
        if selected.len() >= songs {
            break;
        }
        if keep(id, rng) {
            selected.push(id.clone());
        } else {
            rejected += 1;
        }
    }

    let mut mix = selected.clone();
    let mut replaced = 0;
    if !mix.is_empty() {
        pool.shuffle(rng);
        for id in pool {
            if replaced >= random_songs {
                break;
            }
            if selected.contains(&id) {
                continue;
            }
            if !keep(&id, rng) {
                rejected += 1;
                continue;
            }
            let slot = rng.gen_range(0..mix.len());
            mix[slot] = id;
            replaced += 1;
        }
    }

    ArtistMix {
        top_selected: selected.len(),
        tracks: mix,
        replaced,
        rejected,
    }
}

/// Distinct primary artists of `ids`, in order of first appearance.
/// Tracks without an artist id are left out.
#[must_use]
pub fn group_artists(ids: &[TrackId], info: &HashMap<TrackId, Track>) -> Vec<Artist> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter_map(|id| info.get(id))
        .filter_map(|track| {
            let artist_id = track.artist_id.as_ref()?;
            seen.insert(artist_id.clone()).then(|| Artist {
                id: artist_id.clone(),
                name: track.artist_name.clone(),
            })
        })
        .collect()
}

pub struct RadioGenerator<'a, C: ?Sized> {
    catalog: &'a C,
    history: &'a PlayHistory,
    config: &'a CurateConfig,
}

impl<'a, C: CatalogService + ?Sized> RadioGenerator<'a, C> {
    pub fn new(catalog: &'a C, history: &'a PlayHistory, config: &'a CurateConfig) -> Self {
        Self {
            catalog,
            history,
            config,
        }
    }

    /// Rebuild the Radio playlist from artists currently in Master.
    ///
    /// # Behavior
    ///
    /// - With `includeDiscoverWeeklyInRadio`, the Discover Weekly playlist is
    ///   copied in first, unweighed. A missing playlist is skipped.
    /// - Up to `numberOfRadioArtists` distinct primary artists of Master are
    ///   sampled without replacement. Blacklisted ones are reported and skipped.
    /// - Each remaining artist contributes a [`mix_artist_tracks`] mix of its
    ///   top tracks and the [`popular_cut`] of its album tracks. With
    ///   `removeRadioSongsByWeight`, every candidate must pass a track-level
    ///   weight draw; artist escalation never applies here.
    /// - Radio is shuffled and replaced in one write, created first if needed.
    /// - With `includeRadioInMaster`, radio tracks not already in Master are
    ///   appended to it in shuffled order.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures. An artist with no top tracks or no album
    /// tracks simply contributes nothing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use playlistrx::catalog::{CatalogService, SqliteCatalog};
    /// use playlistrx::config::CurateConfig;
    /// use playlistrx::history::PlayHistory;
    /// use playlistrx::radio::RadioGenerator;
    /// use rand::rngs::StdRng;
    /// use rand::SeedableRng;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let catalog = SqliteCatalog::open(std::path::Path::new("library.db"))?;
    /// let config = CurateConfig::default();
    /// let master_id = catalog.get_or_create_playlist("[RX] Master", "")?;
    /// let radio = RadioGenerator::new(&catalog, &PlayHistory::default(), &config)
    ///     .generate(&master_id, &mut StdRng::seed_from_u64(1))?;
    /// for report in &radio.artists {
    ///     println!("{}: {} tracks", report.artist.name, report.mix.tracks.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn generate<R: Rng + ?Sized>(
        &self,
        master_id: &PlaylistId,
        rng: &mut R,
    ) -> CatalogResult<RadioResult> {
        info!("Generating radio...");
        let names = &self.config.playlist_names;
        let mut result = RadioResult::default();

        if self.config.include_discover_weekly_in_radio {
            if let Some(discover_id) = self.catalog.find_playlist_id_by_name(&names.discover_weekly)? {
                let discover = self.catalog.playlist_tracks(&discover_id)?;
                info!("Including {} tracks from {}", discover.len(), names.discover_weekly);
                result.track_ids.extend(discover);
            }
        }

        let master_ids = self.catalog.playlist_tracks(master_id)?;
        let distinct: Vec<TrackId> = {
            let mut seen = HashSet::new();
            master_ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
        };
        let master_info = self.catalog.tracks_info(&distinct)?;
        let artists = group_artists(&master_ids, &master_info);

        let wanted = self.config.number_of_radio_artists;
        let chosen: Vec<Artist> = artists.choose_multiple(rng, wanted).cloned().collect();
        info!(
            "Chosen artists for radio ({} of {}): {:?}",
            chosen.len(),
            artists.len(),
            chosen.iter().map(|a| a.name.as_str()).collect::<Vec<_>>()
        );

        let by_weight = self.config.remove_radio_songs_by_weight;
        let modifier = self.config.weight_modifier;
        let history = self.history;
        let mut keep = move |id: &TrackId, rng: &mut R| {
            if !by_weight {
                return true;
            }
            let signal = history.signal(id);
            should_include(compute_weight(signal.overplay_count, signal.top_rank, modifier), rng)
        };

        for artist in chosen {
            let blacklisted_by = if self.config.artist_blacklist {
                self.history.blacklist().matching(&artist.name).map(str::to_string)
            } else {
                None
            };
            if blacklisted_by.is_some() {
                info!("  Skipping blacklisted artist: {}", artist.name);
                result.artists.push(ArtistReport {
                    artist,
                    blacklisted_by,
                    mix: ArtistMix::default(),
                });
                continue;
            }

            let top: Vec<TrackId> = self
                .catalog
                .artist_top_tracks(&artist.id)?
                .into_iter()
                .map(|t| t.id)
                .collect();
            let deep_cuts: Vec<TrackId> = popular_cut(self.catalog.artist_album_tracks(&artist.id)?)
                .into_iter()
                .map(|t| t.track.id)
                .collect();
            debug!(
                "  {}: {} top tracks, {} tracks in top 75%",
                artist.name,
                top.len(),
                deep_cuts.len()
            );

            let mix = mix_artist_tracks(
                &top,
                deep_cuts,
                self.config.radio_artist_songs,
                self.config.radio_artist_random_songs,
                &mut keep,
                rng,
            );
            info!(
                "  {}: {} top tracks, {} replaced with random tracks",
                artist.name, mix.top_selected, mix.replaced
            );
            result.filtered += mix.rejected;
            result.track_ids.extend(mix.tracks.iter().cloned());
            result.artists.push(ArtistReport {
                artist,
                blacklisted_by: None,
                mix,
            });
        }
        info!("Filtered out {} songs based on weight", result.filtered);

        let radio_id = self
            .catalog
            .get_or_create_playlist(&names.radio, RADIO_DESCRIPTION)?;
        result.track_ids.shuffle(rng);
        self.catalog.replace_playlist(&radio_id, &result.track_ids)?;
        info!("Updated '{}' with {} tracks", names.radio, result.track_ids.len());

        if self.config.include_radio_in_master {
            let mut present: HashSet<&TrackId> = master_ids.iter().collect();
            let mut to_add: Vec<TrackId> = result
                .track_ids
                .iter()
                .filter(|id| present.insert(*id))
                .cloned()
                .collect();
            if !to_add.is_empty() {
                to_add.shuffle(rng);
                self.catalog.add_tracks_to_playlist(master_id, &to_add)?;
            }
            info!("Appended {} radio tracks into '{}'", to_add.len(), names.master);
            result.appended_to_master = to_add;
        }

        Ok(result)
    }
}
