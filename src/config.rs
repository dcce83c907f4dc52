//! # Configuration Module
//!
//! Run options for the curator and the platform data directory holding the
//! local catalog database.
//!
//! Options are read from a JSON file (camelCase keys) and may be overridden on
//! the command line. A missing file is not an error: every option has a
//! default, except `playlistsToInclude`, which must come from somewhere before
//! the Master playlist can be assembled.
//!
//! ```json
//! {
//!   "playlistsToInclude": ["Liked Songs", "Road Trip"],
//!   "weightModifier": 1.5,
//!   "numberOfRadioArtists": 5,
//!   "removeRadioSongsByWeight": true,
//!   "splitTheDeck": true
//! }
//! ```

use crate::error::ConfigError;
use crate::model::TimeRange;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Playlist names the curator reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaylistNames {
    pub master: String,
    pub radio: String,
    pub too_much: String,
    pub discover_weekly: String,
}

impl Default for PlaylistNames {
    fn default() -> Self {
        Self {
            master: "[RX] Master".to_string(),
            radio: "[RX] Radio".to_string(),
            too_much: "[RX] Songs I Hear Too Much".to_string(),
            discover_weekly: "Discover Weekly".to_string(),
        }
    }
}

/// Everything a curation run can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurateConfig {
    pub number_of_radio_artists: usize,
    /// Top-track slots per radio artist.
    pub radio_artist_songs: usize,
    /// Deep cuts that may replace top-track slots, per radio artist.
    pub radio_artist_random_songs: usize,
    pub remove_radio_songs_by_weight: bool,
    pub include_radio_in_master: bool,
    pub include_discover_weekly_in_radio: bool,
    pub weight_modifier: f64,
    /// Source playlists for Master. `"Liked Songs"` means the saved-tracks library.
    pub playlists_to_include: Option<Vec<String>>,
    #[serde(rename = "artistIHearTooMuch")]
    pub artist_i_hear_too_much: bool,
    pub artist_blacklist: bool,
    pub split_the_deck: bool,
    pub top_tracks_limit: usize,
    pub top_tracks_time_range: TimeRange,
    pub playlist_names: PlaylistNames,
}

impl Default for CurateConfig {
    fn default() -> Self {
        Self {
            number_of_radio_artists: 5,
            radio_artist_songs: 10,
            radio_artist_random_songs: 5,
            remove_radio_songs_by_weight: false,
            include_radio_in_master: false,
            include_discover_weekly_in_radio: false,
            weight_modifier: 1.0,
            playlists_to_include: None,
            artist_i_hear_too_much: false,
            artist_blacklist: false,
            split_the_deck: false,
            top_tracks_limit: 200,
            top_tracks_time_range: TimeRange::MediumTerm,
            playlist_names: PlaylistNames::default(),
        }
    }
}

impl CurateConfig {
    /// Load options from `path`, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] for unreadable files and
    /// [`ConfigError::Parse`] for malformed JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Whether either artist-level feature needs per-artist aggregates.
    #[must_use]
    pub fn wants_artist_aggregates(&self) -> bool {
        self.artist_i_hear_too_much || self.artist_blacklist
    }

    /// Source playlists for Master.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingPlaylists`] when neither the file nor the command
    /// line supplied a list. An empty list is fine.
    pub fn source_playlists(&self) -> Result<&[String], ConfigError> {
        self.playlists_to_include
            .as_deref()
            .ok_or(ConfigError::MissingPlaylists)
    }
}

/// Returns the platform-appropriate data directory for PlaylistRX, creating it
/// when missing.
///
/// - **Linux**: `~/.local/share/playlistrx/`
/// - **macOS**: `~/Library/Application Support/playlistrx/`
/// - **Windows**: `%APPDATA%\playlistrx\`
///
/// # Errors
///
/// Fails when the system data directory cannot be determined or the
/// subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Pass --db to choose a catalog location."
        )
    })?;

    let rx_dir = data_dir.join("playlistrx");
    fs::create_dir_all(&rx_dir).with_context(|| {
        format!(
            "Failed to create PlaylistRX data directory at {}. Please check file permissions.",
            rx_dir.display()
        )
    })?;

    Ok(rx_dir)
}

/// Default location of the local catalog database.
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("library.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = CurateConfig::default();
        assert_eq!(config.number_of_radio_artists, 5);
        assert_eq!(config.radio_artist_songs, 10);
        assert_eq!(config.radio_artist_random_songs, 5);
        assert_eq!(config.weight_modifier, 1.0);
        assert_eq!(config.top_tracks_limit, 200);
        assert_eq!(config.top_tracks_time_range, TimeRange::MediumTerm);
        assert!(!config.split_the_deck);
        assert!(config.playlists_to_include.is_none());
    }

    #[test]
    fn test_camel_case_keys_parse() {
        let json = r#"{
            "numberOfRadioArtists": 3,
            "radioArtistSongs": 4,
            "radioArtistRandomSongs": 2,
            "removeRadioSongsByWeight": true,
            "includeRadioInMaster": true,
            "includeDiscoverWeeklyInRadio": true,
            "weightModifier": 1.5,
            "playlistsToInclude": ["Liked Songs", "Gym"],
            "artistIHearTooMuch": true,
            "artistBlacklist": true,
            "splitTheDeck": true,
            "topTracksTimeRange": "short_term",
            "playlistNames": { "master": "Mix" }
        }"#;
        let config: CurateConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.number_of_radio_artists, 3);
        assert_eq!(config.radio_artist_songs, 4);
        assert_eq!(config.radio_artist_random_songs, 2);
        assert!(config.remove_radio_songs_by_weight);
        assert!(config.include_radio_in_master);
        assert!(config.include_discover_weekly_in_radio);
        assert_eq!(config.weight_modifier, 1.5);
        assert_eq!(
            config.playlists_to_include,
            Some(vec!["Liked Songs".to_string(), "Gym".to_string()])
        );
        assert!(config.artist_i_hear_too_much);
        assert!(config.artist_blacklist);
        assert!(config.split_the_deck);
        assert_eq!(config.top_tracks_time_range, TimeRange::ShortTerm);
        assert_eq!(config.playlist_names.master, "Mix");
        assert_eq!(config.playlist_names.radio, "[RX] Radio");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CurateConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, CurateConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = CurateConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_source_playlists_required_but_may_be_empty() {
        let mut config = CurateConfig::default();
        assert!(matches!(
            config.source_playlists(),
            Err(ConfigError::MissingPlaylists)
        ));

        config.playlists_to_include = Some(Vec::new());
        assert!(config.source_playlists().unwrap().is_empty());
    }

    #[test]
    fn test_artist_aggregates_wanted_by_either_flag() {
        let mut config = CurateConfig::default();
        assert!(!config.wants_artist_aggregates());
        config.artist_blacklist = true;
        assert!(config.wants_artist_aggregates());
        config.artist_blacklist = false;
        config.artist_i_hear_too_much = true;
        assert!(config.wants_artist_aggregates());
    }
}
