//! Plain records shared by the weight engine, the catalog and both playlist builders.
//!
//! Everything here is read fresh from the catalog on each run; nothing is cached
//! between runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TrackId = String;
pub type ArtistId = String;
pub type PlaylistId = String;

/// Display name used when a track carries no artist at all.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// A track as the curator sees it. Identity is `id`.
///
/// Only the primary (first credited) artist is kept; collaborations beyond the
/// first artist are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub artist_id: Option<ArtistId>,
    pub artist_name: String,
}

impl Track {
    /// `"<name> - <artist>"`, the key the Master assembler deduplicates on.
    #[must_use]
    pub fn display_key(&self) -> String {
        format!("{} - {}", self.name, self.artist_name)
    }
}

/// A track pulled from one of an artist's albums or singles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumTrack {
    pub track: Track,
    /// Service popularity score, higher is more popular.
    pub popularity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
}

/// Time window the service computes a user's top tracks over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "short_term")]
    ShortTerm,
    #[default]
    #[serde(rename = "medium_term")]
    MediumTerm,
    #[serde(rename = "long_term")]
    LongTerm,
}

impl TimeRange {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::MediumTerm => "medium_term",
            Self::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" | "short" => Ok(Self::ShortTerm),
            "medium_term" | "medium" => Ok(Self::MediumTerm),
            "long_term" | "long" => Ok(Self::LongTerm),
            other => Err(format!(
                "unknown time range `{other}` (expected short_term, medium_term or long_term)"
            )),
        }
    }
}

/// Listening-history signals for one track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayHistorySignal {
    /// Occurrences in the "too much" playlist, duplicates included.
    pub overplay_count: u32,
    /// 0-based position within the user's top tracks, smaller = more played.
    pub top_rank: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_key_joins_name_and_artist() {
        let track = Track {
            id: "t1".to_string(),
            name: "Halo".to_string(),
            artist_id: Some("a1".to_string()),
            artist_name: "Beyoncé".to_string(),
        };
        assert_eq!(track.display_key(), "Halo - Beyoncé");
    }

    #[test]
    fn test_time_range_parses_both_spellings() {
        assert_eq!("medium_term".parse::<TimeRange>(), Ok(TimeRange::MediumTerm));
        assert_eq!("short".parse::<TimeRange>(), Ok(TimeRange::ShortTerm));
        assert!("forever".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::LongTerm.to_string(), "long_term");
    }

    #[test]
    fn test_time_range_serde_names() {
        let json = serde_json::to_string(&TimeRange::ShortTerm).unwrap();
        assert_eq!(json, "\"short_term\"");
        let parsed: TimeRange = serde_json::from_str("\"long_term\"").unwrap();
        assert_eq!(parsed, TimeRange::LongTerm);
    }
}
