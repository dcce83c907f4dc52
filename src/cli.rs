//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `playlistrx` binary.
//!
//! ## Commands
//!
//! - `run`: Radio, then Master
//! - `radio` / `master`: one component only
//! - `import`: load a library snapshot into the local catalog
//! - `playlists` / `show`: inspect the local catalog
//!
//! ## Examples
//!
//! ```bash
//! playlistrx import library.json
//! playlistrx run --playlist "Liked Songs" --playlist "Road Trip"
//! playlistrx master --split-the-deck --seed 42
//! ```

use crate::config::CurateConfig;
use crate::model::TimeRange;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "playlistrx")]
#[command(about = "PlaylistRX: weighted Master and Radio playlists from your library")]
#[command(version)]
pub struct Args {
    /// Local catalog database
    ///
    /// Defaults to `playlistrx/library.db` under the platform data directory.
    #[arg(long, global = true, env = "PLAYLISTRX_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// JSON config file with curation options
    #[arg(
        long,
        global = true,
        env = "PLAYLISTRX_CONFIG",
        default_value = "config.json",
        value_hint = clap::ValueHint::FilePath
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild Radio, then Master
    ///
    /// Radio reads the current Master (and may append to it) before Master is
    /// reassembled from the configured sources.
    Run(CurateArgs),

    /// Rebuild Radio only
    Radio(CurateArgs),

    /// Rebuild Master only
    Master(CurateArgs),

    /// Load a JSON library snapshot into the local catalog
    ///
    /// Replaces everything previously imported, including playlists written by
    /// earlier runs.
    Import {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },

    /// List playlists in the local catalog
    Playlists,

    /// Print the tracks of a playlist
    Show {
        /// Exact playlist name
        name: String,
    },

    /// Generate shell completions
    ///
    /// Usage: playlistrx completion bash > ~/.local/share/bash-completion/completions/playlistrx
    Completion { shell: Shell },
}

/// Options shared by the curation commands.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct CurateArgs {
    /// Seed the random source for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Command-line overrides for config file options.
///
/// Anything left unset keeps the value from the config file.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct Overrides {
    /// Source playlist for Master (repeatable; "Liked Songs" means saved tracks)
    #[arg(long = "playlist", value_name = "NAME")]
    pub playlists: Vec<String>,

    /// How many artists to sample from Master for Radio
    #[arg(long, value_name = "N")]
    pub radio_artists: Option<usize>,

    /// Top-track slots per radio artist
    #[arg(long, value_name = "N")]
    pub radio_artist_songs: Option<usize>,

    /// How many slots per artist to overwrite with deep cuts
    #[arg(long, value_name = "N")]
    pub radio_artist_random_songs: Option<usize>,

    /// Scale every weight penalty
    #[arg(long, value_name = "FACTOR")]
    pub weight_modifier: Option<f64>,

    /// Drop radio candidates by weight
    #[arg(long)]
    pub remove_radio_songs_by_weight: bool,

    /// Append new radio tracks to Master
    #[arg(long)]
    pub include_radio_in_master: bool,

    /// Seed Radio with Discover Weekly
    #[arg(long)]
    pub include_discover_weekly: bool,

    /// Penalise artists that keep showing up in the "too much" list
    #[arg(long)]
    pub artist_i_hear_too_much: bool,

    /// Skip artists with 10+ songs in the "too much" list
    #[arg(long)]
    pub artist_blacklist: bool,

    /// Keep a quarter of the current Master
    #[arg(long)]
    pub split_the_deck: bool,

    /// How many top tracks to read
    #[arg(long, value_name = "N")]
    pub top_tracks_limit: Option<usize>,

    /// Top tracks window: short, medium or long
    #[arg(long, value_name = "RANGE")]
    pub time_range: Option<TimeRange>,
}

impl Overrides {
    /// Fold these overrides into `config`. Flags only ever switch features on.
    pub fn apply(&self, config: &mut CurateConfig) {
        if !self.playlists.is_empty() {
            config.playlists_to_include = Some(self.playlists.clone());
        }
        if let Some(n) = self.radio_artists {
            config.number_of_radio_artists = n;
        }
        if let Some(n) = self.radio_artist_songs {
            config.radio_artist_songs = n;
        }
        if let Some(n) = self.radio_artist_random_songs {
            config.radio_artist_random_songs = n;
        }
        if let Some(modifier) = self.weight_modifier {
            config.weight_modifier = modifier;
        }
        if let Some(n) = self.top_tracks_limit {
            config.top_tracks_limit = n;
        }
        if let Some(range) = self.time_range {
            config.top_tracks_time_range = range;
        }

        config.remove_radio_songs_by_weight |= self.remove_radio_songs_by_weight;
        config.include_radio_in_master |= self.include_radio_in_master;
        config.include_discover_weekly_in_radio |= self.include_discover_weekly;
        config.artist_i_hear_too_much |= self.artist_i_hear_too_much;
        config.artist_blacklist |= self.artist_blacklist;
        config.split_the_deck |= self.split_the_deck;
    }
}
