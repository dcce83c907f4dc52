//! PlaylistRX: weighted playlist curation.
//!
//! Rebuilds two playlists from a user's library each run. **Master** pools
//! configured source playlists and keeps each track with a probability
//! derived from listening history. **Radio** samples artists out of Master
//! and mixes their top tracks with popular deep cuts.
//!
//! Core modules:
//! - [`weight`] - Weight engine: history signals to an inclusion weight
//! - [`radio`] - Radio generator
//! - [`master`] - Master assembler and the split-the-deck policy
//! - [`curator`] - Run orchestration (Radio, then Master)
//! - [`history`] - Top-track ranks, "too much" counts, artist aggregates, blacklist
//! - [`catalog`] - Catalog service trait, retry decorator, SQLite backend
//!
//! ### Supporting Modules
//!
//! - [`model`] - Tracks, artists and id aliases
//! - [`config`] - Curation options and data directory management
//! - [`error`] - Error types
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use playlistrx::catalog::{RetryingCatalog, SqliteCatalog};
//! use playlistrx::config::{self, CurateConfig};
//! use playlistrx::curator::Curator;
//! use rand::SeedableRng;
//!
//! let catalog = RetryingCatalog::new(SqliteCatalog::open(&config::get_db_path()?)?);
//! let config = CurateConfig {
//!     playlists_to_include: Some(vec!["Liked Songs".to_string()]),
//!     ..CurateConfig::default()
//! };
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//!
//! let report = Curator::new(&catalog, &config).run(&mut rng)?;
//! if let Some(master) = &report.master {
//!     println!("Master now holds {} tracks", master.track_ids.len());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Weighting
//!
//! A track starts at 10. Sitting in the "too much" playlist once, twice, or
//! three or more times costs 5, 7 or 9; ranking in the top 50, 100 or 200
//! costs 5, 4 or 3. With `artistIHearTooMuch` on, Master also charges 2 or 3
//! when the artist has 3 or 6 occurrences in the "too much" list. Every
//! penalty is scaled by `weightModifier` and the result is clamped to
//! `[0, 10]`.
//!
//! ## Error Handling
//!
//! Library operations return typed errors ([`error::CatalogError`],
//! [`error::ConfigError`]); throttling is absorbed by
//! [`catalog::RetryingCatalog`]. The binary wraps everything in
//! `anyhow::Result`.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod curator;
pub mod error;
pub mod history;
pub mod master;
pub mod model;
pub mod radio;
pub mod weight;
