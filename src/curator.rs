//! Run orchestration.
//!
//! A full run makes sure the Master and Too Much playlists exist, reads the
//! listening history once, then runs the Radio Generator followed by the
//! Master Assembler. Radio goes first because it reads (and may append to)
//! the Master that the assembler is about to overwrite.

use crate::catalog::{CatalogResult, CatalogService};
use crate::config::CurateConfig;
use crate::error::CurateError;
use crate::history::PlayHistory;
use crate::master::{MasterAssembler, MasterResult};
use crate::model::PlaylistId;
use crate::radio::{RadioGenerator, RadioResult};
use log::info;
use rand::Rng;

pub const MASTER_DESCRIPTION: &str = "[RX] Master generated by playlistrx";
pub const TOO_MUCH_DESCRIPTION: &str = "Tracks added here are played less often by playlistrx";

/// Which components a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    RadioOnly,
    MasterOnly,
}

impl RunMode {
    fn radio(self) -> bool {
        matches!(self, Self::Full | Self::RadioOnly)
    }

    fn master(self) -> bool {
        matches!(self, Self::Full | Self::MasterOnly)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurateReport {
    pub master_id: PlaylistId,
    pub radio: Option<RadioResult>,
    pub master: Option<MasterResult>,
}

pub struct Curator<'a, C: ?Sized> {
    catalog: &'a C,
    config: &'a CurateConfig,
}

impl<'a, C: CatalogService + ?Sized> Curator<'a, C> {
    pub fn new(catalog: &'a C, config: &'a CurateConfig) -> Self {
        Self { catalog, config }
    }

    /// Radio then Master.
    ///
    /// # Errors
    ///
    /// See [`Curator::execute`].
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CurateReport, CurateError> {
        self.execute(RunMode::Full, rng)
    }

    pub fn radio_only<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CurateReport, CurateError> {
        self.execute(RunMode::RadioOnly, rng)
    }

    pub fn master_only<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CurateReport, CurateError> {
        self.execute(RunMode::MasterOnly, rng)
    }

    /// # Errors
    ///
    /// [`crate::error::ConfigError::MissingPlaylists`] before touching the catalog when
    /// Master is to be assembled without a source list, otherwise any
    /// catalog failure.
    pub fn execute<R: Rng + ?Sized>(
        &self,
        mode: RunMode,
        rng: &mut R,
    ) -> Result<CurateReport, CurateError> {
        let sources = if mode.master() {
            Some(self.config.source_playlists()?)
        } else {
            None
        };

        let names = &self.config.playlist_names;
        let master_id = self
            .catalog
            .get_or_create_playlist(&names.master, MASTER_DESCRIPTION)?;
        let history = self.gather_history()?;

        let radio = if mode.radio() {
            Some(RadioGenerator::new(self.catalog, &history, self.config).generate(&master_id, rng)?)
        } else {
            None
        };

        let master = match sources {
            Some(sources) => Some(
                MasterAssembler::new(self.catalog, &history, self.config)
                    .assemble(sources, &master_id, rng)?,
            ),
            None => None,
        };

        Ok(CurateReport {
            master_id,
            radio,
            master,
        })
    }

    fn gather_history(&self) -> CatalogResult<PlayHistory> {
        let names = &self.config.playlist_names;
        let too_much_id = self
            .catalog
            .get_or_create_playlist(&names.too_much, TOO_MUCH_DESCRIPTION)?;
        info!("Reading listening history ('{}')", names.too_much);
        PlayHistory::gather(self.catalog, &too_much_id, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LibrarySnapshot, SqliteCatalog};
    use crate::error::ConfigError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn library() -> SqliteCatalog {
        let snapshot: LibrarySnapshot = serde_json::from_str(
            r#"{
                "artists": [
                    { "id": "a1", "name": "Alpha" },
                    { "id": "a2", "name": "Bravo" }
                ],
                "albums": [
                    { "id": "al1", "name": "First", "artistId": "a1" },
                    { "id": "al2", "name": "Second", "artistId": "a2" }
                ],
                "tracks": [
                    { "id": "t1", "name": "One", "artistId": "a1", "albumId": "al1", "popularity": 80 },
                    { "id": "t2", "name": "Two", "artistId": "a1", "albumId": "al1", "popularity": 60 },
                    { "id": "t3", "name": "Three", "artistId": "a2", "albumId": "al2", "popularity": 70 },
                    { "id": "t4", "name": "Four", "artistId": "a2", "albumId": "al2", "popularity": 50 }
                ],
                "playlists": [
                    { "id": "m", "name": "[RX] Master", "tracks": ["t1", "t3"] },
                    { "id": "road", "name": "Road Trip", "tracks": ["t2", "t4"] }
                ],
                "liked": ["t1", "t3"],
                "artistTopTracks": { "a1": ["t1", "t2"], "a2": ["t3", "t4"] }
            }"#,
        )
        .unwrap();
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.import(&snapshot).unwrap();
        catalog
    }

    fn sources(names: &[&str]) -> CurateConfig {
        CurateConfig {
            playlists_to_include: Some(names.iter().map(|s| s.to_string()).collect()),
            ..CurateConfig::default()
        }
    }

    #[test]
    fn test_master_requires_source_list() {
        let catalog = library();
        let config = CurateConfig::default();
        let mut rng = StdRng::seed_from_u64(0);

        let err = Curator::new(&catalog, &config).run(&mut rng).unwrap_err();
        assert!(matches!(err, CurateError::Config(ConfigError::MissingPlaylists)));
        // nothing was created
        assert!(catalog.find_playlist_id_by_name("[RX] Songs I Hear Too Much").unwrap().is_none());
    }

    #[test]
    fn test_radio_only_does_not_need_sources() {
        let catalog = library();
        let config = CurateConfig::default();
        let mut rng = StdRng::seed_from_u64(0);

        let report = Curator::new(&catalog, &config).radio_only(&mut rng).unwrap();
        assert!(report.master.is_none());
        let radio = report.radio.unwrap();
        assert_eq!(radio.artists.len(), 2);

        let radio_id = catalog.find_playlist_id_by_name("[RX] Radio").unwrap().unwrap();
        let mut written = catalog.playlist_tracks(&radio_id).unwrap();
        written.sort();
        let mut expected = radio.track_ids.clone();
        expected.sort();
        assert_eq!(written, expected);
        // Master untouched
        assert_eq!(catalog.playlist_tracks(&"m".to_string()).unwrap(), vec!["t1", "t3"]);
    }

    #[test]
    fn test_full_run_creates_playlists_and_rewrites_master() {
        let catalog = library();
        let config = sources(&["Liked Songs", "Road Trip"]);
        let mut rng = StdRng::seed_from_u64(3);

        let report = Curator::new(&catalog, &config).run(&mut rng).unwrap();
        assert_eq!(report.master_id, "m");
        assert!(report.radio.is_some());
        assert!(catalog.find_playlist_id_by_name("[RX] Songs I Hear Too Much").unwrap().is_some());

        let mut master = catalog.playlist_tracks(&report.master_id).unwrap();
        master.sort();
        assert_eq!(master, vec!["t1", "t2", "t3", "t4"]);
    }

    #[test]
    fn test_master_only_with_custom_names() {
        let catalog = library();
        let mut config = sources(&["Road Trip"]);
        config.playlist_names.master = "Fresh".to_string();
        let mut rng = StdRng::seed_from_u64(3);

        let report = Curator::new(&catalog, &config).master_only(&mut rng).unwrap();
        assert!(report.radio.is_none());
        assert!(report.master_id.starts_with("local:"));

        let mut fresh = catalog.playlist_tracks(&report.master_id).unwrap();
        fresh.sort();
        assert_eq!(fresh, vec!["t2", "t4"]);
    }
}
