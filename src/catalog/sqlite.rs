//! Local catalog backed by SQLite.
//!
//! Holds a copy of a user's library (artists, albums, tracks, playlists, liked
//! tracks, top tracks) so the curator can run offline. The library is loaded
//! from a JSON [`LibrarySnapshot`] with [`SqliteCatalog::import`]; playlist
//! writes from a run land in the same database.

use super::{CatalogResult, CatalogService};
use crate::model::{AlbumTrack, ArtistId, PlaylistId, TimeRange, Track, TrackId, UNKNOWN_ARTIST};
use log::{debug, info, trace};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS artists (
        id      TEXT PRIMARY KEY,
        name    TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS albums (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        artist_id   TEXT NOT NULL,
        kind        TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS tracks (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        artist_id   TEXT,
        album_id    TEXT,
        popularity  INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS playlists (
        seq         INTEGER PRIMARY KEY AUTOINCREMENT,
        id          TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS playlist_tracks (
        playlist_id TEXT NOT NULL,
        position    INTEGER NOT NULL,
        track_id    TEXT NOT NULL,
        PRIMARY KEY (playlist_id, position)
    );
    CREATE TABLE IF NOT EXISTS liked_tracks (
        position    INTEGER PRIMARY KEY,
        track_id    TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS top_tracks (
        time_range  TEXT NOT NULL,
        position    INTEGER NOT NULL,
        track_id    TEXT NOT NULL,
        PRIMARY KEY (time_range, position)
    );
    CREATE TABLE IF NOT EXISTS artist_top_tracks (
        artist_id   TEXT NOT NULL,
        position    INTEGER NOT NULL,
        track_id    TEXT NOT NULL,
        PRIMARY KEY (artist_id, position)
    );
    CREATE INDEX IF NOT EXISTS idx_tracks_album ON tracks(album_id);
    CREATE INDEX IF NOT EXISTS idx_albums_artist ON albums(artist_id);
    CREATE INDEX IF NOT EXISTS idx_playlists_name ON playlists(name);
";

const TRACK_COLUMNS: &str = "t.id, t.name, t.artist_id, ar.name";

/// Album kinds that count as an artist's own releases.
const RELEASE_KINDS: [&str; 2] = ["album", "single"];

/// A JSON export of a user's library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LibrarySnapshot {
    pub artists: Vec<SnapshotArtist>,
    pub albums: Vec<SnapshotAlbum>,
    pub tracks: Vec<SnapshotTrack>,
    pub playlists: Vec<SnapshotPlaylist>,
    pub liked: Vec<TrackId>,
    pub top_tracks: TopTracks,
    /// Service-ranked top tracks per artist id.
    pub artist_top_tracks: HashMap<ArtistId, Vec<TrackId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotArtist {
    pub id: ArtistId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAlbum {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub artist_id: ArtistId,
    /// `album`, `single`, `compilation`, ...
    #[serde(default = "default_album_kind")]
    pub kind: String,
}

fn default_album_kind() -> String {
    "album".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTrack {
    pub id: TrackId,
    pub name: String,
    #[serde(default)]
    pub artist_id: Option<ArtistId>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub popularity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPlaylist {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<PlaylistId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tracks: Vec<TrackId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopTracks {
    pub short_term: Vec<TrackId>,
    pub medium_term: Vec<TrackId>,
    pub long_term: Vec<TrackId>,
}

impl TopTracks {
    fn by_range(&self) -> [(TimeRange, &[TrackId]); 3] {
        [
            (TimeRange::ShortTerm, &self.short_term),
            (TimeRange::MediumTerm, &self.medium_term),
            (TimeRange::LongTerm, &self.long_term),
        ]
    }
}

/// One row of [`SqliteCatalog::list_playlists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: PlaylistId,
    pub name: String,
    pub description: String,
    pub length: usize,
}

/// [`CatalogService`] over a SQLite database.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open (or create) the catalog at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or the schema cannot be created.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        debug!("Opening catalog database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// A throwaway catalog, mostly for tests and benchmarks.
    ///
    /// # Errors
    ///
    /// Fails when SQLite cannot allocate the database.
    pub fn open_in_memory() -> CatalogResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> CatalogResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Replace the whole library with `snapshot`, in one transaction.
    ///
    /// # Errors
    ///
    /// Any SQL failure rolls the import back.
    pub fn import(&mut self, snapshot: &LibrarySnapshot) -> CatalogResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM artists;
             DELETE FROM albums;
             DELETE FROM tracks;
             DELETE FROM playlists;
             DELETE FROM playlist_tracks;
             DELETE FROM liked_tracks;
             DELETE FROM top_tracks;
             DELETE FROM artist_top_tracks;",
        )?;

        {
            let mut stmt = tx.prepare("INSERT OR REPLACE INTO artists (id, name) VALUES (?1, ?2)")?;
            for artist in &snapshot.artists {
                stmt.execute(params![artist.id, artist.name])?;
            }

            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO albums (id, name, artist_id, kind) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for album in &snapshot.albums {
                stmt.execute(params![album.id, album.name, album.artist_id, album.kind])?;
            }

            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO tracks (id, name, artist_id, album_id, popularity)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for track in &snapshot.tracks {
                stmt.execute(params![
                    track.id,
                    track.name,
                    track.artist_id,
                    track.album_id,
                    track.popularity
                ])?;
            }

            for playlist in &snapshot.playlists {
                let id = match &playlist.id {
                    Some(id) => id.clone(),
                    None => next_playlist_id(&tx)?,
                };
                tx.execute(
                    "INSERT INTO playlists (id, name, description) VALUES (?1, ?2, ?3)",
                    params![id, playlist.name, playlist.description],
                )?;
                insert_positions(
                    &tx,
                    "INSERT INTO playlist_tracks (playlist_id, position, track_id) VALUES (?1, ?2, ?3)",
                    &id,
                    &playlist.tracks,
                )?;
            }

            let mut stmt =
                tx.prepare("INSERT INTO liked_tracks (position, track_id) VALUES (?1, ?2)")?;
            for (position, track_id) in snapshot.liked.iter().enumerate() {
                stmt.execute(params![position as i64, track_id])?;
            }

            for (range, ids) in snapshot.top_tracks.by_range() {
                insert_positions(
                    &tx,
                    "INSERT INTO top_tracks (time_range, position, track_id) VALUES (?1, ?2, ?3)",
                    range.as_str(),
                    ids,
                )?;
            }

            for (artist_id, ids) in &snapshot.artist_top_tracks {
                insert_positions(
                    &tx,
                    "INSERT INTO artist_top_tracks (artist_id, position, track_id) VALUES (?1, ?2, ?3)",
                    artist_id,
                    ids,
                )?;
            }
        }

        tx.commit()?;
        info!(
            "Imported {} artists, {} albums, {} tracks, {} playlists",
            snapshot.artists.len(),
            snapshot.albums.len(),
            snapshot.tracks.len(),
            snapshot.playlists.len()
        );
        Ok(())
    }

    /// All playlists in creation order.
    ///
    /// # Errors
    ///
    /// SQL failures.
    pub fn list_playlists(&self) -> CatalogResult<Vec<PlaylistSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.description, COUNT(pt.track_id)
             FROM playlists p
             LEFT JOIN playlist_tracks pt ON pt.playlist_id = p.id
             GROUP BY p.seq
             ORDER BY p.seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PlaylistSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                length: row.get::<_, i64>(3)? as usize,
            })
        })?;

        let mut summaries = Vec::new();
        for summary in rows {
            summaries.push(summary?);
        }
        Ok(summaries)
    }

    /// Playlist contents with metadata, in order. Ids the library does not know
    /// come back with the id as the name.
    ///
    /// # Errors
    ///
    /// SQL failures.
    pub fn playlist_listing(&self, id: &PlaylistId) -> CatalogResult<Vec<Track>> {
        let mut stmt = self.conn.prepare(
            "SELECT pt.track_id, t.name, t.artist_id, ar.name
             FROM playlist_tracks pt
             LEFT JOIN tracks t ON t.id = pt.track_id
             LEFT JOIN artists ar ON ar.id = t.artist_id
             WHERE pt.playlist_id = ?1
             ORDER BY pt.position",
        )?;
        let rows = stmt.query_map([id], |row| {
            let track_id: String = row.get(0)?;
            let name: Option<String> = row.get(1)?;
            Ok(Track {
                name: name.unwrap_or_else(|| track_id.clone()),
                id: track_id,
                artist_id: row.get(2)?,
                artist_name: row
                    .get::<_, Option<String>>(3)?
                    .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            })
        })?;

        let mut tracks = Vec::new();
        for track in rows {
            tracks.push(track?);
        }
        Ok(tracks)
    }

    fn ordered_ids(&self, sql: &str, key: &str) -> CatalogResult<Vec<TrackId>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map([key], |row| row.get(0))?;

        let mut ids = Vec::new();
        for id in rows {
            ids.push(id?);
        }
        Ok(ids)
    }
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        name: row.get(1)?,
        artist_id: row.get(2)?,
        artist_name: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
    })
}

fn next_playlist_id(conn: &Connection) -> rusqlite::Result<PlaylistId> {
    let next: i64 = conn.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM playlists", [], |row| {
        row.get(0)
    })?;
    Ok(format!("local:{next}"))
}

/// Insert `ids` under `key` with 0-based positions.
fn insert_positions(conn: &Connection, sql: &str, key: &str, ids: &[TrackId]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(sql)?;
    for (position, track_id) in ids.iter().enumerate() {
        stmt.execute(params![key, position as i64, track_id])?;
    }
    Ok(())
}

impl CatalogService for SqliteCatalog {
    fn find_playlist_id_by_name(&self, name: &str) -> CatalogResult<Option<PlaylistId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM playlists WHERE name = ?1 ORDER BY seq LIMIT 1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn get_or_create_playlist(&self, name: &str, description: &str) -> CatalogResult<PlaylistId> {
        if let Some(id) = self.find_playlist_id_by_name(name)? {
            return Ok(id);
        }

        let id = next_playlist_id(&self.conn)?;
        self.conn.execute(
            "INSERT INTO playlists (id, name, description) VALUES (?1, ?2, ?3)",
            params![id, name, description],
        )?;
        info!("Created playlist '{name}' ({id})");
        Ok(id)
    }

    fn playlist_tracks(&self, id: &PlaylistId) -> CatalogResult<Vec<TrackId>> {
        self.ordered_ids(
            "SELECT track_id FROM playlist_tracks WHERE playlist_id = ?1 ORDER BY position",
            id,
        )
    }

    fn liked_tracks(&self) -> CatalogResult<Vec<TrackId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT track_id FROM liked_tracks ORDER BY position")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut ids = Vec::new();
        for id in rows {
            ids.push(id?);
        }
        Ok(ids)
    }

    fn top_tracks(&self, max_count: usize, range: TimeRange) -> CatalogResult<Vec<TrackId>> {
        let mut ids = self.ordered_ids(
            "SELECT track_id FROM top_tracks WHERE time_range = ?1 ORDER BY position",
            range.as_str(),
        )?;
        ids.truncate(max_count);
        Ok(ids)
    }

    fn tracks_info(&self, ids: &[TrackId]) -> CatalogResult<HashMap<TrackId, Track>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {TRACK_COLUMNS}
             FROM tracks t
             LEFT JOIN artists ar ON ar.id = t.artist_id
             WHERE t.id = ?1"
        ))?;

        let mut info = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(track) = stmt.query_row([id], track_from_row).optional()? {
                info.insert(track.id.clone(), track);
            } else {
                trace!("Track {id} not in catalog");
            }
        }
        Ok(info)
    }

    fn artist_top_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<Track>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {TRACK_COLUMNS}
             FROM artist_top_tracks att
             JOIN tracks t ON t.id = att.track_id
             LEFT JOIN artists ar ON ar.id = t.artist_id
             WHERE att.artist_id = ?1
             ORDER BY att.position"
        ))?;
        let rows = stmt.query_map([artist], track_from_row)?;

        let mut tracks = Vec::new();
        for track in rows {
            tracks.push(track?);
        }
        Ok(tracks)
    }

    fn artist_album_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<AlbumTrack>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {TRACK_COLUMNS}, t.popularity
             FROM tracks t
             JOIN albums al ON al.id = t.album_id
             LEFT JOIN artists ar ON ar.id = t.artist_id
             WHERE al.artist_id = ?1
               AND al.kind IN (?2, ?3)
               AND t.artist_id = ?1
             ORDER BY al.id, t.id"
        ))?;
        let rows = stmt.query_map(params![artist, RELEASE_KINDS[0], RELEASE_KINDS[1]], |row| {
            Ok(AlbumTrack {
                track: track_from_row(row)?,
                popularity: row.get(4)?,
            })
        })?;

        let mut tracks = Vec::new();
        for track in rows {
            tracks.push(track?);
        }
        Ok(tracks)
    }

    fn clear_playlist(&self, id: &PlaylistId) -> CatalogResult<()> {
        self.conn
            .execute("DELETE FROM playlist_tracks WHERE playlist_id = ?1", [id])?;
        Ok(())
    }

    fn add_tracks_to_playlist(&self, id: &PlaylistId, ids: &[TrackId]) -> CatalogResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let start: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_tracks WHERE playlist_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO playlist_tracks (playlist_id, position, track_id) VALUES (?1, ?2, ?3)",
            )?;
            for (offset, track_id) in ids.iter().enumerate() {
                stmt.execute(params![id, start + offset as i64, track_id])?;
            }
        }
        tx.commit()?;
        debug!("Added {} tracks to playlist {id}", ids.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> SqliteCatalog {
        let snapshot: LibrarySnapshot = serde_json::from_str(
            r#"{
                "artists": [
                    { "id": "a1", "name": "Alpha" },
                    { "id": "a2", "name": "Beta" }
                ],
                "albums": [
                    { "id": "al1", "name": "First", "artistId": "a1", "kind": "album" },
                    { "id": "al2", "name": "Hits", "artistId": "a1", "kind": "compilation" },
                    { "id": "al3", "name": "Split", "artistId": "a1", "kind": "single" }
                ],
                "tracks": [
                    { "id": "t1", "name": "One", "artistId": "a1", "albumId": "al1", "popularity": 40 },
                    { "id": "t2", "name": "Two", "artistId": "a1", "albumId": "al1", "popularity": 90 },
                    { "id": "t3", "name": "Three", "artistId": "a1", "albumId": "al2", "popularity": 70 },
                    { "id": "t4", "name": "Four", "artistId": "a2", "albumId": "al3", "popularity": 10 },
                    { "id": "t5", "name": "Five", "artistId": "a1", "albumId": "al3", "popularity": 55 },
                    { "id": "t6", "name": "Loose" }
                ],
                "playlists": [
                    { "id": "p1", "name": "Gym", "tracks": ["t1", "t2", "t1"] },
                    { "name": "Gym", "tracks": ["t4"] }
                ],
                "liked": ["t5", "t2"],
                "topTracks": { "medium_term": ["t2", "t1", "t5"], "short_term": ["t4"] },
                "artistTopTracks": { "a1": ["t2", "t5", "t1"] }
            }"#,
        )
        .unwrap();
        let mut catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.import(&snapshot).unwrap();
        catalog
    }

    #[test]
    fn test_find_playlist_returns_first_exact_match() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.find_playlist_id_by_name("Gym").unwrap(),
            Some("p1".to_string())
        );
        assert_eq!(catalog.find_playlist_id_by_name("gym").unwrap(), None);
    }

    #[test]
    fn test_playlist_tracks_keep_order_and_duplicates() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.playlist_tracks(&"p1".to_string()).unwrap(),
            vec!["t1", "t2", "t1"]
        );
    }

    #[test]
    fn test_get_or_create_reuses_existing() {
        let catalog = sample_catalog();
        let created = catalog.get_or_create_playlist("[RX] Master", "curated").unwrap();
        assert!(created.starts_with("local:"));
        let again = catalog.get_or_create_playlist("[RX] Master", "curated").unwrap();
        assert_eq!(created, again);
    }

    #[test]
    fn test_top_tracks_by_range_and_limit() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.top_tracks(200, TimeRange::MediumTerm).unwrap(),
            vec!["t2", "t1", "t5"]
        );
        assert_eq!(catalog.top_tracks(2, TimeRange::MediumTerm).unwrap(), vec!["t2", "t1"]);
        assert!(catalog.top_tracks(200, TimeRange::LongTerm).unwrap().is_empty());
    }

    #[test]
    fn test_tracks_info_skips_unknown_ids() {
        let catalog = sample_catalog();
        let info = catalog
            .tracks_info(&["t1".to_string(), "t6".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(info.len(), 2);
        assert_eq!(info["t1"].artist_name, "Alpha");
        assert_eq!(info["t6"].artist_id, None);
        assert_eq!(info["t6"].artist_name, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_artist_album_tracks_only_own_releases() {
        let catalog = sample_catalog();
        let mut ids: Vec<_> = catalog
            .artist_album_tracks(&"a1".to_string())
            .unwrap()
            .into_iter()
            .map(|t| (t.track.id, t.popularity))
            .collect();
        ids.sort();
        // t3 sits on a compilation, t4 belongs to another artist
        assert_eq!(
            ids,
            vec![
                ("t1".to_string(), 40),
                ("t2".to_string(), 90),
                ("t5".to_string(), 55)
            ]
        );
    }

    #[test]
    fn test_artist_top_tracks_in_rank_order() {
        let catalog = sample_catalog();
        let ids: Vec<_> = catalog
            .artist_top_tracks(&"a1".to_string())
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t2", "t5", "t1"]);
        assert!(catalog.artist_top_tracks(&"a2".to_string()).unwrap().is_empty());
    }

    #[test]
    fn test_clear_then_add_rewrites_playlist() {
        let catalog = sample_catalog();
        let p1 = "p1".to_string();
        catalog.clear_playlist(&p1).unwrap();
        assert!(catalog.playlist_tracks(&p1).unwrap().is_empty());

        catalog.add_tracks_to_playlist(&p1, &["t5".to_string()]).unwrap();
        catalog
            .add_tracks_to_playlist(&p1, &["t4".to_string(), "t5".to_string()])
            .unwrap();
        assert_eq!(catalog.playlist_tracks(&p1).unwrap(), vec!["t5", "t4", "t5"]);

        catalog.replace_playlist(&p1, &[]).unwrap();
        assert!(catalog.playlist_tracks(&p1).unwrap().is_empty());
    }

    #[test]
    fn test_listing_and_summaries() {
        let catalog = sample_catalog();
        let summaries = catalog.list_playlists().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].length, 3);
        assert_eq!(summaries[1].length, 1);
        assert!(summaries[1].id.starts_with("local:"));

        let listing = catalog.playlist_listing(&"p1".to_string()).unwrap();
        assert_eq!(listing[1].name, "Two");
        assert_eq!(listing[1].artist_name, "Alpha");
    }

    #[test]
    fn test_import_replaces_previous_library() {
        let mut catalog = sample_catalog();
        catalog.import(&LibrarySnapshot::default()).unwrap();
        assert!(catalog.liked_tracks().unwrap().is_empty());
        assert!(catalog.list_playlists().unwrap().is_empty());
    }
}
