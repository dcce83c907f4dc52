//! Catalog service boundary.
//!
//! The curator never talks to a streaming service directly. It goes through
//! [`CatalogService`], which any backend can implement. Pagination, batching and
//! authentication belong to the backend; throttling is absorbed by wrapping a
//! backend in [`RetryingCatalog`].

use crate::error::CatalogError;
use crate::model::{AlbumTrack, ArtistId, PlaylistId, TimeRange, Track, TrackId};
use std::collections::HashMap;

pub mod retry;
pub mod sqlite;

pub use retry::{Backoff, RetryingCatalog, ThreadSleep};
pub use sqlite::{LibrarySnapshot, SqliteCatalog};

/// The literal source name that means the user's saved-tracks library.
pub const LIKED_SONGS: &str = "Liked Songs";

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Operations the curator needs from a music catalog.
///
/// Calls may block on I/O. Implementations report throttling as
/// [`CatalogError::RateLimited`]; callers that should never see it wrap the
/// implementation in [`RetryingCatalog`].
pub trait CatalogService {
    /// First playlist whose name matches exactly.
    fn find_playlist_id_by_name(&self, name: &str) -> CatalogResult<Option<PlaylistId>>;

    fn get_or_create_playlist(&self, name: &str, description: &str) -> CatalogResult<PlaylistId>;

    /// Track ids in playlist order. Duplicates are preserved.
    fn playlist_tracks(&self, id: &PlaylistId) -> CatalogResult<Vec<TrackId>>;

    fn liked_tracks(&self) -> CatalogResult<Vec<TrackId>>;

    /// The user's most played tracks, most played first. Rank is the position.
    fn top_tracks(&self, max_count: usize, range: TimeRange) -> CatalogResult<Vec<TrackId>>;

    /// Metadata for the ids the catalog knows. Unknown ids are left out.
    fn tracks_info(&self, ids: &[TrackId]) -> CatalogResult<HashMap<TrackId, Track>>;

    /// The service's ranking of an artist's most popular tracks.
    fn artist_top_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<Track>>;

    /// Tracks from the artist's albums and singles where the artist is primary.
    fn artist_album_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<AlbumTrack>>;

    fn clear_playlist(&self, id: &PlaylistId) -> CatalogResult<()>;

    /// Append `ids` in order.
    fn add_tracks_to_playlist(&self, id: &PlaylistId, ids: &[TrackId]) -> CatalogResult<()>;

    /// Clear then add. Not transactional: a failure after the clear leaves the
    /// playlist empty.
    fn replace_playlist(&self, id: &PlaylistId, ids: &[TrackId]) -> CatalogResult<()> {
        self.clear_playlist(id)?;
        if !ids.is_empty() {
            self.add_tracks_to_playlist(id, ids)?;
        }
        Ok(())
    }
}

impl<C: CatalogService + ?Sized> CatalogService for &C {
    fn find_playlist_id_by_name(&self, name: &str) -> CatalogResult<Option<PlaylistId>> {
        (**self).find_playlist_id_by_name(name)
    }

    fn get_or_create_playlist(&self, name: &str, description: &str) -> CatalogResult<PlaylistId> {
        (**self).get_or_create_playlist(name, description)
    }

    fn playlist_tracks(&self, id: &PlaylistId) -> CatalogResult<Vec<TrackId>> {
        (**self).playlist_tracks(id)
    }

    fn liked_tracks(&self) -> CatalogResult<Vec<TrackId>> {
        (**self).liked_tracks()
    }

    fn top_tracks(&self, max_count: usize, range: TimeRange) -> CatalogResult<Vec<TrackId>> {
        (**self).top_tracks(max_count, range)
    }

    fn tracks_info(&self, ids: &[TrackId]) -> CatalogResult<HashMap<TrackId, Track>> {
        (**self).tracks_info(ids)
    }

    fn artist_top_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<Track>> {
        (**self).artist_top_tracks(artist)
    }

    fn artist_album_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<AlbumTrack>> {
        (**self).artist_album_tracks(artist)
    }

    fn clear_playlist(&self, id: &PlaylistId) -> CatalogResult<()> {
        (**self).clear_playlist(id)
    }

    fn add_tracks_to_playlist(&self, id: &PlaylistId, ids: &[TrackId]) -> CatalogResult<()> {
        (**self).add_tracks_to_playlist(id, ids)
    }
}
