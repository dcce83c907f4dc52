//! Retry-on-throttle decorator.
//!
//! Every call through [`RetryingCatalog`] that comes back
//! [`CatalogError::RateLimited`] is retried after the hinted delay, with no
//! upper bound on attempts. Any other error passes straight through.

use super::{CatalogResult, CatalogService};
use crate::error::CatalogError;
use crate::model::{AlbumTrack, ArtistId, PlaylistId, TimeRange, Track, TrackId};
use log::warn;
use std::collections::HashMap;
use std::time::Duration;

/// How the decorator waits out a throttle.
pub trait Backoff {
    fn wait(&self, delay: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Backoff for ThreadSleep {
    fn wait(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Run `op` until it returns anything other than `RateLimited`.
pub fn retry_rate_limited<T, B, F>(backoff: &B, mut op: F) -> CatalogResult<T>
where
    B: Backoff + ?Sized,
    F: FnMut() -> CatalogResult<T>,
{
    loop {
        match op() {
            Err(CatalogError::RateLimited { retry_after }) => {
                warn!("Rate limited. Sleeping {}s", retry_after.as_secs_f64());
                backoff.wait(retry_after);
            }
            other => return other,
        }
    }
}

/// Wraps a catalog so callers never observe throttling.
#[derive(Debug)]
pub struct RetryingCatalog<C, B = ThreadSleep> {
    inner: C,
    backoff: B,
}

impl<C: CatalogService> RetryingCatalog<C, ThreadSleep> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            backoff: ThreadSleep,
        }
    }
}

impl<C: CatalogService, B: Backoff> RetryingCatalog<C, B> {
    pub fn with_backoff(inner: C, backoff: B) -> Self {
        Self { inner, backoff }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: CatalogService, B: Backoff> CatalogService for RetryingCatalog<C, B> {
    fn find_playlist_id_by_name(&self, name: &str) -> CatalogResult<Option<PlaylistId>> {
        retry_rate_limited(&self.backoff, || self.inner.find_playlist_id_by_name(name))
    }

    fn get_or_create_playlist(&self, name: &str, description: &str) -> CatalogResult<PlaylistId> {
        retry_rate_limited(&self.backoff, || {
            self.inner.get_or_create_playlist(name, description)
        })
    }

    fn playlist_tracks(&self, id: &PlaylistId) -> CatalogResult<Vec<TrackId>> {
        retry_rate_limited(&self.backoff, || self.inner.playlist_tracks(id))
    }

    fn liked_tracks(&self) -> CatalogResult<Vec<TrackId>> {
        retry_rate_limited(&self.backoff, || self.inner.liked_tracks())
    }

    fn top_tracks(&self, max_count: usize, range: TimeRange) -> CatalogResult<Vec<TrackId>> {
        retry_rate_limited(&self.backoff, || self.inner.top_tracks(max_count, range))
    }

    fn tracks_info(&self, ids: &[TrackId]) -> CatalogResult<HashMap<TrackId, Track>> {
        retry_rate_limited(&self.backoff, || self.inner.tracks_info(ids))
    }

    fn artist_top_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<Track>> {
        retry_rate_limited(&self.backoff, || self.inner.artist_top_tracks(artist))
    }

    fn artist_album_tracks(&self, artist: &ArtistId) -> CatalogResult<Vec<AlbumTrack>> {
        retry_rate_limited(&self.backoff, || self.inner.artist_album_tracks(artist))
    }

    fn clear_playlist(&self, id: &PlaylistId) -> CatalogResult<()> {
        retry_rate_limited(&self.backoff, || self.inner.clear_playlist(id))
    }

    fn add_tracks_to_playlist(&self, id: &PlaylistId, ids: &[TrackId]) -> CatalogResult<()> {
        retry_rate_limited(&self.backoff, || self.inner.add_tracks_to_playlist(id, ids))
    }
}
