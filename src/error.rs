//! Error taxonomy.
//!
//! Catalog failures split into throttling, which the retry decorator absorbs,
//! and everything else, which ends the run. Configuration problems are fatal at
//! startup. The binary wraps both in `anyhow` with context.

use std::time::Duration;
use thiserror::Error;

/// Backoff hint used when SQLite reports the database as busy or locked.
pub const BUSY_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The service asked us to slow down. Never escapes [`crate::catalog::RetryingCatalog`].
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("catalog service error: {0}")]
    Service(String),

    #[error("catalog database error: {0}")]
    Database(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                Self::RateLimited { retry_after: BUSY_RETRY_AFTER }
            }
            _ => Self::Database(err),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Service(format!("malformed library data: {err}"))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`playlistsToInclude` is not set; add it to the config file or pass --playlist")]
    MissingPlaylists,

    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that can end a curation run.
#[derive(Debug, Error)]
pub enum CurateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
