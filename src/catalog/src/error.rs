//! Error types for the catalog cache.

use thiserror::Error;

/// Catalog cache errors.
///
/// Lookup failures are returned to the caller; reload and last-used-update
/// failures are reported on the cache's error channel and are never fatal,
/// the previously published snapshot staying authoritative.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No client with the given id in the current snapshot.
    #[error("client not found: {0}")]
    ClientNotFound(String),

    /// The client exists but has been disabled.
    #[error("client is disabled: {0}")]
    ClientDisabled(String),

    /// The client's credentials have expired.
    #[error("client credentials expired: {0}")]
    ClientExpired(String),

    /// Rejected configuration; fatal at setup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An upstream scan or load failed during a reload.
    #[error("catalog reload failed")]
    ReloadFailed(#[source] anyhow::Error),

    /// The best-effort last-used timestamp write failed.
    #[error("failed to record last use of client {client_id}")]
    LastUsedUpdateFailed {
        client_id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
