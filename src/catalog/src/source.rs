//! External collaborator seams: role storage, client storage, and the
//! invalidation event stream.
//!
//! The cache is generic over these traits; storage backends and transports
//! live elsewhere. Collaborator failures are opaque `anyhow` errors: the
//! cache only decides whether to surface or retry them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::types::{ClientRecord, RoleRecord};

/// Source of role records.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// Returns every role in the catalog.
    async fn scan(&self) -> anyhow::Result<Vec<RoleRecord>>;

    /// Returns one role, or `None` if it does not exist.
    async fn load(&self, role_id: &str) -> anyhow::Result<Option<RoleRecord>>;
}

/// Source of client records.
#[async_trait]
pub trait ClientSource: Send + Sync {
    /// Returns every client in the catalog.
    async fn scan(&self) -> anyhow::Result<Vec<ClientRecord>>;

    /// Returns one client, or `None` if it does not exist.
    async fn load(&self, client_id: &str) -> anyhow::Result<Option<ClientRecord>>;

    /// Records that a client was seen in use. Best-effort; the cache
    /// reports failures on its error channel and moves on.
    async fn record_last_used(&self, client_id: &str, when: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Invalidation messages about single catalog entities.
///
/// Delivery is at-least-once and may be reordered; every message maps to an
/// idempotent single-entity reload, so duplicates and stale orderings are
/// harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "kebab-case")]
pub enum CatalogEvent {
    ClientCreated(String),
    ClientUpdated(String),
    ClientDeleted(String),
    RoleCreated(String),
    RoleUpdated(String),
    RoleDeleted(String),
}

impl CatalogEvent {
    /// The identifier the event is about.
    pub fn entity_id(&self) -> &str {
        match self {
            Self::ClientCreated(id)
            | Self::ClientUpdated(id)
            | Self::ClientDeleted(id)
            | Self::RoleCreated(id)
            | Self::RoleUpdated(id)
            | Self::RoleDeleted(id) => id,
        }
    }

    /// True for the client-side events.
    pub fn is_client_event(&self) -> bool {
        matches!(
            self,
            Self::ClientCreated(_) | Self::ClientUpdated(_) | Self::ClientDeleted(_)
        )
    }
}

/// Stream of invalidation events.
pub trait EventSource: Send + Sync {
    fn subscribe(&self) -> BoxStream<'static, CatalogEvent>;
}
