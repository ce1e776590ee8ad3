//! # GridAuth catalog cache
//!
//! Holds the current client and role snapshots for the GridAuth
//! authentication service, keeps them fresh, and answers the two hot-path
//! questions against them: `resolve` (what does this set of scopes grant?)
//! and `load_client` (who is this caller?).
//!
//! Reads are lock-free against an immutable published snapshot; rebuilds
//! are serialized through a single worker fed by three producers: a
//! periodic timer, the invalidation event stream, and direct reload calls.
//! Storage backends and transports stay behind the [`source`] traits.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gridauth_catalog::{CatalogCache, CatalogConfig};
//! # use gridauth_catalog::source::{ClientSource, EventSource, RoleSource};
//! # async fn example(
//! #     clients: Arc<dyn ClientSource>,
//! #     roles: Arc<dyn RoleSource>,
//! #     events: Arc<dyn EventSource>,
//! # ) -> anyhow::Result<()> {
//! let (cache, mut handle) =
//!     CatalogCache::setup(clients, roles, events, CatalogConfig::default()).await?;
//!
//! let granted = cache.resolve(&["assume:deploy-prod".to_string()]);
//! println!("caller may exercise: {:?}", granted.as_slice());
//!
//! let client = cache.load_client("worker-7").await?;
//! if !client.expanded_scopes.satisfies_scope("queue:claim-work:prod/builder") {
//!     println!("worker-7 may not claim production work");
//! }
//!
//! if let Some(failure) = handle.errors.recv().await {
//!     eprintln!("background failure: {failure}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use cache::{CacheHandle, CacheStats, CachedClient, CatalogCache};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use source::{CatalogEvent, ClientSource, EventSource, RoleSource};
pub use types::{ClientRecord, RoleRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
