//! The catalog cache: current client and role snapshots, scope resolution
//! against them, and serialized rebuilds.
//!
//! Snapshots are immutable; every rebuild constructs a fresh snapshot and
//! publishes it with a single [`ArcSwap`] store, so `resolve` and
//! `load_client` never block a reload and always observe either the pre- or
//! post-swap state whole. All rebuilds (periodic, event-driven, and direct)
//! funnel through one worker task and execute strictly in order; a failed
//! rebuild leaves the previous snapshot authoritative.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use gridauth_scopes::{Role, ScopeResolver, ScopeSet};

use crate::config::{parse_negative_duration, CatalogConfig};
use crate::error::{CatalogError, Result};
use crate::source::{CatalogEvent, ClientSource, EventSource, RoleSource};
use crate::types::{ClientRecord, RoleRecord};

/// A client record as published in a snapshot, with its scopes expanded.
#[derive(Debug)]
pub struct CachedClient {
    pub client_id: String,
    pub access_token: String,
    pub expires: DateTime<Utc>,
    pub disabled: bool,
    /// Scopes as declared on the client.
    pub scopes: Vec<String>,
    /// Declared scopes plus the client's `client-id:` role identity,
    /// expanded through the resolver.
    pub expanded_scopes: ScopeSet,
    pub last_date_used: DateTime<Utc>,
    pub description: Option<String>,
    /// Set at snapshot build when `last_date_used` has lagged past the
    /// configured window; cleared by the lookup that fires the refresh.
    update_last_used: AtomicBool,
}

struct Snapshot {
    role_records: Vec<RoleRecord>,
    client_records: Vec<ClientRecord>,
    resolver: ScopeResolver,
    clients: HashMap<String, Arc<CachedClient>>,
}

impl Snapshot {
    /// Compiles a snapshot from raw catalog records. CPU-only.
    fn build(
        role_records: Vec<RoleRecord>,
        client_records: Vec<ClientRecord>,
        max_last_used_delay: chrono::Duration,
    ) -> Snapshot {
        let roles: Vec<Role> = role_records
            .iter()
            .map(|record| Role::new(record.role_id.clone(), record.scopes.clone()))
            .collect();
        let resolver = ScopeResolver::new(&roles);

        // max_last_used_delay is negative: anything last used before this
        // instant gets refreshed on its next lookup.
        let refresh_before = Utc::now() + max_last_used_delay;
        let clients = client_records
            .iter()
            .map(|record| {
                let mut held = record.scopes.clone();
                held.push(record.identity_scope());
                let cached = CachedClient {
                    client_id: record.client_id.clone(),
                    access_token: record.access_token.clone(),
                    expires: record.expires,
                    disabled: record.disabled,
                    scopes: record.scopes.clone(),
                    expanded_scopes: resolver.resolve(&held),
                    last_date_used: record.last_date_used,
                    description: record.description.clone(),
                    update_last_used: AtomicBool::new(record.last_date_used < refresh_before),
                };
                (record.client_id.clone(), Arc::new(cached))
            })
            .collect();

        Snapshot {
            role_records,
            client_records,
            resolver,
            clients,
        }
    }
}

#[derive(Debug, Clone)]
enum ReloadKind {
    Full,
    Client(String),
    Role(String),
}

fn reload_kind(event: &CatalogEvent) -> ReloadKind {
    if event.is_client_event() {
        ReloadKind::Client(event.entity_id().to_string())
    } else {
        ReloadKind::Role(event.entity_id().to_string())
    }
}

struct ReloadRequest {
    kind: ReloadKind,
    /// Present for direct callers, who receive the outcome themselves;
    /// queue-driven rebuilds report failures on the error channel instead.
    done: Option<oneshot::Sender<Result<()>>>,
}

#[derive(Default)]
struct Counters {
    reloads: AtomicU64,
    reload_failures: AtomicU64,
    last_reload_ms: AtomicI64,
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub roles: usize,
    pub clients: usize,
    pub reloads: u64,
    pub reload_failures: u64,
    pub last_reload: Option<DateTime<Utc>>,
}

/// Owner of the background tasks started by [`CatalogCache::setup`], and of
/// the error channel on which reload and last-used-update failures arrive.
///
/// Dropping the handle stops the periodic and event-driven producers; an
/// in-flight rebuild runs to completion.
pub struct CacheHandle {
    pub errors: mpsc::UnboundedReceiver<CatalogError>,
    tasks: Vec<JoinHandle<()>>,
}

impl CacheHandle {
    /// Stops the background producers. Equivalent to dropping the handle,
    /// spelled out for call sites that want the teardown visible.
    pub fn shutdown(self) {}
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// The catalog cache.
pub struct CatalogCache {
    snapshot: ArcSwap<Snapshot>,
    role_source: Arc<dyn RoleSource>,
    client_source: Arc<dyn ClientSource>,
    max_last_used_delay: chrono::Duration,
    reload_tx: mpsc::UnboundedSender<ReloadRequest>,
    errors: mpsc::UnboundedSender<CatalogError>,
    counters: Counters,
}

impl CatalogCache {
    /// Performs the initial population, then starts the reload worker, the
    /// periodic reload timer, and the event consumer.
    ///
    /// Fails with [`CatalogError::InvalidConfig`] on a bad configuration
    /// and with [`CatalogError::ReloadFailed`] if the initial scans fail;
    /// unlike later reloads, there is no previous snapshot to fall back to.
    pub async fn setup(
        client_source: Arc<dyn ClientSource>,
        role_source: Arc<dyn RoleSource>,
        event_source: Arc<dyn EventSource>,
        config: CatalogConfig,
    ) -> Result<(Arc<CatalogCache>, CacheHandle)> {
        let max_last_used_delay = parse_negative_duration(&config.max_last_used_delay)?;

        let (role_records, client_records) =
            tokio::try_join!(role_source.scan(), client_source.scan())
                .map_err(CatalogError::ReloadFailed)?;
        let snapshot = Snapshot::build(role_records, client_records, max_last_used_delay);
        info!(
            roles = snapshot.role_records.len(),
            clients = snapshot.client_records.len(),
            "catalog cache primed"
        );

        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let cache = Arc::new(CatalogCache {
            snapshot: ArcSwap::from_pointee(snapshot),
            role_source,
            client_source,
            max_last_used_delay,
            reload_tx: reload_tx.clone(),
            errors: errors_tx,
            counters: Counters::default(),
        });
        cache.counters.reloads.store(1, Ordering::Relaxed);
        cache
            .counters
            .last_reload_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);

        // The worker holds only a weak reference: once every external
        // handle to the cache is gone it stops draining the queue.
        tokio::spawn(run_worker(Arc::downgrade(&cache), reload_rx));

        let mut tasks = Vec::new();
        if !config.cache_expiry.is_zero() {
            let timer_tx = reload_tx.clone();
            let expiry = config.cache_expiry;
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(expiry);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // the first tick fires immediately; setup already populated
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let request = ReloadRequest {
                        kind: ReloadKind::Full,
                        done: None,
                    };
                    if timer_tx.send(request).is_err() {
                        break;
                    }
                }
            }));
        }

        let mut events = event_source.subscribe();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                debug!(?event, "catalog invalidation event");
                let request = ReloadRequest {
                    kind: reload_kind(&event),
                    done: None,
                };
                if reload_tx.send(request).is_err() {
                    break;
                }
            }
        }));

        let handle = CacheHandle {
            errors: errors_rx,
            tasks,
        };
        Ok((cache, handle))
    }

    /// Expands a set of held scopes against the current snapshot. Pure and
    /// infallible; never blocks a reload.
    pub fn resolve(&self, scopes: &[String]) -> ScopeSet {
        self.snapshot.load().resolver.resolve(scopes)
    }

    /// Looks up a client in the current snapshot.
    ///
    /// When the client's last-used timestamp has lagged past the configured
    /// window, the first lookup fires a best-effort asynchronous refresh
    /// against the client source; a failure there lands on the error
    /// channel, never here.
    pub async fn load_client(&self, client_id: &str) -> Result<Arc<CachedClient>> {
        let snapshot = self.snapshot.load();
        let client = snapshot
            .clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| CatalogError::ClientNotFound(client_id.to_string()))?;
        if client.disabled {
            return Err(CatalogError::ClientDisabled(client_id.to_string()));
        }
        if client.expires < Utc::now() {
            return Err(CatalogError::ClientExpired(client_id.to_string()));
        }

        if client.update_last_used.swap(false, Ordering::AcqRel) {
            let source = Arc::clone(&self.client_source);
            let errors = self.errors.clone();
            let id = client.client_id.clone();
            tokio::spawn(async move {
                if let Err(err) = source.record_last_used(&id, Utc::now()).await {
                    warn!(client_id = %id, "failed to record client last use");
                    let _ = errors.send(CatalogError::LastUsedUpdateFailed {
                        client_id: id,
                        source: err,
                    });
                }
            });
        }
        Ok(client)
    }

    /// Rescans both sources and publishes a fresh snapshot. Serialized with
    /// every other rebuild; on failure the previous snapshot stays.
    pub async fn reload(&self) -> Result<()> {
        self.request(ReloadKind::Full).await
    }

    /// Reloads one client and rebuilds the snapshot. A client the source no
    /// longer knows is removed.
    pub async fn reload_client(&self, client_id: &str) -> Result<()> {
        self.request(ReloadKind::Client(client_id.to_string())).await
    }

    /// Reloads one role and rebuilds the snapshot. A role the source no
    /// longer knows is removed.
    pub async fn reload_role(&self, role_id: &str) -> Result<()> {
        self.request(ReloadKind::Role(role_id.to_string())).await
    }

    /// The closed scope set of one role in the current snapshot.
    pub fn expanded_role_scopes(&self, role_id: &str) -> Option<ScopeSet> {
        self.snapshot.load().resolver.expanded_scopes(role_id).cloned()
    }

    pub fn stats(&self) -> CacheStats {
        let snapshot = self.snapshot.load();
        let last_ms = self.counters.last_reload_ms.load(Ordering::Relaxed);
        CacheStats {
            roles: snapshot.role_records.len(),
            clients: snapshot.client_records.len(),
            reloads: self.counters.reloads.load(Ordering::Relaxed),
            reload_failures: self.counters.reload_failures.load(Ordering::Relaxed),
            last_reload: DateTime::from_timestamp_millis(last_ms).filter(|_| last_ms != 0),
        }
    }

    async fn request(&self, kind: ReloadKind) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        let request = ReloadRequest {
            kind,
            done: Some(done_tx),
        };
        self.reload_tx
            .send(request)
            .map_err(|_| CatalogError::ReloadFailed(anyhow::anyhow!("reload worker stopped")))?;
        done_rx
            .await
            .map_err(|_| CatalogError::ReloadFailed(anyhow::anyhow!("reload worker went away")))?
    }

    async fn perform(&self, kind: &ReloadKind) -> Result<()> {
        match kind {
            ReloadKind::Full => {
                let (role_records, client_records) =
                    tokio::try_join!(self.role_source.scan(), self.client_source.scan())
                        .map_err(CatalogError::ReloadFailed)?;
                self.publish(Snapshot::build(
                    role_records,
                    client_records,
                    self.max_last_used_delay,
                ));
            }
            ReloadKind::Client(client_id) => {
                let loaded = self
                    .client_source
                    .load(client_id)
                    .await
                    .map_err(CatalogError::ReloadFailed)?;
                let current = self.snapshot.load_full();
                let mut client_records = current.client_records.clone();
                client_records.retain(|client| &client.client_id != client_id);
                client_records.extend(loaded);
                self.publish(Snapshot::build(
                    current.role_records.clone(),
                    client_records,
                    self.max_last_used_delay,
                ));
            }
            ReloadKind::Role(role_id) => {
                let loaded = self
                    .role_source
                    .load(role_id)
                    .await
                    .map_err(CatalogError::ReloadFailed)?;
                let current = self.snapshot.load_full();
                let mut role_records = current.role_records.clone();
                role_records.retain(|role| &role.role_id != role_id);
                role_records.extend(loaded);
                self.publish(Snapshot::build(
                    role_records,
                    current.client_records.clone(),
                    self.max_last_used_delay,
                ));
            }
        }
        Ok(())
    }

    fn publish(&self, snapshot: Snapshot) {
        let roles = snapshot.role_records.len();
        let clients = snapshot.client_records.len();
        self.snapshot.store(Arc::new(snapshot));
        self.counters.reloads.fetch_add(1, Ordering::Relaxed);
        self.counters
            .last_reload_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        debug!(roles, clients, "catalog snapshot published");
    }
}

/// Drains the reload queue one request at a time; this loop is the whole
/// serialization story. A failure answers its caller (or the error channel)
/// and the next request proceeds regardless.
async fn run_worker(cache: Weak<CatalogCache>, mut requests: mpsc::UnboundedReceiver<ReloadRequest>) {
    while let Some(request) = requests.recv().await {
        let Some(cache) = cache.upgrade() else { break };
        let result = cache.perform(&request.kind).await;
        if result.is_err() {
            cache.counters.reload_failures.fetch_add(1, Ordering::Relaxed);
            warn!(kind = ?request.kind, "catalog reload failed");
        }
        match request.done {
            Some(done) => {
                let _ = done.send(result);
            }
            None => {
                if let Err(err) = result {
                    let _ = cache.errors.send(err);
                }
            }
        }
    }
}
