//! Desko public API facade (in-process).
//!
//! This crate defines the stable traits and types frontends (CLI/GUI) depend on.
//! Implementations can be in-process (direct) or remote (RPC) in later milestones.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub use desko_ops::{BulkOutcome, DeskOps, RestOps, SaveOutcome}; // Re-export imperative ops
pub use desko_persist::{SavedPayload, SessionRecord}; // Re-export persisted rows
pub use desko_resthub::Session; // Re-export connection identity
pub use desko_schema::{form_for, FieldKind, FieldSpec, FormSpec}; // Re-export form schema

use desko_core::columns::{builtin_status_for, known_entities, label_for};
use desko_core::table::StatusWidget;
use desko_core::{RowDelta, RowId, RowSnapshot};
use desko_persist::{SqliteStore, Store};
use desko_resthub::{HubError, RestHub};
use desko_search::SearchDebugInfo;

/// A served catalog entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityKind {
    pub slug: String,
    pub label: String,
    pub widget: StatusWidget,
}

/// The static catalog as served kinds.
pub fn builtin_entities() -> Vec<EntityKind> {
    known_entities()
        .iter()
        .map(|e| {
            let (_, widget) = builtin_status_for(e);
            EntityKind {
                slug: (*e).to_string(),
                label: label_for(e).to_string(),
                widget,
            }
        })
        .collect()
}

/// Stats and runtime configuration exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Stats {
    pub relist_secs: u64,
    pub http_timeout_secs: u64,
    pub page_size: usize,
    pub results_soft_cap: Option<usize>,
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseMeta {
    pub partial: bool,
    pub dropped: u64,
    pub took_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SnapshotResponse {
    pub data: RowSnapshot,
    pub meta: ResponseMeta,
}

/// A ranked hit resolved against the snapshot it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: RowId,
    pub name: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub debug: SearchDebugInfo,
    pub meta: ResponseMeta,
}

/// API errors suitable for transport over RPC later.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum DeskoError {
    #[error("auth: {0}")]
    Auth(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("internal: {0}")]
    Internal(String),
}

pub type DeskoResult<T> = Result<T, DeskoError>;

impl From<HubError> for DeskoError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::Auth { message, .. } => DeskoError::Auth(message),
            HubError::NotFound { message } => DeskoError::NotFound(message),
            HubError::Conflict { message } => DeskoError::Conflict(message),
            HubError::Validation { message } => DeskoError::Validation(message),
            HubError::Http { status, message } => DeskoError::Http { status, message },
            HubError::Envelope(detail) => DeskoError::Internal(detail),
            HubError::Network(e) => DeskoError::Internal(e.to_string()),
            HubError::BadUrl { url, detail } => DeskoError::Validation(format!("{url}: {detail}")),
        }
    }
}

/// Declarative Desko API surface.
#[async_trait::async_trait]
pub trait DeskoApi: Send + Sync {
    /// The catalog of entities this backend serves.
    async fn discover(&self) -> DeskoResult<Vec<EntityKind>>;

    /// One consistent snapshot of an entity's rows.
    async fn snapshot(&self, entity: &str) -> DeskoResult<SnapshotResponse>;

    /// Ranked lookup scoped to one entity. `key=value` tokens in the query
    /// narrow by equality; the rest is fuzzy free text.
    async fn search(&self, entity: &str, query: &str, limit: usize) -> DeskoResult<SearchResponse>;

    /// Raw normalized record for one row.
    async fn get_raw(&self, entity: &str, id: RowId) -> DeskoResult<Value>;

    /// Stream row deltas: an initial burst of Applied, then changes.
    async fn watch(&self, entity: &str) -> DeskoResult<StreamHandle<RowDelta>>;

    /// Recently accepted payloads for one record, newest first.
    async fn saved_payloads(
        &self,
        entity: &str,
        id: RowId,
        limit: Option<usize>,
    ) -> DeskoResult<Vec<SavedPayload>>;

    /// Runtime stats and limits.
    async fn stats(&self) -> DeskoResult<Stats>;

    /// Access to the imperative ops provider.
    fn ops(&self) -> Arc<dyn DeskOps>;
}

fn validate_entity(entity: &str) -> DeskoResult<()> {
    if known_entities().iter().any(|e| *e == entity) {
        Ok(())
    } else {
        Err(DeskoError::NotFound(format!("unknown entity: {entity}")))
    }
}

// ----------------- Streaming primitives -----------------

/// Cancellation handle that aborts the underlying task.
pub struct CancelHandle {
    task: Option<tokio::task::JoinHandle<()>>,
}

impl CancelHandle {
    pub fn cancel(mut self) {
        if let Some(h) = self.task.take() {
            h.abort();
        }
    }
}

/// Generic stream handle used by API streaming endpoints.
pub struct StreamHandle<T> {
    pub rx: tokio::sync::mpsc::Receiver<T>,
    pub cancel: CancelHandle,
}

// ----------------- In-process implementation -----------------

/// In-process implementation calling internal crates directly against one
/// backend session.
pub struct InProcApi {
    hub: RestHub,
}

impl InProcApi {
    pub fn new(hub: RestHub) -> Self {
        Self { hub }
    }

    pub fn connect(session: Session) -> DeskoResult<Self> {
        Ok(Self {
            hub: RestHub::new(session)?,
        })
    }
}

#[async_trait::async_trait]
impl DeskoApi for InProcApi {
    async fn discover(&self) -> DeskoResult<Vec<EntityKind>> {
        Ok(builtin_entities())
    }

    async fn snapshot(&self, entity: &str) -> DeskoResult<SnapshotResponse> {
        validate_entity(entity)?;
        let t0 = Instant::now();
        let items = self.hub.list_rows(entity).await?;
        let took_ms = t0.elapsed().as_millis() as u64;
        info!(entity = %entity, items = items.len(), took_ms, "api: snapshot ok");
        Ok(SnapshotResponse {
            data: RowSnapshot { epoch: 1, items },
            meta: ResponseMeta {
                partial: false,
                dropped: 0,
                took_ms,
            },
        })
    }

    async fn search(&self, entity: &str, query: &str, limit: usize) -> DeskoResult<SearchResponse> {
        let t0 = Instant::now();
        let snap_resp = self.snapshot(entity).await?;
        let index = desko_search::Index::build_from_snapshot(&snap_resp.data);
        let (raw_hits, debug) = index.search_with_opts(query, limit, Default::default());
        let hits: Vec<SearchHit> = raw_hits
            .iter()
            .map(|h| SearchHit {
                id: index.id_of(h),
                name: snap_resp.data.items[h.doc as usize].name.clone(),
                score: h.score,
            })
            .collect();
        let took_ms = t0.elapsed().as_millis() as u64;
        info!(entity = %entity, query = %query, hits = hits.len(), took_ms, "api: search ok");
        Ok(SearchResponse {
            hits,
            debug,
            meta: ResponseMeta {
                partial: false,
                dropped: 0,
                took_ms,
            },
        })
    }

    async fn get_raw(&self, entity: &str, id: RowId) -> DeskoResult<Value> {
        validate_entity(entity)?;
        let t0 = Instant::now();
        let v = self.hub.get(entity, id).await?;
        info!(entity = %entity, id, took_ms = t0.elapsed().as_millis() as u64, "api: get_raw ok");
        Ok(v)
    }

    async fn watch(&self, entity: &str) -> DeskoResult<StreamHandle<RowDelta>> {
        validate_entity(entity)?;
        let cap = std::env::var("DESKO_QUEUE_CAP")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(2048);
        let (tx, rx) = tokio::sync::mpsc::channel::<RowDelta>(cap);
        let hub = self.hub.clone();
        let ent = entity.to_string();
        info!(entity = %entity, cap, "api: watch start");
        let handle = tokio::spawn(async move {
            let _ = desko_resthub::start_poller(hub, ent, tx).await;
        });
        Ok(StreamHandle {
            rx,
            cancel: CancelHandle { task: Some(handle) },
        })
    }

    async fn saved_payloads(
        &self,
        entity: &str,
        id: RowId,
        limit: Option<usize>,
    ) -> DeskoResult<Vec<SavedPayload>> {
        validate_entity(entity)?;
        let store = SqliteStore::open_default().map_err(|e| DeskoError::Internal(e.to_string()))?;
        let rows = store
            .get_saved(entity, id, limit)
            .map_err(|e| DeskoError::Internal(e.to_string()))?;
        Ok(rows)
    }

    async fn stats(&self) -> DeskoResult<Stats> {
        let relist_secs = std::env::var("DESKO_REFRESH_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let http_timeout_secs = std::env::var("DESKO_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let page_size = std::env::var("DESKO_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let results_soft_cap = std::env::var("DESKO_RESULTS_SOFT_CAP")
            .ok()
            .and_then(|s| s.parse().ok());
        let metrics_addr = std::env::var("DESKO_METRICS_ADDR").ok();
        Ok(Stats {
            relist_secs,
            http_timeout_secs,
            page_size,
            results_soft_cap,
            metrics_addr,
        })
    }

    fn ops(&self) -> Arc<dyn DeskOps> {
        Arc::new(RestOps::new(self.hub.clone()))
    }
}

// ----------------- Mock implementation -----------------

/// Ops stub used by `MockApi`: every mutation succeeds without touching
/// the network.
#[derive(Debug, Default, Clone)]
pub struct MockOps;

#[async_trait::async_trait]
impl DeskOps for MockOps {
    async fn save(
        &self,
        _entity: &str,
        id: Option<RowId>,
        _payload: &Value,
    ) -> anyhow::Result<SaveOutcome> {
        Ok(match id {
            Some(id) => SaveOutcome::Updated { id },
            None => SaveOutcome::Created { id: Some(1) },
        })
    }

    async fn delete(&self, _entity: &str, _id: RowId) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete_many(&self, _entity: &str, ids: &[RowId]) -> anyhow::Result<BulkOutcome> {
        Ok(BulkOutcome {
            deleted: ids.to_vec(),
            failed: Vec::new(),
        })
    }

    async fn set_status(&self, _entity: &str, _id: RowId, _status: &Value) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Simple in-memory mock implementation for tests.
pub struct MockApi {
    pub kinds: Vec<EntityKind>,
    pub snapshot: Option<RowSnapshot>,
    pub hits: Vec<SearchHit>,
    pub debug: SearchDebugInfo,
    pub raw_obj: Option<Value>,
    pub saved: Vec<SavedPayload>,
    pub stats: Stats,
    pub ops: Arc<dyn DeskOps>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            kinds: builtin_entities(),
            snapshot: None,
            hits: Vec::new(),
            debug: SearchDebugInfo {
                total: 0,
                after_filters: 0,
                matched: 0,
            },
            raw_obj: None,
            saved: Vec::new(),
            stats: Stats::default(),
            ops: Arc::new(MockOps),
        }
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DeskoApi for MockApi {
    async fn discover(&self) -> DeskoResult<Vec<EntityKind>> {
        Ok(self.kinds.clone())
    }

    async fn snapshot(&self, entity: &str) -> DeskoResult<SnapshotResponse> {
        validate_entity(entity)?;
        let snap = self
            .snapshot
            .clone()
            .ok_or_else(|| DeskoError::NotFound("no snapshot".into()))?;
        Ok(SnapshotResponse {
            data: snap,
            meta: ResponseMeta::default(),
        })
    }

    async fn search(&self, entity: &str, _query: &str, _limit: usize) -> DeskoResult<SearchResponse> {
        validate_entity(entity)?;
        Ok(SearchResponse {
            hits: self.hits.clone(),
            debug: self.debug.clone(),
            meta: ResponseMeta::default(),
        })
    }

    async fn get_raw(&self, entity: &str, _id: RowId) -> DeskoResult<Value> {
        validate_entity(entity)?;
        self.raw_obj
            .clone()
            .ok_or_else(|| DeskoError::NotFound("no raw".into()))
    }

    async fn watch(&self, entity: &str) -> DeskoResult<StreamHandle<RowDelta>> {
        validate_entity(entity)?;
        // Empty stream by default for the mock
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        Ok(StreamHandle {
            rx,
            cancel: CancelHandle { task: None },
        })
    }

    async fn saved_payloads(
        &self,
        entity: &str,
        id: RowId,
        limit: Option<usize>,
    ) -> DeskoResult<Vec<SavedPayload>> {
        validate_entity(entity)?;
        let cap = limit.unwrap_or(3);
        Ok(self
            .saved
            .iter()
            .filter(|sp| sp.entity == entity && sp.row_id == id)
            .take(cap)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> DeskoResult<Stats> {
        Ok(self.stats.clone())
    }

    fn ops(&self) -> Arc<dyn DeskOps> {
        self.ops.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desko_core::LiteRow;
    use serde_json::json;

    fn snap_with(names: &[(RowId, &str)]) -> RowSnapshot {
        let items = names
            .iter()
            .map(|(id, name)| LiteRow {
                id: *id,
                name: (*name).to_string(),
                created_ts: 0,
                status: None,
                projected: Default::default(),
                raw: json!({"id": id, "name": name}),
            })
            .collect();
        RowSnapshot { epoch: 1, items }
    }

    #[test]
    fn catalog_exposes_slug_label_and_widget() {
        let kinds = builtin_entities();
        assert_eq!(kinds.len(), known_entities().len());
        let leads = kinds.iter().find(|k| k.slug == "leads").unwrap();
        assert_eq!(leads.label, "Leads");
        assert_eq!(leads.widget, StatusWidget::Switch);
        let sales = kinds.iter().find(|k| k.slug == "sales").unwrap();
        assert_eq!(sales.widget, StatusWidget::Select);
    }

    #[tokio::test]
    async fn unknown_entities_come_back_not_found() {
        let api = MockApi::new();
        let err = api.snapshot("gadgets").await.unwrap_err();
        assert!(matches!(err, DeskoError::NotFound(_)));
        let err = api.get_raw("gadgets", 1).await.unwrap_err();
        assert!(matches!(err, DeskoError::NotFound(_)));
    }

    #[tokio::test]
    async fn mock_serves_fixtures() {
        let mut api = MockApi::new();
        api.snapshot = Some(snap_with(&[(1, "Alpha"), (2, "Beta")]));
        api.saved.push(SavedPayload {
            entity: "leads".into(),
            row_id: 1,
            ts: 100,
            json: "{}".into(),
        });

        let resp = api.snapshot("leads").await.unwrap();
        assert_eq!(resp.data.items.len(), 2);

        let saved = api.saved_payloads("leads", 1, None).await.unwrap();
        assert_eq!(saved.len(), 1);
        let saved = api.saved_payloads("leads", 2, None).await.unwrap();
        assert!(saved.is_empty());
    }

    #[test]
    fn hub_errors_map_onto_the_taxonomy() {
        let e: DeskoError = HubError::Auth {
            status: 401,
            message: "expired".into(),
        }
        .into();
        assert!(matches!(e, DeskoError::Auth(_)));

        let e: DeskoError = HubError::Validation {
            message: "bad email".into(),
        }
        .into();
        assert!(matches!(e, DeskoError::Validation(_)));

        let e: DeskoError = HubError::Http {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(e, DeskoError::Http { status: 500, .. }));
    }
}
