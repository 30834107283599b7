//! Desko ops: imperative mutations against the REST backend.
//! Saves are validated against the entity form before any request goes out,
//! and accepted payloads are recorded locally for quick re-apply.

#![forbid(unsafe_code)]

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use desko_core::columns::known_entities;
use desko_core::RowId;
use desko_persist::{now_ts, SavedPayload, SqliteStore, Store};
use desko_resthub::{record_id, RestHub};
use desko_schema::{ensure_valid, form_for};

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    /// A new record was created. Backends usually echo the new id; `None`
    /// means the response carried none we could read.
    Created { id: Option<RowId> },
    /// An existing record was updated in place.
    Updated { id: RowId },
}

/// Result of a bulk delete. Per-record failures are reported, not fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub deleted: Vec<RowId>,
    pub failed: Vec<(RowId, String)>,
}

/// Imperative mutations. One-shot writes against the backend; reads live in
/// the resthub/store path.
#[async_trait::async_trait]
pub trait DeskOps: Send + Sync {
    /// Create (`id == None`) or update a catalog record.
    async fn save(&self, entity: &str, id: Option<RowId>, payload: &Value) -> Result<SaveOutcome>;

    /// Delete a single record.
    async fn delete(&self, entity: &str, id: RowId) -> Result<()>;

    /// Delete several records, continuing past per-record failures.
    async fn delete_many(&self, entity: &str, ids: &[RowId]) -> Result<BulkOutcome>;

    /// Overwrite the status field of a record.
    async fn set_status(&self, entity: &str, id: RowId, status: &Value) -> Result<()>;
}

/// Default implementation speaking to the REST backend through a `RestHub`.
pub struct RestOps {
    hub: RestHub,
}

impl RestOps {
    pub fn new(hub: RestHub) -> Self {
        Self { hub }
    }
}

fn ensure_entity(entity: &str) -> Result<()> {
    if known_entities().iter().any(|e| *e == entity) {
        Ok(())
    } else {
        Err(anyhow!("unknown entity: {}", entity))
    }
}

/// Record a payload the backend accepted. Best effort: a failure here must
/// never fail the save itself.
fn remember_payload(entity: &str, id: RowId, payload: &Value) {
    let rec = SavedPayload {
        entity: entity.to_string(),
        row_id: id,
        ts: now_ts(),
        json: payload.to_string(),
    };
    match SqliteStore::open_default() {
        Ok(store) => {
            if let Err(e) = store.put_saved(rec) {
                warn!(entity = %entity, id, error = %e, "could not record saved payload");
            }
        }
        Err(e) => warn!(error = %e, "could not open payload store"),
    }
}

#[async_trait::async_trait]
impl DeskOps for RestOps {
    async fn save(&self, entity: &str, id: Option<RowId>, payload: &Value) -> Result<SaveOutcome> {
        ensure_entity(entity)?;
        let form = form_for(entity);
        ensure_valid(&form, payload)?;
        let started = std::time::Instant::now();
        let outcome = match id {
            Some(id) => {
                let _echo = self.hub.update(entity, id, payload).await?;
                remember_payload(entity, id, payload);
                SaveOutcome::Updated { id }
            }
            None => {
                let record = self.hub.create(entity, payload).await?;
                let new_id = record_id(&record);
                if let Some(new_id) = new_id {
                    remember_payload(entity, new_id, payload);
                }
                SaveOutcome::Created { id: new_id }
            }
        };
        info!(entity = %entity, id = ?id, took_ms = started.elapsed().as_millis() as u64, "save done");
        Ok(outcome)
    }

    async fn delete(&self, entity: &str, id: RowId) -> Result<()> {
        ensure_entity(entity)?;
        let started = std::time::Instant::now();
        self.hub.delete(entity, id).await?;
        info!(entity = %entity, id, took_ms = started.elapsed().as_millis() as u64, "delete done");
        Ok(())
    }

    async fn delete_many(&self, entity: &str, ids: &[RowId]) -> Result<BulkOutcome> {
        ensure_entity(entity)?;
        let started = std::time::Instant::now();
        let mut out = BulkOutcome::default();
        for &id in ids {
            match self.hub.delete(entity, id).await {
                Ok(()) => out.deleted.push(id),
                Err(e) => {
                    warn!(entity = %entity, id, error = %e, "bulk delete: record failed");
                    out.failed.push((id, e.to_string()));
                }
            }
        }
        info!(
            entity = %entity,
            deleted = out.deleted.len(),
            failed = out.failed.len(),
            took_ms = started.elapsed().as_millis() as u64,
            "bulk delete done"
        );
        Ok(out)
    }

    async fn set_status(&self, entity: &str, id: RowId, status: &Value) -> Result<()> {
        ensure_entity(entity)?;
        let started = std::time::Instant::now();
        self.hub.set_status(entity, id, status).await?;
        info!(entity = %entity, id, status = %status, took_ms = started.elapsed().as_millis() as u64, "status set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desko_resthub::Session;
    use serde_json::json;

    fn ops() -> RestOps {
        // Port 1 is never dialed in these tests: both paths below fail
        // before any request is made.
        let hub = RestHub::new(Session::new("http://127.0.0.1:1", "token")).unwrap();
        RestOps::new(hub)
    }

    #[tokio::test]
    async fn unknown_entities_are_rejected() {
        let err = ops()
            .save("gadgets", None, &json!({"name": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown entity"));

        let err = ops().delete("gadgets", 1).await.unwrap_err();
        assert!(err.to_string().contains("unknown entity"));
    }

    #[tokio::test]
    async fn invalid_payloads_never_reach_the_wire() {
        let err = ops()
            .save("leads", None, &json!({"email": "not-an-email"}))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invalid payload"), "got: {msg}");
    }
}
