//! Desko resthub: REST backend access and poll wiring.
//!
//! Every response passes through the envelope normalizers here; nothing
//! above this crate ever sees a raw `{data: ...}` wrapper.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use desko_core::columns::{builtin_projector_for, name_path_for};
use desko_core::{display_value, DeltaKind, LiteRow, RowDelta, RowId};
use tokio::sync::mpsc;
use url::Url;

/// Connection identity for one backend: where to talk and as whom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub base_url: String,
    pub token: String,
    #[serde(default)]
    pub user: Option<String>,
}

impl Session {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            user: None,
        }
    }

    /// Build from `DESKO_API_URL` / `DESKO_TOKEN`; `None` when either is unset.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("DESKO_API_URL").ok()?;
        let token = std::env::var("DESKO_TOKEN").ok()?;
        Some(Self {
            base_url,
            token,
            user: None,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("conflict: {message}")]
    Conflict { message: String },
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    Envelope(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid base url {url}: {detail}")]
    BadUrl { url: String, detail: String },
}

fn classify(status: u16, message: String) -> HubError {
    match status {
        401 | 403 => HubError::Auth { status, message },
        404 => HubError::NotFound { message },
        409 => HubError::Conflict { message },
        400 | 422 => HubError::Validation { message },
        _ => HubError::Http { status, message },
    }
}

/// User-facing text from an error body: `message`, then `error.message`,
/// else a generic line carrying the status.
fn extract_message(status: u16, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        if let Some(m) = v.get("message").and_then(|m| m.as_str()) {
            if !m.is_empty() {
                return m.to_string();
            }
        }
        if let Some(m) = v.pointer("/error/message").and_then(|m| m.as_str()) {
            if !m.is_empty() {
                return m.to_string();
            }
        }
    }
    format!("request failed ({status})")
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accepts `[...]`, `{data: [...]}` and `{data: {data: [...]}}`.
pub fn normalize_list(v: Value) -> Result<Vec<Value>, HubError> {
    match v {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Object(mut inner)) => match inner.remove("data") {
                Some(Value::Array(items)) => Ok(items),
                Some(other) => Err(HubError::Envelope(format!(
                    "data.data is {}, expected array",
                    json_kind(&other)
                ))),
                None => Err(HubError::Envelope("data.data missing".into())),
            },
            Some(other) => Err(HubError::Envelope(format!(
                "data is {}, expected array or object",
                json_kind(&other)
            ))),
            None => Err(HubError::Envelope("list response without data".into())),
        },
        other => Err(HubError::Envelope(format!(
            "expected a list, got {}",
            json_kind(&other)
        ))),
    }
}

/// Accepts `{data: {...}}` and a bare object.
pub fn normalize_record(v: Value) -> Result<Value, HubError> {
    match v {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(inner)) => Ok(Value::Object(inner)),
            Some(other) => {
                map.insert("data".into(), other);
                Ok(Value::Object(map))
            }
            None => Ok(Value::Object(map)),
        },
        other => Err(HubError::Envelope(format!(
            "expected a record, got {}",
            json_kind(&other)
        ))),
    }
}

/// Stable integer id of a backend record, from a numeric or numeric-string
/// `id` field.
pub fn record_id(raw: &Value) -> Option<RowId> {
    match raw.get("id") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

fn parse_timestamp(v: &Value) -> Option<i64> {
    let s = v.as_str()?;
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ndt| ndt.and_utc().timestamp())
}

/// Normalize one backend record into the row model. `None` when the record
/// has no usable integer id.
pub fn to_lite(entity: &str, raw: Value) -> Option<LiteRow> {
    let id = record_id(&raw)?;
    let name = display_value(&raw, name_path_for(entity)).unwrap_or_default();
    let created_ts = raw.get("created_at").and_then(parse_timestamp).unwrap_or(0);
    let status = display_value(&raw, "status");
    let projected = builtin_projector_for(entity)
        .map(|p| p.project(&raw))
        .unwrap_or_default();
    Some(LiteRow {
        id,
        name,
        created_ts,
        status,
        projected,
        raw,
    })
}

/// REST accessor bound to one [`Session`]. Cheap to clone.
#[derive(Clone)]
pub struct RestHub {
    inner: Arc<Inner>,
}

struct Inner {
    session: Session,
    http: reqwest::Client,
}

impl RestHub {
    pub fn new(session: Session) -> Result<Self, HubError> {
        Url::parse(&session.base_url).map_err(|e| HubError::BadUrl {
            url: session.base_url.clone(),
            detail: e.to_string(),
        })?;
        let timeout_secs: u64 = std::env::var("DESKO_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(HubError::Network)?;
        Ok(Self {
            inner: Arc::new(Inner { session, http }),
        })
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.session.base_url.trim_end_matches('/'),
            path
        )
    }

    async fn error_from(resp: reqwest::Response) -> HubError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        classify(status, extract_message(status, &body))
    }

    pub async fn list(&self, entity: &str) -> Result<Vec<Value>, HubError> {
        let started = Instant::now();
        let resp = self
            .inner
            .http
            .get(self.endpoint(entity))
            .bearer_auth(&self.inner.session.token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let v: Value = resp.json().await?;
        let items = normalize_list(v)?;
        let took_ms = started.elapsed().as_millis() as u64;
        metrics::histogram!("resthub_list_ms", took_ms as f64);
        debug!(entity = %entity, count = items.len(), took_ms, "list done");
        Ok(items)
    }

    /// List and normalize; records without a usable id are skipped.
    pub async fn list_rows(&self, entity: &str) -> Result<Vec<LiteRow>, HubError> {
        let items = self.list(entity).await?;
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            match to_lite(entity, item) {
                Some(row) => rows.push(row),
                None => warn!(entity = %entity, "record without usable id skipped"),
            }
        }
        Ok(rows)
    }

    pub async fn get(&self, entity: &str, id: RowId) -> Result<Value, HubError> {
        let resp = self
            .inner
            .http
            .get(self.endpoint(&format!("{entity}/{id}")))
            .bearer_auth(&self.inner.session.token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let v: Value = resp.json().await?;
        normalize_record(v)
    }

    pub async fn create(&self, entity: &str, payload: &Value) -> Result<Value, HubError> {
        let resp = self
            .inner
            .http
            .post(self.endpoint(entity))
            .bearer_auth(&self.inner.session.token)
            .json(payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let v: Value = resp.json().await?;
        normalize_record(v)
    }

    pub async fn update(&self, entity: &str, id: RowId, payload: &Value) -> Result<Value, HubError> {
        let resp = self
            .inner
            .http
            .put(self.endpoint(&format!("{entity}/{id}")))
            .bearer_auth(&self.inner.session.token)
            .json(payload)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let v: Value = resp.json().await?;
        normalize_record(v)
    }

    pub async fn delete(&self, entity: &str, id: RowId) -> Result<(), HubError> {
        let resp = self
            .inner
            .http
            .delete(self.endpoint(&format!("{entity}/{id}")))
            .bearer_auth(&self.inner.session.token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        Ok(())
    }

    pub async fn set_status(&self, entity: &str, id: RowId, value: &Value) -> Result<Value, HubError> {
        let resp = self
            .inner
            .http
            .put(self.endpoint(&format!("{entity}/{id}/status")))
            .bearer_auth(&self.inner.session.token)
            .json(&json!({ "status": value }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let v: Value = resp.json().await?;
        normalize_record(v)
    }
}

/// Re-list `entity` on an interval and send synthesized deltas: Applied for
/// new or changed rows, Deleted for rows gone since the previous fetch. The
/// first fetch emits everything as Applied.
pub async fn start_poller(
    hub: RestHub,
    entity: String,
    delta_tx: mpsc::Sender<RowDelta>,
) -> Result<()> {
    let secs: u64 = std::env::var("DESKO_REFRESH_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);
    let interval = Duration::from_secs(secs.max(1));
    let mut prev: HashMap<RowId, Value> = HashMap::new();
    info!(entity = %entity, every_secs = secs, "poller started");
    loop {
        match hub.list_rows(&entity).await {
            Ok(rows) => {
                let mut next: HashMap<RowId, Value> = HashMap::with_capacity(rows.len());
                for row in rows {
                    let changed = prev.get(&row.id).map(|old| old != &row.raw).unwrap_or(true);
                    next.insert(row.id, row.raw.clone());
                    if changed {
                        let d = RowDelta {
                            id: row.id,
                            kind: DeltaKind::Applied,
                            raw: row.raw,
                        };
                        if delta_tx.send(d).await.is_err() {
                            debug!(entity = %entity, "delta receiver dropped; poller exiting");
                            return Ok(());
                        }
                    }
                }
                let mut gone: Vec<RowId> = Vec::new();
                for id in prev.keys() {
                    if !next.contains_key(id) {
                        gone.push(*id);
                    }
                }
                for id in gone {
                    let d = RowDelta {
                        id,
                        kind: DeltaKind::Deleted,
                        raw: Value::Null,
                    };
                    if delta_tx.send(d).await.is_err() {
                        return Ok(());
                    }
                }
                prev = next;
            }
            Err(e) => {
                metrics::counter!("resthub_poll_errors", 1);
                warn!(entity = %entity, error = %e, "poll failed");
            }
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_envelopes_normalize_identically() {
        let records = json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]);
        let shapes = vec![
            records.clone(),
            json!({"data": records.clone()}),
            json!({"data": {"data": records.clone()}}),
        ];
        let mut normalized = Vec::new();
        for shape in shapes {
            normalized.push(normalize_list(shape).unwrap());
        }
        assert_eq!(normalized[0], normalized[1]);
        assert_eq!(normalized[1], normalized[2]);
        assert_eq!(normalized[0].len(), 2);
    }

    #[test]
    fn non_list_shapes_are_errors_not_panics() {
        assert!(matches!(normalize_list(json!(42)), Err(HubError::Envelope(_))));
        assert!(matches!(
            normalize_list(json!({"data": "nope"})),
            Err(HubError::Envelope(_))
        ));
        assert!(matches!(
            normalize_list(json!({"items": []})),
            Err(HubError::Envelope(_))
        ));
        assert!(matches!(
            normalize_list(json!({"data": {"data": 7}})),
            Err(HubError::Envelope(_))
        ));
    }

    #[test]
    fn record_envelope_unwraps_one_level() {
        let rec = json!({"id": 5, "name": "x"});
        assert_eq!(normalize_record(json!({"data": rec.clone()})).unwrap(), rec);
        assert_eq!(normalize_record(rec.clone()).unwrap(), rec);
        // A scalar "data" field belongs to the record itself
        let odd = json!({"id": 5, "data": 3});
        assert_eq!(normalize_record(odd.clone()).unwrap(), odd);
        assert!(normalize_record(json!([1, 2])).is_err());
    }

    #[test]
    fn error_message_prefers_body_fields() {
        assert_eq!(extract_message(422, r#"{"message": "name is required"}"#), "name is required");
        assert_eq!(
            extract_message(409, r#"{"error": {"message": "duplicate sku"}}"#),
            "duplicate sku"
        );
        assert_eq!(extract_message(500, "<html>oops</html>"), "request failed (500)");
        assert_eq!(extract_message(400, r#"{"message": ""}"#), "request failed (400)");
    }

    #[test]
    fn status_codes_map_to_the_taxonomy() {
        assert!(matches!(classify(401, String::new()), HubError::Auth { .. }));
        assert!(matches!(classify(403, String::new()), HubError::Auth { .. }));
        assert!(matches!(classify(404, String::new()), HubError::NotFound { .. }));
        assert!(matches!(classify(409, String::new()), HubError::Conflict { .. }));
        assert!(matches!(classify(422, String::new()), HubError::Validation { .. }));
        assert!(matches!(classify(400, String::new()), HubError::Validation { .. }));
        assert!(matches!(classify(503, String::new()), HubError::Http { status: 503, .. }));
    }

    #[test]
    fn to_lite_reads_id_name_status_and_timestamp() {
        let raw = json!({
            "id": 7,
            "name": "Jordan Reed",
            "email": "jr@acme.io",
            "status": "Active",
            "created_at": "2024-03-01T10:30:00Z"
        });
        let row = to_lite("leads", raw).unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.name, "Jordan Reed");
        assert_eq!(row.status.as_deref(), Some("Active"));
        assert!(row.created_ts > 0);
        assert!(row.projected.iter().any(|(_, v)| v == "jr@acme.io"));
    }

    #[test]
    fn to_lite_accepts_string_ids_and_bool_status() {
        let row = to_lite("users", json!({"id": "42", "name": "ops", "status": true})).unwrap();
        assert_eq!(row.id, 42);
        assert_eq!(row.status.as_deref(), Some("true"));
    }

    #[test]
    fn to_lite_skips_records_without_id() {
        assert!(to_lite("leads", json!({"name": "no id"})).is_none());
        assert!(to_lite("leads", json!({"id": "abc"})).is_none());
        assert!(to_lite("leads", json!({"id": null})).is_none());
    }

    #[test]
    fn sales_rows_name_from_reference() {
        let row = to_lite("sales", json!({"id": 1, "reference": "S-1001"})).unwrap();
        assert_eq!(row.name, "S-1001");
    }

    #[test]
    fn timestamps_parse_both_backend_formats() {
        assert_eq!(
            parse_timestamp(&json!("1970-01-01T00:01:00Z")),
            Some(60)
        );
        assert_eq!(
            parse_timestamp(&json!("1970-01-01 00:01:00")),
            Some(60)
        );
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(12)), None);
    }
}
