//! Desko core types: canonical rows, dotted-path lookup, status vocabulary.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod columns;
pub mod table;

/// Backend-issued record identifier. Stable across re-fetches; used for
/// selection, keying, toggle and delete targeting.
pub type RowId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeltaKind {
    Applied,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowDelta {
    pub id: RowId,
    pub kind: DeltaKind,
    /// Normalized record for Applied; Null for Deleted.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteRow {
    pub id: RowId,
    /// Primary display label (name, title, reference).
    pub name: String,
    /// Unix seconds from the record's created_at; 0 when absent.
    pub created_ts: i64,
    /// Raw status value stringified, when the record carries one.
    pub status: Option<String>,
    /// Projected cells for listing: `(ColumnId, RenderedValue)`.
    pub projected: SmallVec<[(u32, String); 8]>,
    /// Normalized record as returned by the backend. Dotted-path search and
    /// filter lookups resolve against this.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RowSnapshot {
    pub epoch: u64,
    /// Rows for the selected entity, in fetch order.
    pub items: Vec<LiteRow>,
}

pub mod prelude {
    pub use super::{
        nested_value, DeltaKind, LiteRow, ProjectedEntry, Projector, RowDelta, RowId, RowSnapshot,
        StatusMapping,
    };
}

/// Entry representing a projected cell: `(ColumnId, RenderedValue)`
pub type ProjectedEntry = (u32, String);

/// Projector takes a normalized JSON record and yields rendered cell scalars.
pub trait Projector: Send + Sync {
    fn project(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]>;
}

/// Resolve a dotted path (e.g. `"country.name"`) against a record.
///
/// Missing segments, non-object intermediates and explicit nulls all yield
/// `None`; resolution never fails.
pub fn nested_value<'a>(raw: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut cur = raw;
    for seg in path.split('.') {
        cur = cur.as_object()?.get(seg)?;
    }
    if cur.is_null() {
        None
    } else {
        Some(cur)
    }
}

/// Resolve a dotted path to display text. Objects and arrays are not
/// displayable and yield `None`, as does anything `nested_value` skips.
pub fn display_value(raw: &serde_json::Value, path: &str) -> Option<String> {
    match nested_value(raw, path)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Per-entity status vocabulary consumed by the generic toggle. Every catalog
/// entity supplies its real pair; the default keeps the generic
/// approve/reject vocabulary for callers outside the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusMapping {
    pub on: serde_json::Value,
    pub off: serde_json::Value,
}

impl Default for StatusMapping {
    fn default() -> Self {
        Self {
            on: serde_json::Value::String("approve".into()),
            off: serde_json::Value::String("reject".into()),
        }
    }
}

impl StatusMapping {
    pub fn strings(on: &str, off: &str) -> Self {
        Self {
            on: serde_json::Value::String(on.into()),
            off: serde_json::Value::String(off.into()),
        }
    }

    pub fn bools() -> Self {
        Self {
            on: serde_json::Value::Bool(true),
            off: serde_json::Value::Bool(false),
        }
    }

    /// A stringified status counts as "on" when it matches the mapping's `on`
    /// value or the literal "active", both case-insensitive.
    pub fn is_on_str(&self, s: &str) -> bool {
        let on_matches = match &self.on {
            serde_json::Value::String(on) => s.eq_ignore_ascii_case(on),
            serde_json::Value::Bool(true) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        on_matches || s.eq_ignore_ascii_case("active")
    }

    /// Boolean `true` is always "on"; strings go through [`Self::is_on_str`].
    pub fn is_on(&self, value: &serde_json::Value) -> bool {
        match value {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => self.is_on_str(s),
            _ => false,
        }
    }

    pub fn value_for(&self, on: bool) -> &serde_json::Value {
        if on {
            &self.on
        } else {
            &self.off
        }
    }
}

impl LiteRow {
    /// Projected cell text for a column id, if the projector produced one.
    pub fn projected_text(&self, col_id: u32) -> Option<&str> {
        self.projected
            .iter()
            .find(|(id, _)| *id == col_id)
            .map(|(_, v)| v.as_str())
    }

    pub fn status_is_on(&self, mapping: &StatusMapping) -> bool {
        match &self.status {
            Some(s) => mapping.is_on_str(s),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_value_resolves_dotted_paths() {
        let v = json!({"a": {"b": {"c": 5}}});
        assert_eq!(nested_value(&v, "a.b.c"), Some(&json!(5)));
    }

    #[test]
    fn nested_value_missing_segment_is_none() {
        let v = json!({"a": {}});
        assert_eq!(nested_value(&v, "a.b.c"), None);
    }

    #[test]
    fn nested_value_through_scalar_is_none() {
        let v = json!({"a": 3});
        assert_eq!(nested_value(&v, "a.b"), None);
        assert_eq!(nested_value(&json!(null), "a"), None);
    }

    #[test]
    fn nested_value_null_leaf_is_none() {
        let v = json!({"a": {"b": null}});
        assert_eq!(nested_value(&v, "a.b"), None);
    }

    #[test]
    fn display_value_skips_non_primitives() {
        let v = json!({"country": {"name": "Jordan"}, "tags": ["a"], "n": 7, "ok": true});
        assert_eq!(display_value(&v, "country.name").as_deref(), Some("Jordan"));
        assert_eq!(display_value(&v, "n").as_deref(), Some("7"));
        assert_eq!(display_value(&v, "ok").as_deref(), Some("true"));
        assert_eq!(display_value(&v, "tags"), None);
        assert_eq!(display_value(&v, "country"), None);
    }

    #[test]
    fn default_mapping_keeps_generic_vocabulary() {
        let m = StatusMapping::default();
        assert!(m.is_on(&json!(true)));
        assert!(m.is_on(&json!("Active")));
        assert!(m.is_on(&json!("ACTIVE")));
        assert!(m.is_on(&json!("approve")));
        assert!(!m.is_on(&json!(false)));
        assert!(!m.is_on(&json!("inactive")));
        assert!(!m.is_on(&json!("true")));
        assert_eq!(m.value_for(true), &json!("approve"));
        assert_eq!(m.value_for(false), &json!("reject"));
    }

    #[test]
    fn explicit_mappings_accept_their_own_vocabulary() {
        let m = StatusMapping::strings("true", "false");
        assert!(m.is_on(&json!("true")));
        assert!(!m.is_on(&json!("false")));

        let b = StatusMapping::bools();
        assert!(b.is_on(&json!(true)));
        assert!(b.is_on_str("true"));
        assert!(!b.is_on_str("false"));
    }
}
