//! Desko schema: per-entity form schemas driving the edit dialog and the
//! CLI save path. A `FormSpec` lists the editable fields for one entity;
//! validation and payload building both read it.

#![forbid(unsafe_code)]

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use desko_core::display_value;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    Url,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Select(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

fn field(key: &'static str, label: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec {
        key,
        label,
        kind,
        required,
    }
}

fn number(min: Option<f64>, max: Option<f64>) -> FieldKind {
    FieldKind::Number {
        min,
        max,
        integer: false,
    }
}

fn integer(min: Option<f64>, max: Option<f64>) -> FieldKind {
    FieldKind::Number {
        min,
        max,
        integer: true,
    }
}

#[derive(Debug, Clone)]
pub struct FormSpec {
    pub entity: String,
    pub fields: Vec<FieldSpec>,
}

/// Builtin form for a catalog entity. Unknown entities get a minimal
/// name-only form. Status is not an editable field anywhere; the status
/// cell widget owns it.
pub fn form_for(entity: &str) -> FormSpec {
    let fields = match entity {
        "leads" => vec![
            field("name", "Name", FieldKind::Text, true),
            field("email", "Email", FieldKind::Email, true),
            field("phone", "Phone", FieldKind::Phone, false),
            field("type", "Type", FieldKind::Select(&["sales", "company"]), true),
            field("source", "Source", FieldKind::Text, false),
        ],
        "sales" => vec![
            field("reference", "Reference", FieldKind::Text, true),
            field("amount", "Amount", number(Some(0.0), None), true),
            field("currency", "Currency", FieldKind::Select(&["USD", "EUR", "GBP"]), true),
            field(
                "stage",
                "Stage",
                FieldKind::Select(&["new", "negotiation", "closed"]),
                true,
            ),
        ],
        "leaders" => vec![
            field("name", "Name", FieldKind::Text, true),
            field("email", "Email", FieldKind::Email, true),
            field(
                "region",
                "Region",
                FieldKind::Select(&["north", "south", "east", "west"]),
                false,
            ),
            field("team_size", "Team size", integer(Some(0.0), None), false),
        ],
        "users" => vec![
            field("name", "Name", FieldKind::Text, true),
            field("email", "Email", FieldKind::Email, true),
            field(
                "role",
                "Role",
                FieldKind::Select(&["admin", "manager", "agent"]),
                true,
            ),
        ],
        "products" => vec![
            field("name", "Name", FieldKind::Text, true),
            field("sku", "SKU", FieldKind::Text, true),
            field("price", "Price", number(Some(0.0), None), true),
            field("stock", "Stock", integer(Some(0.0), None), false),
        ],
        "offers" => vec![
            field("name", "Name", FieldKind::Text, true),
            field("discount_pct", "Discount %", number(Some(0.0), Some(100.0)), true),
            field("starts_at", "Starts", FieldKind::Date, false),
            field("ends_at", "Ends", FieldKind::Date, false),
            field("url", "URL", FieldKind::Url, false),
        ],
        "commissions" => vec![
            field("sale_reference", "Sale", FieldKind::Text, true),
            field("rate_pct", "Rate %", number(Some(0.0), Some(100.0)), true),
            field("amount", "Amount", number(Some(0.0), None), false),
            field("period", "Period", FieldKind::Text, false),
        ],
        "payments" => vec![
            field("reference", "Reference", FieldKind::Text, true),
            field(
                "method",
                "Method",
                FieldKind::Select(&["card", "transfer", "cash"]),
                true,
            ),
            field("amount", "Amount", number(Some(0.0), None), true),
            field("paid_at", "Paid at", FieldKind::Date, false),
        ],
        "locations" => vec![
            field("name", "Name", FieldKind::Text, true),
            field("city", "City", FieldKind::Text, true),
            field("address", "Address", FieldKind::Text, false),
        ],
        "popups" => vec![
            field("name", "Title", FieldKind::Text, true),
            field("image_url", "Image URL", FieldKind::Url, true),
            field("starts_at", "Starts", FieldKind::Date, false),
            field("ends_at", "Ends", FieldKind::Date, false),
        ],
        _ => vec![field("name", "Name", FieldKind::Text, true)],
    };
    FormSpec {
        entity: entity.to_string(),
        fields,
    }
}

/// Editable text state for one form, ordered like the form's fields.
#[derive(Debug, Clone, Default)]
pub struct FormDraft {
    values: Vec<(String, String)>,
}

fn date_part(s: &str) -> &str {
    if s.len() >= 10 && s.as_bytes().get(4) == Some(&b'-') {
        &s[..10]
    } else {
        s
    }
}

impl FormDraft {
    pub fn empty(form: &FormSpec) -> Self {
        Self {
            values: form
                .fields
                .iter()
                .map(|f| (f.key.to_string(), String::new()))
                .collect(),
        }
    }

    /// Prefill from an existing record. Date fields keep the calendar part
    /// of a full timestamp.
    pub fn from_record(form: &FormSpec, raw: &Value) -> Self {
        let values = form
            .fields
            .iter()
            .map(|f| {
                let mut v = display_value(raw, f.key).unwrap_or_default();
                if matches!(f.kind, FieldKind::Date) {
                    v = date_part(&v).to_string();
                }
                (f.key.to_string(), v)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> &str {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        if let Some(slot) = self.values.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.into();
        }
    }

    /// Mutable text buffer for a field, for direct text-edit binding.
    pub fn value_mut(&mut self, key: &str) -> Option<&mut String> {
        self.values
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub error: String,
    pub hint: Option<String>,
}

fn issue(field: &str, error: impl Into<String>, hint: Option<&str>) -> ValidationIssue {
    ValidationIssue {
        field: field.to_string(),
        error: error.into(),
        hint: hint.map(|h| h.to_string()),
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9 ().-]{6,20}$").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

fn check_kind(f: &FieldSpec, text: &str, out: &mut Vec<ValidationIssue>) {
    match &f.kind {
        FieldKind::Text => {}
        FieldKind::Email => {
            if !EMAIL_RE.is_match(text) {
                out.push(issue(f.key, "not a valid email address", None));
            }
        }
        FieldKind::Phone => {
            if !PHONE_RE.is_match(text) {
                out.push(issue(f.key, "not a valid phone number", Some("digits, spaces and +().- only")));
            }
        }
        FieldKind::Url => {
            if !URL_RE.is_match(text) {
                out.push(issue(f.key, "not a valid URL", Some("must start with http:// or https://")));
            }
        }
        FieldKind::Date => {
            if !DATE_RE.is_match(text) {
                out.push(issue(f.key, "not a valid date", Some("use YYYY-MM-DD")));
            }
        }
        FieldKind::Number { min, max, integer } => {
            let parsed: Option<f64> = if *integer {
                text.parse::<i64>().ok().map(|n| n as f64)
            } else {
                text.parse::<f64>().ok()
            };
            match parsed {
                None => {
                    let what = if *integer { "not a whole number" } else { "not a number" };
                    out.push(issue(f.key, what, None));
                }
                Some(n) => {
                    if let Some(lo) = min {
                        if n < *lo {
                            out.push(issue(f.key, format!("must be at least {lo}"), None));
                        }
                    }
                    if let Some(hi) = max {
                        if n > *hi {
                            out.push(issue(f.key, format!("must be at most {hi}"), None));
                        }
                    }
                }
            }
        }
        FieldKind::Select(options) => {
            if !options.contains(&text) {
                out.push(issue(
                    f.key,
                    format!("must be one of: {}", options.join(", ")),
                    None,
                ));
            }
        }
    }
}

/// Validate a draft against its form. Empty optional fields pass without
/// kind checks.
pub fn validate(form: &FormSpec, draft: &FormDraft) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for f in &form.fields {
        let text = draft.get(f.key).trim();
        if text.is_empty() {
            if f.required {
                out.push(issue(f.key, "required", None));
            }
            continue;
        }
        check_kind(f, text, &mut out);
    }
    out
}

/// Validate an already-assembled JSON payload (the CLI save path). Unknown
/// extra keys pass through untouched.
pub fn validate_payload(form: &FormSpec, payload: &Value) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    for f in &form.fields {
        let text = match payload.get(f.key) {
            None | Some(Value::Null) => {
                if f.required {
                    out.push(issue(f.key, "required", None));
                }
                continue;
            }
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => {
                out.push(issue(
                    f.key,
                    format!("unexpected {} value", json_kind(other)),
                    None,
                ));
                continue;
            }
        };
        let text = text.trim();
        if text.is_empty() {
            if f.required {
                out.push(issue(f.key, "required", None));
            }
            continue;
        }
        check_kind(f, text, &mut out);
    }
    out
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

#[derive(Debug, thiserror::Error)]
#[error("invalid payload ({} issue(s)), first: {}", .issues.len(), first_line(.issues))]
pub struct InvalidPayload {
    pub issues: Vec<ValidationIssue>,
}

fn first_line(issues: &[ValidationIssue]) -> String {
    issues
        .first()
        .map(|i| format!("{}: {}", i.field, i.error))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gate used before any create/update hits the backend.
pub fn ensure_valid(form: &FormSpec, payload: &Value) -> Result<(), InvalidPayload> {
    let issues = validate_payload(form, payload);
    if issues.is_empty() {
        Ok(())
    } else {
        debug!(entity = %form.entity, issues = issues.len(), "payload rejected");
        Err(InvalidPayload { issues })
    }
}

/// Build the request payload from a draft. Numbers are typed, empty
/// optional fields are omitted.
pub fn build_payload(form: &FormSpec, draft: &FormDraft) -> Value {
    let mut map = serde_json::Map::new();
    for f in &form.fields {
        let text = draft.get(f.key).trim();
        if text.is_empty() {
            continue;
        }
        let value = match &f.kind {
            FieldKind::Number { integer: true, .. } => match text.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => continue,
            },
            FieldKind::Number { .. } => match text.parse::<f64>() {
                Ok(n) => match serde_json::Number::from_f64(n) {
                    Some(num) => Value::Number(num),
                    None => continue,
                },
                Err(_) => continue,
            },
            _ => Value::String(text.to_string()),
        };
        map.insert(f.key.to_string(), value);
    }
    Value::Object(map)
}

/// Labels of fields whose draft text differs from the original record.
/// Shown as the edit dialog's change summary.
pub fn diff_fields(form: &FormSpec, original: &Value, draft: &FormDraft) -> Vec<&'static str> {
    let mut out = Vec::new();
    for f in &form.fields {
        let mut before = display_value(original, f.key).unwrap_or_default();
        if matches!(f.kind, FieldKind::Date) {
            before = date_part(&before).to_string();
        }
        if before.trim() != draft.get(f.key).trim() {
            out.push(f.label);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_forms_cover_the_catalog() {
        for entity in desko_core::columns::known_entities() {
            let form = form_for(entity);
            assert!(!form.fields.is_empty(), "{entity} has an empty form");
            assert!(
                form.fields.iter().any(|f| f.required),
                "{entity} has no required field"
            );
            assert!(
                form.fields.iter().all(|f| f.key != "status"),
                "{entity} form must not edit status"
            );
        }
        assert_eq!(form_for("unknown").fields.len(), 1);
    }

    #[test]
    fn required_and_kind_checks() {
        let form = form_for("leads");
        let mut draft = FormDraft::empty(&form);
        let issues = validate(&form, &draft);
        assert!(issues.iter().any(|i| i.field == "name" && i.error == "required"));
        assert!(issues.iter().any(|i| i.field == "email"));
        // phone is optional and empty, never flagged
        assert!(!issues.iter().any(|i| i.field == "phone"));

        draft.set("name", "Ana");
        draft.set("email", "not-an-email");
        draft.set("type", "wholesale");
        draft.set("phone", "abc");
        let issues = validate(&form, &draft);
        assert!(issues.iter().any(|i| i.field == "email"));
        assert!(issues.iter().any(|i| i.field == "type"));
        assert!(issues.iter().any(|i| i.field == "phone"));

        draft.set("email", "ana@acme.io");
        draft.set("type", "sales");
        draft.set("phone", "+1 (555) 123-456");
        assert!(validate(&form, &draft).is_empty());
    }

    #[test]
    fn number_bounds_and_integers() {
        let form = form_for("offers");
        let mut draft = FormDraft::empty(&form);
        draft.set("name", "Spring");
        draft.set("discount_pct", "150");
        let issues = validate(&form, &draft);
        assert!(issues.iter().any(|i| i.field == "discount_pct"));
        draft.set("discount_pct", "15");
        assert!(validate(&form, &draft).is_empty());

        let form = form_for("leaders");
        let mut draft = FormDraft::empty(&form);
        draft.set("name", "Lee");
        draft.set("email", "lee@acme.io");
        draft.set("team_size", "3.5");
        assert!(validate(&form, &draft).iter().any(|i| i.field == "team_size"));
        draft.set("team_size", "4");
        assert!(validate(&form, &draft).is_empty());
    }

    #[test]
    fn date_and_url_formats() {
        let form = form_for("popups");
        let mut draft = FormDraft::empty(&form);
        draft.set("name", "Summer banner");
        draft.set("image_url", "ftp://x");
        draft.set("starts_at", "01/06/2024");
        let issues = validate(&form, &draft);
        assert!(issues.iter().any(|i| i.field == "image_url"));
        assert!(issues.iter().any(|i| i.field == "starts_at"));
        draft.set("image_url", "https://cdn.acme.io/banner.png");
        draft.set("starts_at", "2024-06-01");
        assert!(validate(&form, &draft).is_empty());
    }

    #[test]
    fn payload_is_typed_and_sparse() {
        let form = form_for("products");
        let mut draft = FormDraft::empty(&form);
        draft.set("name", "Desk lamp");
        draft.set("sku", "DL-100");
        draft.set("price", "49.90");
        // stock left empty
        let payload = build_payload(&form, &draft);
        assert_eq!(payload["name"], "Desk lamp");
        assert_eq!(payload["price"], json!(49.90));
        assert!(payload.get("stock").is_none());

        draft.set("stock", "12");
        let payload = build_payload(&form, &draft);
        assert_eq!(payload["stock"], json!(12));
    }

    #[test]
    fn prefill_and_diff() {
        let form = form_for("offers");
        let raw = json!({
            "id": 3,
            "name": "Spring",
            "discount_pct": 15,
            "starts_at": "2024-06-01T00:00:00Z",
            "url": "https://acme.io/spring",
        });
        let mut draft = FormDraft::from_record(&form, &raw);
        assert_eq!(draft.get("starts_at"), "2024-06-01");
        assert_eq!(draft.get("discount_pct"), "15");
        assert!(diff_fields(&form, &raw, &draft).is_empty());

        draft.set("discount_pct", "20");
        draft.set("name", "Spring Sale");
        let changed = diff_fields(&form, &raw, &draft);
        assert_eq!(changed, vec!["Name", "Discount %"]);
    }

    #[test]
    fn payload_validation_for_raw_json() {
        let form = form_for("payments");
        let ok = json!({"reference": "P-1", "method": "card", "amount": 10.0});
        assert!(ensure_valid(&form, &ok).is_ok());

        let bad = json!({"reference": "P-1", "method": "crypto", "amount": "ten"});
        let err = ensure_valid(&form, &bad).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        // arrays are flagged as the wrong shape, not a panic
        let odd = json!({"reference": ["P-1"], "method": "card", "amount": 1});
        assert!(ensure_valid(&form, &odd).is_err());
    }
}
