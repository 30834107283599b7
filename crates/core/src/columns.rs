//! Built-in columns, filters and projectors for the catalog entities.
//!
//! This module provides:
//! - Stable column IDs + specs (labels, widths, cell kinds)
//! - Per-entity filter groups, search keys and status vocabulary
//! - A JSON projector per entity that fills `LiteRow.projected`

#![forbid(unsafe_code)]

use smallvec::SmallVec;

use crate::table::{FilterGroup, StatusWidget};
use crate::{display_value, nested_value, Projector, StatusMapping};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Primary display label (`LiteRow.name`).
    Name,
    /// Relative age rendered from `LiteRow.created_ts`.
    Created,
    /// The entity's status value, rendered per its widget.
    Status,
    Projected(u32),
}

/// Closed set of cell presentations. The rendering switch over these is
/// exhaustive; `Custom` carries a projection-time formatter, not an open
/// UI callback.
#[derive(Clone, Debug, PartialEq)]
pub enum CellKind {
    Text,
    /// Colored pill tinted by the entity's status vocabulary.
    Badge,
    /// Clickable cell; the href is resolved from `url_path` on the record.
    Link { url_path: &'static str },
    /// Cell text is an image URL, rendered as a thumbnail where possible.
    Image,
    /// Derived display text computed from the whole record.
    Custom(fn(&serde_json::Value) -> String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    pub kind: ColumnKind,
    pub cell: CellKind,
    pub label: &'static str,
    pub width: f32,
}

// ---------------- Column IDs (stable) ----------------
// Leads
pub const LEAD_EMAIL: u32 = 10_001;
pub const LEAD_PHONE: u32 = 10_002;
pub const LEAD_TYPE: u32 = 10_003;
pub const LEAD_SOURCE: u32 = 10_004;
pub const LEAD_COUNTRY: u32 = 10_005;

// Sales
pub const SALE_CUSTOMER: u32 = 11_001;
pub const SALE_AMOUNT: u32 = 11_002;
pub const SALE_STAGE: u32 = 11_003;

// Leaders
pub const LEADER_EMAIL: u32 = 12_001;
pub const LEADER_REGION: u32 = 12_002;
pub const LEADER_TEAM: u32 = 12_003;

// Users
pub const USER_EMAIL: u32 = 13_001;
pub const USER_ROLE: u32 = 13_002;
pub const USER_LAST_LOGIN: u32 = 13_003;

// Products
pub const PRODUCT_SKU: u32 = 14_001;
pub const PRODUCT_CATEGORY: u32 = 14_002;
pub const PRODUCT_PRICE: u32 = 14_003;
pub const PRODUCT_STOCK: u32 = 14_004;

// Offers
pub const OFFER_PRODUCT: u32 = 15_001;
pub const OFFER_DISCOUNT: u32 = 15_002;
pub const OFFER_STARTS: u32 = 15_003;
pub const OFFER_ENDS: u32 = 15_004;

// Commissions
pub const COMM_SALE: u32 = 16_001;
pub const COMM_RATE: u32 = 16_002;
pub const COMM_AMOUNT: u32 = 16_003;
pub const COMM_PERIOD: u32 = 16_004;

// Payments
pub const PAY_PAYER: u32 = 17_001;
pub const PAY_METHOD: u32 = 17_002;
pub const PAY_AMOUNT: u32 = 17_003;
pub const PAY_PAID_AT: u32 = 17_004;

// Locations
pub const LOC_CITY: u32 = 18_001;
pub const LOC_COUNTRY: u32 = 18_002;
pub const LOC_ADDRESS: u32 = 18_003;

// Popups
pub const POPUP_IMAGE: u32 = 19_001;
pub const POPUP_STARTS: u32 = 19_002;
pub const POPUP_ENDS: u32 = 19_003;

/// Catalog entity slugs, in nav order.
pub fn known_entities() -> &'static [&'static str] {
    &[
        "leads",
        "sales",
        "leaders",
        "users",
        "products",
        "offers",
        "commissions",
        "payments",
        "locations",
        "popups",
    ]
}

pub fn label_for(entity: &str) -> &'static str {
    match entity {
        "leads" => "Leads",
        "sales" => "Sales",
        "leaders" => "Leaders",
        "users" => "Users",
        "products" => "Products",
        "offers" => "Offers",
        "commissions" => "Commissions",
        "payments" => "Payments",
        "locations" => "Locations",
        "popups" => "Popup promotions",
        _ => "Unknown",
    }
}

/// Dotted path of the record field backing `LiteRow.name`.
pub fn name_path_for(entity: &str) -> &'static str {
    match entity {
        "sales" | "payments" => "reference",
        "commissions" => "agent.name",
        _ => "name",
    }
}

fn name_label_for(entity: &str) -> &'static str {
    match entity {
        "sales" | "payments" => "Reference",
        "commissions" => "Agent",
        "popups" | "offers" => "Title",
        _ => "Name",
    }
}

fn col(kind: ColumnKind, label: &'static str, width: f32) -> ColumnSpec {
    ColumnSpec {
        kind,
        cell: CellKind::Text,
        label,
        width,
    }
}

fn cell(kind: ColumnKind, cellk: CellKind, label: &'static str, width: f32) -> ColumnSpec {
    ColumnSpec {
        kind,
        cell: cellk,
        label,
        width,
    }
}

/// Full column set for a catalog entity: Name, entity columns, Status,
/// Created. Unknown entities fall back to just Name/Status/Created.
pub fn builtin_columns_for(entity: &str) -> Vec<ColumnSpec> {
    let mut cols: Vec<ColumnSpec> = Vec::new();
    let name_label = name_label_for(entity);
    match entity {
        "offers" => cols.push(cell(
            ColumnKind::Name,
            CellKind::Link { url_path: "url" },
            name_label,
            220.0,
        )),
        _ => cols.push(col(ColumnKind::Name, name_label, 200.0)),
    }

    match entity {
        "leads" => {
            cols.push(col(ColumnKind::Projected(LEAD_EMAIL), "Email", 200.0));
            cols.push(col(ColumnKind::Projected(LEAD_PHONE), "Phone", 120.0));
            cols.push(col(ColumnKind::Projected(LEAD_TYPE), "Type", 90.0));
            cols.push(col(ColumnKind::Projected(LEAD_SOURCE), "Source", 110.0));
            cols.push(col(ColumnKind::Projected(LEAD_COUNTRY), "Country", 120.0));
        }
        "sales" => {
            cols.push(col(ColumnKind::Projected(SALE_CUSTOMER), "Customer", 160.0));
            cols.push(cell(
                ColumnKind::Projected(SALE_AMOUNT),
                CellKind::Custom(sale_total),
                "Amount",
                110.0,
            ));
            cols.push(col(ColumnKind::Projected(SALE_STAGE), "Stage", 110.0));
        }
        "leaders" => {
            cols.push(col(ColumnKind::Projected(LEADER_EMAIL), "Email", 200.0));
            cols.push(col(ColumnKind::Projected(LEADER_REGION), "Region", 100.0));
            cols.push(col(ColumnKind::Projected(LEADER_TEAM), "Team", 70.0));
        }
        "users" => {
            cols.push(col(ColumnKind::Projected(USER_EMAIL), "Email", 200.0));
            cols.push(col(ColumnKind::Projected(USER_ROLE), "Role", 100.0));
            cols.push(col(ColumnKind::Projected(USER_LAST_LOGIN), "Last login", 140.0));
        }
        "products" => {
            cols.push(col(ColumnKind::Projected(PRODUCT_SKU), "SKU", 110.0));
            cols.push(col(ColumnKind::Projected(PRODUCT_CATEGORY), "Category", 120.0));
            cols.push(col(ColumnKind::Projected(PRODUCT_PRICE), "Price", 90.0));
            cols.push(col(ColumnKind::Projected(PRODUCT_STOCK), "Stock", 70.0));
        }
        "offers" => {
            cols.push(col(ColumnKind::Projected(OFFER_PRODUCT), "Product", 140.0));
            cols.push(col(ColumnKind::Projected(OFFER_DISCOUNT), "Discount", 90.0));
            cols.push(col(ColumnKind::Projected(OFFER_STARTS), "Starts", 100.0));
            cols.push(col(ColumnKind::Projected(OFFER_ENDS), "Ends", 100.0));
        }
        "commissions" => {
            cols.push(col(ColumnKind::Projected(COMM_SALE), "Sale", 120.0));
            cols.push(col(ColumnKind::Projected(COMM_RATE), "Rate", 80.0));
            cols.push(col(ColumnKind::Projected(COMM_AMOUNT), "Amount", 110.0));
            cols.push(col(ColumnKind::Projected(COMM_PERIOD), "Period", 100.0));
        }
        "payments" => {
            cols.push(col(ColumnKind::Projected(PAY_PAYER), "Payer", 150.0));
            cols.push(col(ColumnKind::Projected(PAY_METHOD), "Method", 100.0));
            cols.push(col(ColumnKind::Projected(PAY_AMOUNT), "Amount", 110.0));
            cols.push(col(ColumnKind::Projected(PAY_PAID_AT), "Paid at", 140.0));
        }
        "locations" => {
            cols.push(col(ColumnKind::Projected(LOC_CITY), "City", 120.0));
            cols.push(col(ColumnKind::Projected(LOC_COUNTRY), "Country", 120.0));
            cols.push(col(ColumnKind::Projected(LOC_ADDRESS), "Address", 200.0));
        }
        "popups" => {
            cols.push(cell(
                ColumnKind::Projected(POPUP_IMAGE),
                CellKind::Image,
                "Image",
                160.0,
            ));
            cols.push(col(ColumnKind::Projected(POPUP_STARTS), "Starts", 100.0));
            cols.push(col(ColumnKind::Projected(POPUP_ENDS), "Ends", 100.0));
        }
        _ => {}
    }

    cols.push(cell(ColumnKind::Status, CellKind::Badge, "Status", 110.0));
    cols.push(col(ColumnKind::Created, "Created", 80.0));
    cols
}

/// Filter groups for a catalog entity; empty for unknown entities (the
/// filter row is hidden entirely then).
pub fn builtin_filters_for(entity: &str) -> Vec<FilterGroup> {
    match entity {
        "leads" => vec![
            FilterGroup::new("status", "Status", &["Active", "inactive"]),
            FilterGroup::new("type", "Type", &["sales", "company"]),
        ],
        "sales" => vec![
            FilterGroup::new("status", "Status", &["pending", "approved", "rejected"]),
            FilterGroup::new("stage", "Stage", &["new", "negotiation", "closed"]),
        ],
        "leaders" => vec![
            FilterGroup::new("status", "Status", &["Active", "inactive"]),
            FilterGroup::new("region", "Region", &["north", "south", "east", "west"]),
        ],
        "users" => vec![
            FilterGroup::labeled("status", "Status", &[("true", "Active"), ("false", "Inactive")]),
            FilterGroup::new("role", "Role", &["admin", "manager", "agent"]),
        ],
        "products" => vec![
            FilterGroup::labeled("status", "Status", &[("true", "Active"), ("false", "Inactive")]),
            FilterGroup::new("category.name", "Category", &["electronics", "apparel", "services"]),
        ],
        "offers" => vec![FilterGroup::new("status", "Status", &["Active", "inactive"])],
        "commissions" => vec![FilterGroup::new("status", "Status", &["pending", "paid"])],
        "payments" => vec![
            FilterGroup::new("status", "Status", &["pending", "confirmed", "failed"]),
            FilterGroup::new("method", "Method", &["card", "transfer", "cash"]),
        ],
        "locations" => vec![FilterGroup::new("status", "Status", &["Active", "inactive"])],
        "popups" => vec![FilterGroup::new("status", "Status", &["Active", "inactive"])],
        _ => Vec::new(),
    }
}

/// Dotted paths searched by the free-text box, in match order.
pub fn builtin_search_keys_for(entity: &str) -> &'static [&'static str] {
    match entity {
        "leads" => &["name", "email", "phone", "country.name"],
        "sales" => &["reference", "customer.name"],
        "leaders" => &["name", "email", "region"],
        "users" => &["name", "email", "role"],
        "products" => &["name", "sku", "category.name"],
        "offers" => &["name", "product.name"],
        "commissions" => &["agent.name", "sale_reference"],
        "payments" => &["reference", "payer.name", "method"],
        "locations" => &["name", "city", "country.name", "address"],
        "popups" => &["name"],
        _ => &[],
    }
}

/// Status vocabulary and widget for a catalog entity.
pub fn builtin_status_for(entity: &str) -> (StatusMapping, StatusWidget) {
    match entity {
        "sales" => (StatusMapping::strings("approved", "rejected"), StatusWidget::Select),
        "users" => (StatusMapping::bools(), StatusWidget::Switch),
        "products" => (StatusMapping::strings("true", "false"), StatusWidget::Switch),
        "commissions" => (StatusMapping::strings("paid", "pending"), StatusWidget::Select),
        "payments" => (StatusMapping::strings("confirmed", "pending"), StatusWidget::Select),
        _ => (StatusMapping::strings("Active", "inactive"), StatusWidget::Switch),
    }
}

/// Which table affordances an entity page renders. Each flag is independent;
/// `show_actions` gates the whole action column even when edit or delete is
/// on by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewFlags {
    pub show_add: bool,
    pub show_edit: bool,
    pub show_delete: bool,
    pub show_actions: bool,
    pub show_filter: bool,
    pub show_row_selection: bool,
    pub show_header_delete: bool,
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self {
            show_add: true,
            show_edit: true,
            show_delete: true,
            show_actions: true,
            show_filter: true,
            show_row_selection: true,
            show_header_delete: true,
        }
    }
}

/// Affordances per catalog entity. Records the backend generates on its own
/// (sales from the order flow, commissions and payments from sales) take no
/// Add button; the financial ones are immutable apart from their status, so
/// Edit is off too. User accounts are excluded from bulk selection.
pub fn builtin_view_for(entity: &str) -> ViewFlags {
    let all = ViewFlags::default();
    match entity {
        "sales" => ViewFlags {
            show_add: false,
            ..all
        },
        "commissions" | "payments" => ViewFlags {
            show_add: false,
            show_edit: false,
            ..all
        },
        "users" => ViewFlags {
            show_row_selection: false,
            show_header_delete: false,
            ..all
        },
        _ => all,
    }
}

/// Return a JSON projector for a catalog entity.
pub fn builtin_projector_for(entity: &str) -> Option<std::sync::Arc<dyn Projector + Send + Sync>> {
    if known_entities().contains(&entity) {
        Some(std::sync::Arc::new(BuiltinProjector {
            entity: entity.to_string(),
        }))
    } else {
        None
    }
}

fn sale_total(raw: &serde_json::Value) -> String {
    let amount = nested_value(raw, "amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
    match nested_value(raw, "currency").and_then(|v| v.as_str()) {
        Some(c) => format!("{amount:.2} {c}"),
        None => format!("{amount:.2}"),
    }
}

/// Trim an ISO 8601 timestamp down to its date part for listing.
fn short_date(s: &str) -> String {
    if s.len() >= 10 && s.as_bytes().get(4) == Some(&b'-') {
        s[..10].to_string()
    } else {
        s.to_string()
    }
}

struct BuiltinProjector {
    entity: String,
}

impl BuiltinProjector {
    fn push(out: &mut SmallVec<[(u32, String); 8]>, id: u32, raw: &serde_json::Value, path: &str) {
        if let Some(v) = display_value(raw, path) {
            out.push((id, v));
        }
    }

    fn push_date(out: &mut SmallVec<[(u32, String); 8]>, id: u32, raw: &serde_json::Value, path: &str) {
        if let Some(v) = display_value(raw, path) {
            out.push((id, short_date(&v)));
        }
    }

    fn project_lead(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, LEAD_EMAIL, raw, "email");
        Self::push(&mut out, LEAD_PHONE, raw, "phone");
        Self::push(&mut out, LEAD_TYPE, raw, "type");
        Self::push(&mut out, LEAD_SOURCE, raw, "source");
        Self::push(&mut out, LEAD_COUNTRY, raw, "country.name");
        out
    }

    fn project_sale(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, SALE_CUSTOMER, raw, "customer.name");
        // SALE_AMOUNT renders through its Custom cell; no projection needed.
        Self::push(&mut out, SALE_STAGE, raw, "stage");
        out
    }

    fn project_leader(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, LEADER_EMAIL, raw, "email");
        Self::push(&mut out, LEADER_REGION, raw, "region");
        Self::push(&mut out, LEADER_TEAM, raw, "team_size");
        out
    }

    fn project_user(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, USER_EMAIL, raw, "email");
        Self::push(&mut out, USER_ROLE, raw, "role");
        Self::push_date(&mut out, USER_LAST_LOGIN, raw, "last_login");
        out
    }

    fn project_product(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, PRODUCT_SKU, raw, "sku");
        Self::push(&mut out, PRODUCT_CATEGORY, raw, "category.name");
        if let Some(p) = nested_value(raw, "price").and_then(|v| v.as_f64()) {
            out.push((PRODUCT_PRICE, format!("{p:.2}")));
        }
        Self::push(&mut out, PRODUCT_STOCK, raw, "stock");
        out
    }

    fn project_offer(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, OFFER_PRODUCT, raw, "product.name");
        if let Some(d) = nested_value(raw, "discount_pct").and_then(|v| v.as_f64()) {
            out.push((OFFER_DISCOUNT, format!("{d:.0}%")));
        }
        Self::push_date(&mut out, OFFER_STARTS, raw, "starts_at");
        Self::push_date(&mut out, OFFER_ENDS, raw, "ends_at");
        out
    }

    fn project_commission(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, COMM_SALE, raw, "sale_reference");
        if let Some(r) = nested_value(raw, "rate_pct").and_then(|v| v.as_f64()) {
            out.push((COMM_RATE, format!("{r:.1}%")));
        }
        if let Some(a) = nested_value(raw, "amount").and_then(|v| v.as_f64()) {
            out.push((COMM_AMOUNT, format!("{a:.2}")));
        }
        Self::push(&mut out, COMM_PERIOD, raw, "period");
        out
    }

    fn project_payment(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, PAY_PAYER, raw, "payer.name");
        Self::push(&mut out, PAY_METHOD, raw, "method");
        if let Some(a) = nested_value(raw, "amount").and_then(|v| v.as_f64()) {
            out.push((PAY_AMOUNT, format!("{a:.2}")));
        }
        Self::push_date(&mut out, PAY_PAID_AT, raw, "paid_at");
        out
    }

    fn project_location(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, LOC_CITY, raw, "city");
        Self::push(&mut out, LOC_COUNTRY, raw, "country.name");
        Self::push(&mut out, LOC_ADDRESS, raw, "address");
        out
    }

    fn project_popup(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        let mut out = SmallVec::new();
        Self::push(&mut out, POPUP_IMAGE, raw, "image_url");
        Self::push_date(&mut out, POPUP_STARTS, raw, "starts_at");
        Self::push_date(&mut out, POPUP_ENDS, raw, "ends_at");
        out
    }
}

impl Projector for BuiltinProjector {
    fn project(&self, raw: &serde_json::Value) -> SmallVec<[(u32, String); 8]> {
        match self.entity.as_str() {
            "leads" => self.project_lead(raw),
            "sales" => self.project_sale(raw),
            "leaders" => self.project_leader(raw),
            "users" => self.project_user(raw),
            "products" => self.project_product(raw),
            "offers" => self.project_offer(raw),
            "commissions" => self.project_commission(raw),
            "payments" => self.project_payment(raw),
            "locations" => self.project_location(raw),
            "popups" => self.project_popup(raw),
            _ => SmallVec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_entity_gets_status_and_created_columns() {
        for ent in known_entities() {
            let cols = builtin_columns_for(ent);
            assert!(cols.iter().any(|c| c.kind == ColumnKind::Status), "{ent}");
            assert!(cols.iter().any(|c| c.kind == ColumnKind::Created), "{ent}");
            assert_eq!(cols[0].kind, ColumnKind::Name, "{ent}");
        }
    }

    #[test]
    fn unknown_entity_falls_back_to_bare_columns() {
        let cols = builtin_columns_for("gadgets");
        assert_eq!(cols.len(), 3);
        assert!(builtin_projector_for("gadgets").is_none());
        assert!(builtin_filters_for("gadgets").is_empty());
        assert!(builtin_search_keys_for("gadgets").is_empty());
    }

    #[test]
    fn lead_projector_fills_nested_country() {
        let p = builtin_projector_for("leads").unwrap();
        let raw = json!({
            "id": 7, "name": "Acme", "email": "a@acme.io", "phone": "555-0101",
            "type": "company", "source": "web", "country": {"name": "Jordan"},
            "status": "Active"
        });
        let cells = p.project(&raw);
        let get = |id: u32| cells.iter().find(|(i, _)| *i == id).map(|(_, v)| v.as_str());
        assert_eq!(get(LEAD_EMAIL), Some("a@acme.io"));
        assert_eq!(get(LEAD_COUNTRY), Some("Jordan"));
        assert_eq!(get(LEAD_TYPE), Some("company"));
    }

    #[test]
    fn offer_projector_formats_discount_and_dates() {
        let p = builtin_projector_for("offers").unwrap();
        let raw = json!({
            "id": 1, "name": "Summer", "product": {"name": "Widget"},
            "discount_pct": 15.0, "starts_at": "2025-06-01T00:00:00Z",
            "ends_at": "2025-08-31", "url": "https://shop.example/offers/1"
        });
        let cells = p.project(&raw);
        let get = |id: u32| cells.iter().find(|(i, _)| *i == id).map(|(_, v)| v.as_str());
        assert_eq!(get(OFFER_DISCOUNT), Some("15%"));
        assert_eq!(get(OFFER_STARTS), Some("2025-06-01"));
        assert_eq!(get(OFFER_ENDS), Some("2025-08-31"));
    }

    #[test]
    fn sale_amount_renders_through_its_custom_cell() {
        let cols = builtin_columns_for("sales");
        let amount = cols
            .iter()
            .find(|c| c.kind == ColumnKind::Projected(SALE_AMOUNT))
            .unwrap();
        match amount.cell {
            CellKind::Custom(f) => {
                let raw = json!({"amount": 1250.5, "currency": "USD"});
                assert_eq!(f(&raw), "1250.50 USD");
                assert_eq!(f(&json!({"amount": 3})), "3.00");
            }
            _ => panic!("sale amount should be a custom cell"),
        }
    }

    #[test]
    fn status_vocabulary_per_entity() {
        let (m, w) = builtin_status_for("leads");
        assert!(m.is_on(&json!("Active")));
        assert_eq!(w, StatusWidget::Switch);

        let (m, w) = builtin_status_for("users");
        assert!(m.is_on(&json!(true)));
        assert_eq!(w, StatusWidget::Switch);

        let (m, w) = builtin_status_for("sales");
        assert!(m.is_on(&json!("approved")));
        assert_eq!(w, StatusWidget::Select);
    }

    #[test]
    fn view_flags_hide_add_for_generated_records() {
        assert_eq!(builtin_view_for("leads"), ViewFlags::default());
        assert!(!builtin_view_for("sales").show_add);
        assert!(builtin_view_for("sales").show_edit);
        let commissions = builtin_view_for("commissions");
        assert!(!commissions.show_add);
        assert!(!commissions.show_edit);
        assert!(commissions.show_delete);
        let users = builtin_view_for("users");
        assert!(!users.show_row_selection);
        assert!(!users.show_header_delete);
        assert!(users.show_add);
    }
}
