#![forbid(unsafe_code)]

use desko_core::columns::{CellKind, ColumnKind, ColumnSpec};
use desko_core::LiteRow;

pub mod highlight;

pub(crate) fn render_age(creation_ts: i64) -> String {
    if creation_ts <= 0 {
        return "-".to_string();
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let mut secs = (now - creation_ts).max(0) as u64;
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3600;
    secs %= 3600;
    let mins = secs / 60;
    secs %= 60;
    if days > 0 {
        format!("{}d{}h", days, hours)
    } else if hours > 0 {
        format!("{}h{}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}

/// Display text for one cell. Missing values render empty; `Custom` cells
/// derive their text from the whole record.
pub(crate) fn cell_text(row: &LiteRow, col: &ColumnSpec) -> String {
    if let CellKind::Custom(f) = col.cell {
        return f(&row.raw);
    }
    match col.kind {
        ColumnKind::Name => row.name.clone(),
        ColumnKind::Created => render_age(row.created_ts),
        ColumnKind::Status => row.status.clone().unwrap_or_default(),
        ColumnKind::Projected(id) => row.projected_text(id).unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desko_core::columns::builtin_columns_for;
    use serde_json::json;

    #[test]
    fn age_formats_by_magnitude() {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        assert_eq!(render_age(0), "-");
        assert_eq!(render_age(now - 30), "30s");
        assert_eq!(render_age(now - 3 * 60), "3m");
        assert_eq!(render_age(now - (2 * 3600 + 5 * 60)), "2h5m");
        assert_eq!(render_age(now - (3 * 86_400 + 4 * 3600)), "3d4h");
    }

    #[test]
    fn cell_text_resolves_each_column_kind() {
        let cols = builtin_columns_for("sales");
        let row = LiteRow {
            id: 9,
            name: "SO-1009".into(),
            created_ts: 0,
            status: Some("approved".into()),
            projected: Default::default(),
            raw: json!({"amount": 19.5, "currency": "EUR"}),
        };
        let by_label = |l: &str| cols.iter().find(|c| c.label == l).unwrap();
        assert_eq!(cell_text(&row, by_label("Reference")), "SO-1009");
        assert_eq!(cell_text(&row, by_label("Status")), "approved");
        assert_eq!(cell_text(&row, by_label("Amount")), "19.50 EUR");
        assert_eq!(cell_text(&row, by_label("Created")), "-");
        // projected cell without a projection renders empty
        assert_eq!(cell_text(&row, by_label("Customer")), "");
    }
}
