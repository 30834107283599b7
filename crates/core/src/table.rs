//! Table view state: filter groups, pagination, bulk selection, optimistic
//! edits. All of it is synchronous over a row snapshot; the GUI and CLI both
//! drive the same state machine.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{LiteRow, RowId};

/// Reserved filter-option value meaning "do not constrain by this group".
pub const FILTER_ALL: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// A named, closed set of selectable values narrowing the visible row set by
/// equality on a dotted-path field. Options always lead with the `"all"`
/// sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterGroup {
    /// Dotted path resolved against the row record.
    pub key: String,
    pub label: String,
    pub options: Vec<FilterOption>,
}

impl FilterGroup {
    /// Build a group from raw values; labels are the values with the first
    /// letter upper-cased, and the `"all"` sentinel is prepended.
    pub fn new(key: &str, label: &str, values: &[&str]) -> Self {
        let mut options = Vec::with_capacity(values.len() + 1);
        options.push(FilterOption {
            value: FILTER_ALL.into(),
            label: "All".into(),
        });
        for v in values {
            options.push(FilterOption {
                value: (*v).into(),
                label: title_case(v),
            });
        }
        Self {
            key: key.into(),
            label: label.into(),
            options,
        }
    }

    /// Build a group from explicit `(value, label)` pairs; the `"all"`
    /// sentinel is still prepended.
    pub fn labeled(key: &str, label: &str, pairs: &[(&str, &str)]) -> Self {
        let mut options = Vec::with_capacity(pairs.len() + 1);
        options.push(FilterOption {
            value: FILTER_ALL.into(),
            label: "All".into(),
        });
        for (v, l) in pairs {
            options.push(FilterOption {
                value: (*v).into(),
                label: (*l).into(),
            });
        }
        Self {
            key: key.into(),
            label: label.into(),
            options,
        }
    }

    /// Options minus the sentinel; the status select widget is sourced from
    /// these.
    pub fn real_options(&self) -> impl Iterator<Item = &FilterOption> {
        self.options.iter().filter(|o| o.value != FILTER_ALL)
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Active choice per filter group. Exactly one selected value per group,
/// defaulting to the sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    selected: Vec<(String, String)>,
}

impl FilterState {
    pub fn reset(&mut self, groups: &[FilterGroup]) {
        self.selected = groups
            .iter()
            .map(|g| (g.key.clone(), FILTER_ALL.to_string()))
            .collect();
    }

    pub fn get(&self, key: &str) -> &str {
        self.selected
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or(FILTER_ALL)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.selected.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.selected.push((key.to_string(), value.to_string())),
        }
    }

    /// Non-sentinel `(key, value)` pairs, in group order.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selected
            .iter()
            .filter(|(_, v)| v != FILTER_ALL)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_constrained(&self) -> bool {
        self.active().next().is_some()
    }
}

/// How the status cell is rendered and mutated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusWidget {
    /// Binary toggle emitting the entity's `StatusMapping` values.
    Switch,
    /// Dropdown sourced from the `"status"` filter group's real options,
    /// emitting the selected string.
    Select,
}

/// 1-based pagination over a filtered row count with a fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page: usize,
    pub per_page: usize,
}

impl Pager {
    pub fn new(per_page: usize) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
        }
    }

    pub fn total_pages(&self, filtered: usize) -> usize {
        filtered.div_ceil(self.per_page)
    }

    /// Pull the page back into `[1, max(total_pages, 1)]`. Called whenever the
    /// filtered count changes; an empty result set lands on page 1.
    pub fn clamp(&mut self, filtered: usize) {
        let last = self.total_pages(filtered).max(1);
        if self.page > last {
            self.page = last;
        }
        if self.page == 0 {
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize, filtered: usize) {
        self.page = page;
        self.clamp(filtered);
    }

    /// Index range of the current page within the filtered sequence,
    /// 0-based half-open.
    pub fn range(&self, filtered: usize) -> Range<usize> {
        let start = (self.page.saturating_sub(1)) * self.per_page;
        let start = start.min(filtered);
        let end = (start + self.per_page).min(filtered);
        start..end
    }
}

/// Bulk-selection over row ids. Select-all covers one page at a time, never
/// the full filtered set; refresh pruning keeps only ids still present.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: BTreeSet<RowId>,
}

impl SelectionSet {
    pub fn is_selected(&self, id: RowId) -> bool {
        self.ids.contains(&id)
    }

    pub fn toggle(&mut self, id: RowId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn select_page<I: IntoIterator<Item = RowId>>(&mut self, page_ids: I) {
        self.ids.extend(page_ids);
    }

    pub fn deselect_page<I: IntoIterator<Item = RowId>>(&mut self, page_ids: I) {
        for id in page_ids {
            self.ids.remove(&id);
        }
    }

    pub fn page_fully_selected<I: IntoIterator<Item = RowId>>(&self, page_ids: I) -> bool {
        let mut any = false;
        for id in page_ids {
            any = true;
            if !self.ids.contains(&id) {
                return false;
            }
        }
        any
    }

    /// Drop ids no longer present in the refreshed row set.
    pub fn prune_missing(&mut self, rows: &[LiteRow]) {
        let present: BTreeSet<RowId> = rows.iter().map(|r| r.id).collect();
        self.ids.retain(|id| present.contains(id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order.
    pub fn ids(&self) -> Vec<RowId> {
        self.ids.iter().copied().collect()
    }
}

/// Snapshot/rollback guard for optimistic mutations. Apply the local change
/// before the request flies; roll back the recorded originals if it fails.
/// One implementation shared by the toggle, status-select and delete flows.
#[derive(Debug, Clone, Default)]
pub struct OptimisticEdit {
    saved: Vec<(usize, LiteRow)>,
}

impl OptimisticEdit {
    /// Update every row matching `pred` in place, recording the originals.
    pub fn apply<P, U>(rows: &mut [LiteRow], pred: P, update: U) -> Self
    where
        P: Fn(&LiteRow) -> bool,
        U: Fn(&mut LiteRow),
    {
        let mut saved = Vec::new();
        for (idx, row) in rows.iter_mut().enumerate() {
            if pred(row) {
                saved.push((idx, row.clone()));
                update(row);
            }
        }
        Self { saved }
    }

    /// Remove every row matching `pred`, recording originals and positions.
    pub fn remove<P>(rows: &mut Vec<LiteRow>, pred: P) -> Self
    where
        P: Fn(&LiteRow) -> bool,
    {
        let mut saved = Vec::new();
        let mut idx = 0usize;
        rows.retain(|row| {
            let keep = !pred(row);
            if !keep {
                saved.push((idx, row.clone()));
            }
            idx += 1;
            keep
        });
        Self { saved }
    }

    /// Restore the recorded originals. Rows still present (by id) are
    /// overwritten in place; removed rows are re-inserted at their old
    /// position, clamped to the current length. Safe to call after the row
    /// vector was replaced by a refresh in between.
    pub fn rollback(self, rows: &mut Vec<LiteRow>) {
        for (idx, original) in self.saved {
            match rows.iter().position(|r| r.id == original.id) {
                Some(pos) => rows[pos] = original,
                None => {
                    let at = idx.min(rows.len());
                    rows.insert(at, original);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    pub fn touched(&self) -> usize {
        self.saved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallvec::SmallVec;

    fn row(id: RowId, name: &str) -> LiteRow {
        LiteRow {
            id,
            name: name.to_string(),
            created_ts: 0,
            status: Some("Active".into()),
            projected: SmallVec::new(),
            raw: json!({"id": id, "name": name, "status": "Active"}),
        }
    }

    fn rows(n: usize) -> Vec<LiteRow> {
        (0..n).map(|i| row(i as RowId, &format!("row-{i}"))).collect()
    }

    #[test]
    fn pager_total_pages_is_ceil() {
        let p = Pager::new(10);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(1), 1);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
        assert_eq!(p.total_pages(25), 3);
    }

    #[test]
    fn pager_range_slices_the_filtered_sequence() {
        let mut p = Pager::new(10);
        p.set_page(2, 25);
        assert_eq!(p.range(25), 10..20);
        p.set_page(3, 25);
        assert_eq!(p.range(25), 20..25);
    }

    #[test]
    fn pager_clamps_after_shrink() {
        let mut p = Pager::new(10);
        p.set_page(3, 25);
        assert_eq!(p.page, 3);
        // filter narrows to 12 rows: page 3 no longer exists
        p.clamp(12);
        assert_eq!(p.page, 2);
        // empty result set lands on page 1
        p.clamp(0);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn pager_rejects_out_of_range_requests() {
        let mut p = Pager::new(10);
        p.set_page(99, 25);
        assert_eq!(p.page, 3);
        p.set_page(0, 25);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn filter_group_always_leads_with_the_sentinel() {
        let g = FilterGroup::new("status", "Status", &["Active", "inactive"]);
        assert_eq!(g.options[0].value, FILTER_ALL);
        assert_eq!(g.real_options().count(), 2);
    }

    #[test]
    fn filter_state_defaults_to_all_and_tracks_changes() {
        let groups = vec![
            FilterGroup::new("status", "Status", &["Active", "inactive"]),
            FilterGroup::new("type", "Type", &["sales", "company"]),
        ];
        let mut st = FilterState::default();
        st.reset(&groups);
        assert_eq!(st.get("status"), FILTER_ALL);
        assert!(!st.is_constrained());

        st.set("type", "sales");
        assert_eq!(st.get("type"), "sales");
        let active: Vec<_> = st.active().collect();
        assert_eq!(active, vec![("type", "sales")]);
    }

    #[test]
    fn select_all_is_scoped_to_the_current_page() {
        let data = rows(25);
        let pager = {
            let mut p = Pager::new(10);
            p.set_page(2, data.len());
            p
        };
        let mut sel = SelectionSet::default();
        let page_ids: Vec<RowId> = data[pager.range(data.len())].iter().map(|r| r.id).collect();
        sel.select_page(page_ids.clone());
        assert_eq!(sel.len(), 10);
        assert!(sel.is_selected(10));
        assert!(sel.is_selected(19));
        assert!(!sel.is_selected(0));
        assert!(!sel.is_selected(20));
        assert!(sel.page_fully_selected(page_ids.iter().copied()));
    }

    #[test]
    fn deselect_page_leaves_other_pages_alone() {
        let mut sel = SelectionSet::default();
        sel.select_page(0..20);
        sel.deselect_page(10..20);
        assert_eq!(sel.len(), 10);
        assert!(sel.is_selected(5));
        assert!(!sel.is_selected(15));
    }

    #[test]
    fn selection_pruned_to_surviving_ids_on_refresh() {
        let mut sel = SelectionSet::default();
        sel.select_page([1, 2, 3]);
        let refreshed = vec![row(2, "two"), row(3, "three"), row(9, "nine")];
        sel.prune_missing(&refreshed);
        assert_eq!(sel.ids(), vec![2, 3]);
    }

    #[test]
    fn optimistic_apply_then_rollback_restores_originals() {
        let mut data = rows(5);
        let before = data.clone();
        let edit = OptimisticEdit::apply(
            &mut data,
            |r| r.id == 3,
            |r| r.status = Some("inactive".into()),
        );
        assert_eq!(edit.touched(), 1);
        assert_eq!(data[3].status.as_deref(), Some("inactive"));
        edit.rollback(&mut data);
        assert_eq!(data, before);
    }

    #[test]
    fn optimistic_remove_then_rollback_reinserts_in_place() {
        let mut data = rows(5);
        let before = data.clone();
        let edit = OptimisticEdit::remove(&mut data, |r| r.id == 1 || r.id == 3);
        assert_eq!(data.len(), 3);
        edit.rollback(&mut data);
        assert_eq!(data, before);
    }

    #[test]
    fn rollback_survives_a_refresh_in_between() {
        let mut data = rows(3);
        let edit = OptimisticEdit::apply(
            &mut data,
            |r| r.id == 1,
            |r| r.status = Some("inactive".into()),
        );
        // a refresh replaced the vector and dropped row 1 entirely
        let mut refreshed = vec![row(0, "row-0"), row(2, "row-2")];
        edit.rollback(&mut refreshed);
        assert_eq!(refreshed.len(), 3);
        assert_eq!(refreshed[1].id, 1);
        assert_eq!(refreshed[1].status.as_deref(), Some("Active"));
    }
}
