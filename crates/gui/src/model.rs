#![forbid(unsafe_code)]

use std::sync::mpsc;
use std::time::Instant;

use desko_api::{EntityKind, SaveOutcome, SavedPayload};
use desko_core::columns::{ColumnSpec, ViewFlags};
use desko_core::table::{
    FilterGroup, FilterState, OptimisticEdit, Pager, SelectionSet, StatusWidget,
};
use desko_core::{LiteRow, RowId, StatusMapping};
use desko_schema::{FormDraft, FormSpec, ValidationIssue};
use tokio::task::JoinHandle;

/// Messages background tasks push at the frame loop.
#[derive(Debug)]
pub enum UiUpdate {
    Snapshot(Vec<LiteRow>),
    Epoch(u64),
    Error(String),
    Detail { id: RowId, text: String },
    DetailError(String),
    SavedList { id: RowId, items: Vec<SavedPayload> },
    SaveDone { outcome: SaveOutcome },
    SaveError(String),
    /// A mutation with an optimistic edit finished; the token resolves the
    /// stashed edit.
    OpDone { token: u64, message: String },
    OpError { token: u64, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warn,
    Error,
}

pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub created: Instant,
    pub duration_ms: u64,
}

#[derive(Default)]
pub struct DiscoveryState {
    pub kinds: Vec<EntityKind>,
    pub rx: Option<mpsc::Receiver<Result<Vec<EntityKind>, String>>>,
}

#[derive(Default)]
pub struct SelectionState {
    /// Entity slug selected in the nav.
    pub entity: Option<String>,
}

#[derive(Default)]
pub struct WatchState {
    pub task: Option<JoinHandle<()>>,
    pub stop: Option<tokio::sync::oneshot::Sender<()>>,
    pub updates_rx: Option<mpsc::Receiver<UiUpdate>>,
    pub updates_tx: Option<mpsc::Sender<UiUpdate>>,
    pub loaded_entity: Option<String>,
    pub select_t0: Option<Instant>,
    pub ttfr_logged: bool,
}

/// Everything the table view needs for the selected entity: the row
/// snapshot plus the per-entity descriptor (columns, search keys, filter
/// groups, status vocabulary) and the view state layered on top.
pub struct ResultsState {
    pub rows: Vec<LiteRow>,
    pub epoch: Option<u64>,
    pub columns: Vec<ColumnSpec>,
    pub search_keys: &'static [&'static str],
    pub filter_groups: Vec<FilterGroup>,
    pub filters: FilterState,
    pub search_text: String,
    pub prev_search: String,
    pub search_focus: bool,
    pub pager: Pager,
    pub selection: SelectionSet,
    pub status_mapping: StatusMapping,
    pub status_widget: StatusWidget,
    pub view: ViewFlags,
    pub sort_col: Option<usize>,
    pub sort_asc: bool,
    pub soft_cap: usize,
    pub loading: bool,
}

impl Default for ResultsState {
    fn default() -> Self {
        let per_page = std::env::var("DESKO_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(10);
        let soft_cap = std::env::var("DESKO_RESULTS_SOFT_CAP")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(50_000);
        Self {
            rows: Vec::new(),
            epoch: None,
            columns: Vec::new(),
            search_keys: &[],
            filter_groups: Vec::new(),
            filters: FilterState::default(),
            search_text: String::new(),
            prev_search: String::new(),
            search_focus: false,
            pager: Pager::new(per_page),
            selection: SelectionSet::default(),
            status_mapping: StatusMapping::default(),
            status_widget: StatusWidget::Switch,
            view: ViewFlags::default(),
            sort_col: None,
            sort_asc: true,
            soft_cap,
            loading: false,
        }
    }
}

#[derive(Default)]
pub struct DetailsState {
    pub selected: Option<RowId>,
    /// Record rendered as YAML.
    pub buffer: String,
    /// Recently accepted payloads for the selected record, newest first.
    pub saved: Vec<SavedPayload>,
    pub task: Option<JoinHandle<()>>,
    pub stop: Option<tokio::sync::oneshot::Sender<()>>,
}

/// Edit dialog state. `None` id means create; the form and draft are the
/// subject, so the dialog can never render without one.
pub struct EditorState {
    pub entity: String,
    pub id: Option<RowId>,
    pub form: FormSpec,
    pub draft: FormDraft,
    /// Record as fetched, for the field-diff line. Null when creating.
    pub original: serde_json::Value,
    pub issues: Vec<ValidationIssue>,
    pub saving: bool,
}

/// Delete confirmation state; `label` names the target ("lead Acme" or
/// "3 rows").
pub struct ConfirmDelete {
    pub entity: String,
    pub ids: Vec<RowId>,
    pub label: String,
    pub busy: bool,
    /// Token of the in-flight delete, once confirmed.
    pub token: Option<u64>,
}

/// Optimistic edits for in-flight mutations, keyed by task token. Success
/// drops the stash; failure rolls it back into the row vector.
#[derive(Default)]
pub struct PendingOps {
    next_token: u64,
    entries: Vec<(u64, Option<RowId>, OptimisticEdit)>,
}

impl PendingOps {
    pub fn stash(&mut self, row: Option<RowId>, edit: OptimisticEdit) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        self.entries.push((token, row, edit));
        token
    }

    pub fn take(&mut self, token: u64) -> Option<OptimisticEdit> {
        let pos = self.entries.iter().position(|(t, _, _)| *t == token)?;
        Some(self.entries.remove(pos).2)
    }

    /// A mutation for this row is still in flight.
    pub fn row_busy(&self, id: RowId) -> bool {
        self.entries.iter().any(|(_, r, _)| *r == Some(id))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct PaletteItem {
    /// Entity slug this item jumps to.
    pub entity: String,
    /// Row to select after the jump; `None` switches entity only.
    pub id: Option<RowId>,
    pub score: f32,
    pub primary: String,
    pub hi_indices: Vec<usize>,
    pub secondary: String,
}

#[derive(Default)]
pub struct PaletteState {
    pub open: bool,
    pub query: String,
    pub results: Vec<PaletteItem>,
    pub sel: Option<usize>,
    pub changed_at: Option<Instant>,
    pub debounce_ms: u64,
    pub need_focus: bool,
    pub width_hint: f32,
}

#[derive(Default)]
pub struct UiDebounce {
    pub ms: u64,
    pub pending_count: usize,
    pub pending_since: Option<Instant>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: RowId) -> LiteRow {
        LiteRow {
            id,
            name: format!("row-{id}"),
            created_ts: 0,
            status: Some("Active".into()),
            projected: Default::default(),
            raw: json!({"id": id, "status": "Active"}),
        }
    }

    #[test]
    fn pending_ops_roundtrip_and_row_busy() {
        let mut rows = vec![row(1), row(2)];
        let mut pending = PendingOps::default();
        let edit = OptimisticEdit::apply(
            &mut rows,
            |r| r.id == 2,
            |r| r.status = Some("inactive".into()),
        );
        let token = pending.stash(Some(2), edit);
        assert!(pending.row_busy(2));
        assert!(!pending.row_busy(1));

        let edit = pending.take(token).unwrap();
        assert!(pending.take(token).is_none());
        edit.rollback(&mut rows);
        assert_eq!(rows[1].status.as_deref(), Some("Active"));
        assert!(pending.is_empty());
    }
}
