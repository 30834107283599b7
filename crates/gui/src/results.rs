#![forbid(unsafe_code)]

use eframe::egui;
use egui_table::{CellInfo, Column, HeaderCellInfo, HeaderRow, Table, TableDelegate};
use tracing::info;

use desko_core::columns::{CellKind, ColumnKind, ColumnSpec};
use desko_core::table::StatusWidget;
use desko_core::{display_value, LiteRow, RowId};
use desko_search::visible_indices;

use crate::model::ToastKind;
use crate::util::cell_text;
use super::DeskoGuiApp;

impl DeskoGuiApp {
    pub(crate) fn ui_results(&mut self, ui: &mut egui::Ui) {
        if self.selection.entity.is_none() {
            ui.add_space(8.0);
            ui.label(
                egui::RichText::new("Select an entity to load rows")
                    .italics()
                    .weak(),
            );
            return;
        }
        self.ui_results_toolbar(ui);
        self.ui_filter_row(ui);

        // A changed query always lands back on page 1.
        if self.results.search_text != self.results.prev_search {
            self.results.prev_search = self.results.search_text.clone();
            self.results.pager.page = 1;
        }

        let mut visible = visible_indices(
            &self.results.rows,
            self.results.search_keys,
            &self.results.search_text,
            &self.results.filters,
        );
        // Header-click sorting over display text; no sort column means
        // insertion order.
        if let Some(col) = self.results.sort_col {
            if let Some(spec) = self.results.columns.get(col).cloned() {
                let rows = &self.results.rows;
                let mut keyed: Vec<(String, usize)> = visible
                    .iter()
                    .map(|&i| {
                        let key = match spec.kind {
                            ColumnKind::Created => format!("{:020}", rows[i].created_ts),
                            _ => cell_text(&rows[i], &spec).to_lowercase(),
                        };
                        (key, i)
                    })
                    .collect();
                if self.results.sort_asc {
                    keyed.sort_by(|a, b| a.0.cmp(&b.0));
                } else {
                    keyed.sort_by(|a, b| b.0.cmp(&a.0));
                }
                visible = keyed.into_iter().map(|(_, i)| i).collect();
            }
        }
        let filtered = visible.len();
        self.results.pager.clamp(filtered);

        if self.results.rows.is_empty() {
            if self.results.loading {
                ui.add(egui::Spinner::new());
            } else {
                ui.add_space(8.0);
                ui.label(egui::RichText::new("No rows").italics().weak());
            }
            return;
        }
        if self.results.rows.len() > self.results.soft_cap {
            ui.add_space(2.0);
            ui.colored_label(
                ui.visuals().warn_fg_color,
                format!(
                    "Large result set: {} rows held, soft cap {}. Narrow with search or filters.",
                    self.results.rows.len(),
                    self.results.soft_cap
                ),
            );
        }
        if filtered == 0 {
            ui.add_space(8.0);
            ui.label(egui::RichText::new("No matches").italics().weak());
            return;
        }

        let range = self.results.pager.range(filtered);
        let page_ix: Vec<usize> = visible[range].to_vec();
        let page_ids: Vec<RowId> = page_ix.iter().map(|&i| self.results.rows[i].id).collect();
        let specs = self.results.columns.clone();
        let view = self.results.view;
        let has_select = view.show_row_selection;
        let has_actions = view.show_actions && (view.show_edit || view.show_delete);

        // Optional leading checkbox column, descriptor columns, optional
        // trailing actions.
        let mut cols: Vec<Column> = Vec::with_capacity(specs.len() + 2);
        if has_select {
            cols.push(Column::new(28.0).resizable(false));
        }
        for c in &specs {
            cols.push(Column::new(c.width).resizable(true));
        }
        if has_actions {
            cols.push(Column::new(110.0).resizable(false));
        }

        let rows_len = page_ix.len() as u64;
        let mut delegate = ResultsDelegate {
            app: self,
            page_ix,
            page_ids,
            specs,
            has_select,
            has_actions,
        };
        Table::new()
            .id_salt("results_table")
            .headers(vec![HeaderRow::new(20.0)])
            .num_rows(rows_len)
            .columns(cols)
            .show(ui, &mut delegate);

        self.ui_pagination(ui, filtered);
    }

    fn ui_results_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Search:");
            let te = egui::TextEdit::singleline(&mut self.results.search_text)
                .hint_text("substring across the entity's search fields")
                .desired_width(260.0);
            let re = ui.add(te);
            if self.results.search_focus {
                re.request_focus();
                self.results.search_focus = false;
            }
            if !self.results.search_text.is_empty()
                && ui.button("×").on_hover_text("Clear search").clicked()
            {
                self.results.search_text.clear();
            }
            ui.separator();
            let shown = visible_indices(
                &self.results.rows,
                self.results.search_keys,
                &self.results.search_text,
                &self.results.filters,
            )
            .len();
            ui.label(format!("Showing {} of {}", shown, self.results.rows.len()));
            ui.separator();
            let view = self.results.view;
            if view.show_add && ui.button("Add").clicked() {
                self.open_editor(None);
            }
            let sel_n = self.results.selection.len();
            if view.show_header_delete
                && sel_n > 0
                && ui.button(format!("Delete ({})", sel_n)).clicked()
            {
                self.confirm_selection_delete();
            }
            if ui
                .button("Export")
                .on_hover_text("Write the filtered rows to a CSV file")
                .clicked()
            {
                self.export_csv();
            }
        });
    }

    fn ui_filter_row(&mut self, ui: &mut egui::Ui) {
        if !self.results.view.show_filter || self.results.filter_groups.is_empty() {
            return;
        }
        ui.horizontal(|ui| {
            let groups = self.results.filter_groups.clone();
            for g in &groups {
                let current = self.results.filters.get(&g.key).to_string();
                let current_label = g
                    .options
                    .iter()
                    .find(|o| o.value == current)
                    .map(|o| o.label.clone())
                    .unwrap_or_else(|| current.clone());
                egui::ComboBox::from_id_salt(("results_filter", g.key.clone()))
                    .selected_text(format!("{}: {}", g.label, current_label))
                    .show_ui(ui, |ui| {
                        for opt in &g.options {
                            let is_sel = opt.value == current;
                            if ui.selectable_label(is_sel, &opt.label).clicked() && !is_sel {
                                self.results.filters.set(&g.key, &opt.value);
                                self.results.pager.page = 1;
                            }
                        }
                    });
            }
        });
    }

    fn ui_pagination(&mut self, ui: &mut egui::Ui, filtered: usize) {
        let pager = self.results.pager;
        let total_pages = pager.total_pages(filtered).max(1);
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(pager.page > 1, egui::Button::new("Prev").small())
                .clicked()
            {
                self.results.pager.set_page(pager.page - 1, filtered);
            }
            // Window of five page buttons around the current page.
            let end = (pager.page + 2).min(total_pages).max(5.min(total_pages));
            let start = end.saturating_sub(4).max(1);
            for p in start..=end {
                if ui
                    .selectable_label(p == pager.page, p.to_string())
                    .clicked()
                {
                    self.results.pager.set_page(p, filtered);
                }
            }
            if ui
                .add_enabled(pager.page < total_pages, egui::Button::new("Next").small())
                .clicked()
            {
                self.results.pager.set_page(pager.page + 1, filtered);
            }
            ui.separator();
            ui.weak(format!("page {} of {}", pager.page, total_pages));
        });
    }

    fn export_csv(&mut self) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .set_title("Export rows as CSV")
            .set_file_name(format!("{}.csv", entity))
            .save_file()
        else {
            return;
        };
        let visible = visible_indices(
            &self.results.rows,
            self.results.search_keys,
            &self.results.search_text,
            &self.results.filters,
        );
        let specs = self.results.columns.clone();
        let res = (|| -> Result<(), csv::Error> {
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(specs.iter().map(|c| c.label))?;
            for &i in &visible {
                let row = &self.results.rows[i];
                writer.write_record(specs.iter().map(|c| cell_text(row, c)))?;
            }
            writer.flush()?;
            Ok(())
        })();
        match res {
            Ok(()) => {
                info!(entity = %entity, rows = visible.len(), path = %path.display(), "ui: csv export ok");
                self.toast(format!("exported {} rows", visible.len()), ToastKind::Success);
            }
            Err(e) => {
                self.last_error = Some(format!("export: {}", e));
                self.toast(format!("export: {}", e), ToastKind::Error);
            }
        }
    }
}

struct ResultsDelegate<'a> {
    app: &'a mut DeskoGuiApp,
    /// Row indices of the current page, in display order.
    page_ix: Vec<usize>,
    page_ids: Vec<RowId>,
    specs: Vec<ColumnSpec>,
    /// Whether the leading checkbox column is rendered for this entity.
    has_select: bool,
    /// Whether the trailing actions column is rendered for this entity.
    has_actions: bool,
}

impl<'a> ResultsDelegate<'a> {
    fn status_cell(&mut self, ui: &mut egui::Ui, row: &LiteRow) {
        let id = row.id;
        let busy = self.app.pending.row_busy(id);
        match self.app.results.status_widget {
            StatusWidget::Switch => {
                let on = row.status_is_on(&self.app.results.status_mapping);
                let text = row.status.clone().unwrap_or_default();
                let resp = ui.add_enabled(
                    !busy,
                    egui::SelectableLabel::new(on, egui::RichText::new(text).monospace()),
                );
                if resp.on_hover_text("Toggle status").clicked() {
                    let next = if on {
                        self.app.results.status_mapping.off.clone()
                    } else {
                        self.app.results.status_mapping.on.clone()
                    };
                    self.app.start_status_task(id, next);
                }
            }
            StatusWidget::Select => {
                let current = row.status.clone().unwrap_or_default();
                // Choices come from the status filter group, sentinel excluded.
                let options: Vec<(String, String)> = self
                    .app
                    .results
                    .filter_groups
                    .iter()
                    .find(|g| g.key == "status")
                    .map(|g| {
                        g.real_options()
                            .map(|o| (o.value.clone(), o.label.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let app = &mut *self.app;
                ui.add_enabled_ui(!busy, |ui| {
                    egui::ComboBox::from_id_salt(("row_status", id))
                        .selected_text(current.clone())
                        .show_ui(ui, |ui| {
                            for (value, label) in &options {
                                let is_sel = current.eq_ignore_ascii_case(value);
                                if ui.selectable_label(is_sel, label).clicked() && !is_sel {
                                    app.start_status_task(
                                        id,
                                        serde_json::Value::String(value.clone()),
                                    );
                                }
                            }
                        });
                });
            }
        }
    }
}

impl<'a> TableDelegate for ResultsDelegate<'a> {
    fn prepare(&mut self, _info: &egui_table::PrefetchInfo) {}

    fn header_cell_ui(&mut self, ui: &mut egui::Ui, cell: &HeaderCellInfo) {
        if cell.row_nr != 0 {
            return;
        }
        let rect = ui.max_rect();
        let bg = ui.visuals().widgets.inactive.bg_fill;
        ui.painter().rect_filled(rect, 0.0, bg);
        let col_nr = cell.col_range.start as usize;
        if self.has_select && col_nr == 0 {
            // Select-all covers the current page only.
            let all = self
                .app
                .results
                .selection
                .page_fully_selected(self.page_ids.iter().copied());
            let mut checked = all;
            if ui.checkbox(&mut checked, "").changed() {
                if all {
                    self.app
                        .results
                        .selection
                        .deselect_page(self.page_ids.iter().copied());
                } else {
                    self.app
                        .results
                        .selection
                        .select_page(self.page_ids.iter().copied());
                }
            }
            return;
        }
        let Some(col_idx) = col_nr
            .checked_sub(self.has_select as usize)
            .filter(|i| *i < self.specs.len())
        else {
            return; // actions column has no header
        };
        let label = self.specs[col_idx].label;
        if label.is_empty() {
            return;
        }
        ui.add_space(2.0);
        let is_sorted = self.app.results.sort_col == Some(col_idx);
        let mut text = label.to_string();
        if is_sorted {
            text.push_str(if self.app.results.sort_asc { " ↑" } else { " ↓" });
        }
        let resp = ui.selectable_label(is_sorted, egui::RichText::new(text).strong());
        if resp.clicked() {
            if is_sorted {
                self.app.results.sort_asc = !self.app.results.sort_asc;
            } else {
                self.app.results.sort_col = Some(col_idx);
                self.app.results.sort_asc = true;
            }
        }
    }

    fn cell_ui(&mut self, ui: &mut egui::Ui, cell: &CellInfo) {
        let page_row = cell.row_nr as usize;
        let Some(&real_idx) = self.page_ix.get(page_row) else {
            return;
        };
        let Some(row) = self.app.results.rows.get(real_idx).cloned() else {
            return;
        };
        let id = row.id;
        let is_sel = self.app.details.selected == Some(id);
        // zebra stripes and selection background
        let rect = ui.max_rect();
        if is_sel {
            ui.painter()
                .rect_filled(rect, 0.0, ui.visuals().selection.bg_fill);
        } else if page_row % 2 == 0 {
            ui.painter()
                .rect_filled(rect, 0.0, ui.visuals().faint_bg_color);
        }
        let col_nr = cell.col_nr as usize;
        if self.has_select && col_nr == 0 {
            let mut checked = self.app.results.selection.is_selected(id);
            if ui.checkbox(&mut checked, "").changed() {
                self.app.results.selection.toggle(id);
            }
            return;
        }
        if self.has_actions && col_nr == self.specs.len() + self.has_select as usize {
            let view = self.app.results.view;
            ui.horizontal(|ui| {
                if view.show_edit && ui.small_button("Edit").clicked() {
                    self.app.open_editor(Some(id));
                }
                let busy = self.app.pending.row_busy(id);
                if view.show_delete
                    && ui
                        .add_enabled(!busy, egui::Button::new("Del").small())
                        .clicked()
                {
                    self.app.confirm_row_delete(&row);
                }
            });
            return;
        }
        let Some(spec) = self
            .specs
            .get(col_nr - self.has_select as usize)
            .cloned()
        else {
            return;
        };
        if spec.kind == ColumnKind::Status {
            self.status_cell(ui, &row);
            return;
        }
        let text = cell_text(&row, &spec);
        match spec.cell {
            CellKind::Link { url_path } => match display_value(&row.raw, url_path) {
                Some(url) => {
                    if ui
                        .link(egui::RichText::new(text).monospace())
                        .on_hover_text(&url)
                        .clicked()
                    {
                        self.app.open_link(&url);
                    }
                }
                None => {
                    ui.label(egui::RichText::new(text).monospace());
                }
            },
            CellKind::Image => {
                if text.is_empty() {
                    ui.weak("-");
                } else if ui
                    .link(egui::RichText::new("view ↗").monospace())
                    .on_hover_text(&text)
                    .clicked()
                {
                    self.app.open_link(&text);
                }
            }
            CellKind::Badge => {
                let color = if self.app.results.status_mapping.is_on_str(&text) {
                    egui::Color32::from_rgb(34, 139, 34)
                } else {
                    ui.visuals().weak_text_color()
                };
                ui.label(egui::RichText::new(text).monospace().color(color));
            }
            CellKind::Text | CellKind::Custom(_) => {
                if spec.kind == ColumnKind::Name {
                    let resp =
                        ui.selectable_label(is_sel, egui::RichText::new(text).monospace());
                    if resp.clicked() {
                        self.app.select_row(id);
                    }
                } else {
                    ui.label(egui::RichText::new(text).monospace());
                }
            }
        }
    }

    fn default_row_height(&self) -> f32 {
        22.0
    }
}
