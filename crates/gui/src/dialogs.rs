#![forbid(unsafe_code)]

//! Edit and delete dialogs. Both are subject-carrying: the state is
//! `Option<...>`, so neither can render without a record (or a draft) to
//! act on. The host frame loop owns visibility by setting the option.

use eframe::egui;
use tracing::info;

use desko_core::columns::label_for;
use desko_core::{LiteRow, RowId};
use desko_schema::{form_for, FieldKind, FormDraft, FormSpec};

use crate::model::{ConfirmDelete, EditorState};
use crate::DeskoGuiApp;

/// Primary-button caption and enabled state for the edit dialog.
pub(crate) fn save_button(saving: bool) -> (&'static str, bool) {
    if saving {
        ("Saving…", false)
    } else {
        ("Save", true)
    }
}

/// Primary-button caption and enabled state for the delete dialog.
pub(crate) fn delete_button(busy: bool) -> (&'static str, bool) {
    if busy {
        ("Deleting…", false)
    } else {
        ("Delete", true)
    }
}

/// Target description for the delete prompt: a single row by name, several
/// as a count.
pub(crate) fn delete_label(names: &[&str]) -> String {
    match names {
        [one] => format!("\"{}\"", one),
        many => format!("{} rows", many.len()),
    }
}

/// Build editor state for a create (`row == None`) or an edit prefilled
/// from the record.
pub(crate) fn editor_for(entity: &str, row: Option<&LiteRow>) -> EditorState {
    let form = form_for(entity);
    let (draft, original) = match row {
        Some(r) => (FormDraft::from_record(&form, &r.raw), r.raw.clone()),
        None => (FormDraft::empty(&form), serde_json::Value::Null),
    };
    EditorState {
        entity: entity.to_string(),
        id: row.map(|r| r.id),
        form,
        draft,
        original,
        issues: Vec::new(),
        saving: false,
    }
}

/// Count of fields whose draft text diverges from the record as it was
/// loaded. Uses the same canonicalization as the prefill.
pub(crate) fn changed_fields(
    form: &FormSpec,
    draft: &FormDraft,
    original: &serde_json::Value,
) -> usize {
    if original.is_null() {
        return 0;
    }
    let base = FormDraft::from_record(form, original);
    form.fields
        .iter()
        .filter(|f| base.get(f.key) != draft.get(f.key))
        .count()
}

impl DeskoGuiApp {
    /// Open the editor for a row of the selected entity, or a blank create
    /// form. A missing row means no subject and no dialog.
    pub(crate) fn open_editor(&mut self, id: Option<RowId>) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        let row = id.and_then(|id| self.results.rows.iter().find(|r| r.id == id));
        if id.is_some() && row.is_none() {
            return;
        }
        info!(entity = %entity, id = ?id, "ui: editor open");
        self.editor = Some(editor_for(&entity, row));
    }

    pub(crate) fn confirm_row_delete(&mut self, row: &LiteRow) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        self.confirm_delete = Some(ConfirmDelete {
            entity,
            ids: vec![row.id],
            label: delete_label(&[row.name.as_str()]),
            busy: false,
            token: None,
        });
    }

    /// Confirm deleting the current bulk selection. An empty selection has
    /// no subject, so nothing opens.
    pub(crate) fn confirm_selection_delete(&mut self) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        let ids = self.results.selection.ids();
        if ids.is_empty() {
            return;
        }
        let names: Vec<&str> = self
            .results
            .rows
            .iter()
            .filter(|r| ids.contains(&r.id))
            .map(|r| r.name.as_str())
            .collect();
        self.confirm_delete = Some(ConfirmDelete {
            entity,
            ids,
            label: delete_label(&names),
            busy: false,
            token: None,
        });
    }
}

pub(crate) fn ui_dialogs(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    ui_editor_dialog(app, ctx);
    ui_confirm_delete(app, ctx);
}

fn ui_editor_dialog(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    let Some(mut editor) = app.editor.take() else {
        return;
    };
    let title = match editor.id {
        Some(id) => format!("Edit {} #{}", label_for(&editor.entity), id),
        None => format!("New {}", label_for(&editor.entity)),
    };
    let mut open = true;
    let mut do_save = false;
    let mut do_cancel = false;
    egui::Window::new(title)
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, -40.0))
        .show(ctx, |ui| {
            egui::Grid::new("editor_form")
                .num_columns(2)
                .spacing([8.0, 6.0])
                .show(ui, |ui| {
                    for f in editor.form.fields.iter() {
                        let name = if f.required {
                            format!("{} *", f.label)
                        } else {
                            f.label.to_string()
                        };
                        ui.label(name);
                        ui.vertical(|ui| {
                            match f.kind {
                                FieldKind::Select(options) => {
                                    let current = editor.draft.get(f.key).to_string();
                                    egui::ComboBox::from_id_salt(("editor_field", f.key))
                                        .selected_text(if current.is_empty() {
                                            "-".to_string()
                                        } else {
                                            current.clone()
                                        })
                                        .show_ui(ui, |ui| {
                                            for opt in options {
                                                if ui
                                                    .selectable_label(current == *opt, *opt)
                                                    .clicked()
                                                {
                                                    editor.draft.set(f.key, *opt);
                                                }
                                            }
                                        });
                                }
                                _ => {
                                    if let Some(v) = editor.draft.value_mut(f.key) {
                                        let hint = match f.kind {
                                            FieldKind::Date => "YYYY-MM-DD",
                                            FieldKind::Email => "name@example.com",
                                            FieldKind::Url => "https://…",
                                            _ => "",
                                        };
                                        ui.add(
                                            egui::TextEdit::singleline(v)
                                                .hint_text(hint)
                                                .desired_width(260.0),
                                        );
                                    }
                                }
                            }
                            if let Some(issue) =
                                editor.issues.iter().find(|i| i.field == f.key)
                            {
                                let mut msg = issue.error.clone();
                                if let Some(h) = &issue.hint {
                                    msg.push_str(&format!(" ({})", h));
                                }
                                ui.colored_label(
                                    ui.visuals().error_fg_color,
                                    egui::RichText::new(msg).small(),
                                );
                            }
                        });
                        ui.end_row();
                    }
                });
            let changed = changed_fields(&editor.form, &editor.draft, &editor.original);
            if changed > 0 {
                ui.weak(format!("changed fields: {}", changed));
            }
            ui.separator();
            ui.horizontal(|ui| {
                let (caption, enabled) = save_button(editor.saving);
                if ui
                    .add_enabled(enabled, egui::Button::new(caption))
                    .clicked()
                {
                    do_save = true;
                }
                if ui.button("Cancel").clicked() {
                    do_cancel = true;
                }
                if editor.saving {
                    ui.add(egui::Spinner::new());
                }
            });
        });
    if do_cancel || !open {
        return;
    }
    app.editor = Some(editor);
    if do_save {
        app.start_save_task();
    }
}

fn ui_confirm_delete(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    let Some(confirm) = app.confirm_delete.take() else {
        return;
    };
    let mut open = true;
    let mut do_delete = false;
    let mut do_cancel = false;
    egui::Window::new("Confirm Delete")
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, -40.0))
        .show(ctx, |ui| {
            ui.label(format!("Delete {}?", confirm.label));
            ui.weak("This cannot be undone.");
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.button("Cancel").clicked() {
                    do_cancel = true;
                }
                let (caption, enabled) = delete_button(confirm.busy);
                if ui
                    .add_enabled(enabled, egui::Button::new(caption))
                    .clicked()
                {
                    info!(entity = %confirm.entity, count = confirm.ids.len(), "ui: delete confirm");
                    do_delete = true;
                }
                if confirm.busy {
                    ui.add(egui::Spinner::new());
                }
            });
        });
    if do_cancel || !open {
        return;
    }
    app.confirm_delete = Some(confirm);
    if do_delete {
        app.start_delete_task();
    }
}
