#![forbid(unsafe_code)]

use serde_json::Value;
use tracing::info;

use crate::{DeskoGuiApp, UiUpdate};
use desko_core::table::OptimisticEdit;
use desko_core::RowId;
use desko_schema::{build_payload, validate};

impl DeskoGuiApp {
    // Validate the editor draft and ship it. Validation failures stay inline
    // in the dialog; nothing goes out.
    pub(crate) fn start_save_task(&mut self) {
        let (entity, id, payload) = {
            let Some(editor) = self.editor.as_mut() else {
                return;
            };
            if editor.saving {
                return;
            }
            editor.issues = validate(&editor.form, &editor.draft);
            if !editor.issues.is_empty() {
                info!(entity = %editor.entity, issues = editor.issues.len(), "ops: save blocked by validation");
                return;
            }
            editor.saving = true;
            (
                editor.entity.clone(),
                editor.id,
                build_payload(&editor.form, &editor.draft),
            )
        };
        let api = self.api.clone();
        let tx = self.updates_tx();
        info!(entity = %entity, id = ?id, "ops: save start");
        tokio::spawn(async move {
            let ops = api.ops();
            match ops.save(&entity, id, &payload).await {
                Ok(outcome) => {
                    info!(entity = %entity, outcome = ?outcome, "ops: save ok");
                    let _ = tx.send(UiUpdate::SaveDone { outcome });
                }
                Err(e) => {
                    let _ = tx.send(UiUpdate::SaveError(format!("save: {}", e)));
                }
            }
        });
    }

    // Status mutation with an optimistic local patch. The switch widget
    // passes the mapping's on/off value, the select widget the chosen string.
    pub(crate) fn start_status_task(&mut self, id: RowId, value: Value) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        if self.pending.row_busy(id) {
            return;
        }
        let shown = match &value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            v => v.to_string(),
        };
        let edit = OptimisticEdit::apply(
            &mut self.results.rows,
            |r| r.id == id,
            |r| r.status = Some(shown.clone()),
        );
        if edit.is_empty() {
            return;
        }
        let token = self.pending.stash(Some(id), edit);
        let api = self.api.clone();
        let tx = self.updates_tx();
        info!(entity = %entity, id, status = %shown, "ops: status start");
        tokio::spawn(async move {
            let ops = api.ops();
            match ops.set_status(&entity, id, &value).await {
                Ok(()) => {
                    let _ = tx.send(UiUpdate::OpDone {
                        token,
                        message: format!("status set for #{}", id),
                    });
                }
                Err(e) => {
                    let _ = tx.send(UiUpdate::OpError {
                        token,
                        message: format!("status: {}", e),
                    });
                }
            }
        });
    }

    // Confirmed delete: remove the rows locally, then let the backend
    // confirm. Failure rolls the rows back and keeps the dialog open.
    pub(crate) fn start_delete_task(&mut self) {
        let (entity, ids) = match &self.confirm_delete {
            Some(c) if !c.busy && !c.ids.is_empty() => (c.entity.clone(), c.ids.clone()),
            _ => return,
        };
        let edit = OptimisticEdit::remove(&mut self.results.rows, |r| ids.contains(&r.id));
        let token = self.pending.stash(None, edit);
        if let Some(c) = self.confirm_delete.as_mut() {
            c.busy = true;
            c.token = Some(token);
        }
        self.results.selection.deselect_page(ids.iter().copied());
        if self
            .details
            .selected
            .map(|d| ids.contains(&d))
            .unwrap_or(false)
        {
            self.details.selected = None;
            self.details.buffer.clear();
            self.details.saved.clear();
        }
        let api = self.api.clone();
        let tx = self.updates_tx();
        info!(entity = %entity, count = ids.len(), "ops: delete start");
        tokio::spawn(async move {
            let ops = api.ops();
            if let [id] = ids[..] {
                match ops.delete(&entity, id).await {
                    Ok(()) => {
                        let _ = tx.send(UiUpdate::OpDone {
                            token,
                            message: format!("deleted #{}", id),
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(UiUpdate::OpError {
                            token,
                            message: format!("delete: {}", e),
                        });
                    }
                }
            } else {
                match ops.delete_many(&entity, &ids).await {
                    Ok(out) if out.failed.is_empty() => {
                        let _ = tx.send(UiUpdate::OpDone {
                            token,
                            message: format!("deleted {} rows", out.deleted.len()),
                        });
                    }
                    Ok(out) => {
                        let total = out.deleted.len() + out.failed.len();
                        let _ = tx.send(UiUpdate::OpError {
                            token,
                            message: format!("delete: {} of {} failed", out.failed.len(), total),
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(UiUpdate::OpError {
                            token,
                            message: format!("delete: {}", e),
                        });
                    }
                }
            }
        });
    }

    pub(crate) fn open_link(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            self.last_error = Some(format!("open link: {}", e));
        } else {
            info!(url = %url, "ui: link opened");
        }
    }
}
