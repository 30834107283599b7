#![forbid(unsafe_code)]

use eframe::egui;
use metrics::{counter, histogram};
use std::sync::mpsc;
use tracing::info;

use crate::model::ToastKind;
use crate::{DeskoGuiApp, UiUpdate};
use desko_api::SaveOutcome;

pub(crate) fn process_updates(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    // Drain UI updates from background tasks (bounded per frame and time)
    let mut processed = 0usize;
    let mut saw_batch = false; // treat snapshot as a batch marker
    let mut pending_toasts: Vec<(String, ToastKind)> = Vec::new();
    let mut refresh_after_save = false;
    if let Some(rx) = &app.watch.updates_rx {
        while processed < 256 {
            match rx.try_recv() {
                Ok(UiUpdate::Snapshot(items)) => {
                    let count = items.len();
                    app.results.rows = items;
                    app.results.selection.prune_missing(&app.results.rows);
                    app.results.loading = false;
                    app.last_error = None;
                    info!(items = count, "ui: snapshot applied");
                    if !app.watch.ttfr_logged {
                        if let Some(t0) = app.watch.select_t0.take() {
                            let ms = t0.elapsed().as_millis();
                            info!(ttfr_ms = %ms, "metric: time_to_first_row_ms");
                        }
                        app.watch.ttfr_logged = true;
                    }
                    processed += 1;
                    saw_batch = true;
                }
                Ok(UiUpdate::Epoch(e)) => {
                    app.results.epoch = Some(e);
                    processed += 1;
                }
                Ok(UiUpdate::Error(err)) => {
                    app.results.loading = false;
                    app.last_error = Some(err);
                    processed += 1;
                }
                Ok(UiUpdate::Detail { id, text }) => {
                    if app.details.selected == Some(id) {
                        app.details.buffer = text;
                        ctx.request_repaint();
                    }
                    processed += 1;
                }
                Ok(UiUpdate::DetailError(err)) => {
                    app.last_error = Some(err);
                    processed += 1;
                }
                Ok(UiUpdate::SavedList { id, items }) => {
                    if app.details.selected == Some(id) {
                        app.details.saved = items;
                    }
                    processed += 1;
                }
                Ok(UiUpdate::SaveDone { outcome }) => {
                    app.editor = None;
                    let msg = match outcome {
                        SaveOutcome::Created { id: Some(id) } => format!("created #{}", id),
                        SaveOutcome::Created { id: None } => "created".to_string(),
                        SaveOutcome::Updated { id } => format!("saved #{}", id),
                    };
                    app.log = msg.clone();
                    pending_toasts.push((msg, ToastKind::Success));
                    refresh_after_save = true;
                    processed += 1;
                }
                Ok(UiUpdate::SaveError(err)) => {
                    // The dialog stays open so the draft can be retried.
                    if let Some(editor) = app.editor.as_mut() {
                        editor.saving = false;
                    }
                    app.last_error = Some(err.clone());
                    pending_toasts.push((err, ToastKind::Error));
                    processed += 1;
                }
                Ok(UiUpdate::OpDone { token, message }) => {
                    app.pending.take(token);
                    if app
                        .confirm_delete
                        .as_ref()
                        .map(|c| c.token == Some(token))
                        .unwrap_or(false)
                    {
                        app.confirm_delete = None;
                    }
                    app.log = message.clone();
                    pending_toasts.push((message, ToastKind::Success));
                    processed += 1;
                }
                Ok(UiUpdate::OpError { token, message }) => {
                    if let Some(edit) = app.pending.take(token) {
                        edit.rollback(&mut app.results.rows);
                    }
                    if let Some(c) = app.confirm_delete.as_mut() {
                        if c.token == Some(token) {
                            c.busy = false;
                            c.token = None;
                        }
                    }
                    app.last_error = Some(message.clone());
                    pending_toasts.push((message, ToastKind::Error));
                    processed += 1;
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    app.watch.updates_rx = None;
                    break;
                }
            }
        }
        // Debounce repaint: flush on batch marker, size threshold, or elapsed time
        if processed > 0 {
            app.last_activity = Some(std::time::Instant::now());
            app.ui_debounce.pending_count += processed;
            if app.ui_debounce.pending_since.is_none() {
                app.ui_debounce.pending_since = Some(std::time::Instant::now());
            }
            let elapsed_ms = app
                .ui_debounce
                .pending_since
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or(0);
            let should_flush = saw_batch
                || app.ui_debounce.pending_count >= 256
                || elapsed_ms >= app.ui_debounce.ms;
            if should_flush {
                let processed_now = app.ui_debounce.pending_count as u64;
                info!(
                    processed = processed_now,
                    total = app.results.rows.len(),
                    "ui: flushed updates"
                );
                counter!("ui_updates_processed_per_frame", processed_now);
                histogram!("ui_debounce_flush_ms", elapsed_ms as f64);
                ctx.request_repaint();
                app.ui_debounce.pending_count = 0;
                app.ui_debounce.pending_since = None;
            }
        }
    }
    // Emit queued toasts after dropping rx borrow
    for (text, kind) in pending_toasts.drain(..) {
        app.toast(text, kind);
    }
    if refresh_after_save {
        app.start_refresh_task();
    }
}
