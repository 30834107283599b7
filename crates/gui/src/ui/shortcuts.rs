#![forbid(unsafe_code)]

use eframe::egui;

use crate::model::ToastKind;
use crate::DeskoGuiApp;

pub(crate) fn handle_global_shortcuts(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    let typing = ctx.wants_keyboard_input();

    // Focus search (F)
    if !typing && ctx.input(|i| i.key_pressed(egui::Key::F)) {
        app.results.search_focus = true;
    }

    // New record (N); a no-op for entities whose records the backend creates
    if !typing && ctx.input(|i| i.key_pressed(egui::Key::N)) {
        if app.selection.entity.is_none() {
            app.toast("new: select an entity first", ToastKind::Warn);
        } else if app.results.view.show_add {
            app.open_editor(None);
        }
    }

    // Delete selection (Del)
    if !typing && ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
        if !app.results.selection.is_empty() {
            app.confirm_selection_delete();
        }
    }

    // Cmd/Ctrl+S -> save the open editor
    if ctx.input(|i| (i.modifiers.command || i.modifiers.ctrl) && i.key_pressed(egui::Key::S)) {
        if app.editor.is_some() {
            app.start_save_task();
        }
    }

    // Esc -> close overlays and cancel in-flight fetches
    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        if app.palette.open {
            app.palette.open = false;
        }
        if app.editor.take().is_some() {
            app.toast("edit: canceled", ToastKind::Info);
        }
        if app.confirm_delete.take().is_some() {
            app.toast("delete: canceled", ToastKind::Info);
        }
        if !app.results.search_text.is_empty() {
            app.results.search_text.clear();
            app.results.prev_search.clear();
            app.results.pager.page = 1;
        }
        if let Some(stop) = app.details.stop.take() {
            let _ = stop.send(());
            app.toast("details: canceled", ToastKind::Info);
        }
        // Do not exit the app on Esc.
    }
}
