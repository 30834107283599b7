#![forbid(unsafe_code)]

use eframe::egui;

use crate::DeskoGuiApp;

pub(crate) fn ui_topbar(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading("Desko");
            ui.separator();
            ui.small_button(if app.show_nav { "Hide Nav" } else { "Show Nav" })
                .clicked()
                .then(|| app.show_nav = !app.show_nav);
            ui.small_button(if app.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
            .then(|| app.show_details = !app.show_details);
            ui.separator();
            if let Some(entity) = &app.selection.entity {
                let label = app
                    .discovery
                    .kinds
                    .iter()
                    .find(|k| &k.slug == entity)
                    .map(|k| k.label.as_str())
                    .unwrap_or(entity.as_str());
                ui.label(egui::RichText::new(label).strong());
                if app.results.loading {
                    ui.add(egui::Spinner::new());
                }
                if ui
                    .small_button("Refresh")
                    .on_hover_text("Fetch a fresh snapshot")
                    .clicked()
                {
                    app.start_refresh_task();
                }
            } else {
                ui.label("no entity selected");
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .small_button("Jump…  Ctrl+K")
                    .on_hover_text("Open the command palette")
                    .clicked()
                {
                    app.palette.open = true;
                    app.palette.need_focus = true;
                    app.palette.query.clear();
                    app.palette.results.clear();
                    app.palette.sel = None;
                }
            });
        });
    });
}
