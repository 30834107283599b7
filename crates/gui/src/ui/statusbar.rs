#![forbid(unsafe_code)]

use eframe::egui;

use crate::DeskoGuiApp;

// Row-count coloring thresholds against the soft cap.
const WARN_PCT: f32 = 0.75;
const ERR_PCT: f32 = 0.90;

pub(crate) fn ui_statusbar(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("bottom_bar")
        .resizable(false)
        .default_height(28.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&app.base_url);
                ui.separator();
                // Row count with soft-cap threshold coloring
                let items = app.results.rows.len();
                let cap = app.results.soft_cap.max(1);
                let pct = (items as f32) / (cap as f32);
                let color = if pct >= ERR_PCT {
                    ui.visuals().error_fg_color
                } else if pct >= WARN_PCT {
                    ui.visuals().warn_fg_color
                } else {
                    ui.visuals().text_color()
                };
                ui.colored_label(color, format!("rows: {}", items));
                if let Some(epoch) = app.results.epoch {
                    ui.separator();
                    ui.label(format!("epoch: {}", epoch));
                }
                let selected = app.results.selection.len();
                if selected > 0 {
                    ui.separator();
                    ui.label(format!("selected: {}", selected));
                }
                if !app.pending.is_empty() {
                    ui.separator();
                    ui.label("syncing…");
                }
                if let Some(err) = &app.last_error {
                    ui.separator();
                    ui.label(egui::RichText::new(err).color(ui.visuals().warn_fg_color));
                }
                if !app.log.is_empty() {
                    ui.separator();
                    ui.label(&app.log);
                }
            });
        });
}
