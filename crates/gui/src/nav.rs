#![forbid(unsafe_code)]

use eframe::egui;

use super::DeskoGuiApp;

impl DeskoGuiApp {
    pub(crate) fn ui_entity_list(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .id_salt("entity_nav_scroll")
            .show(ui, |ui| {
                if self.discovery.kinds.is_empty() {
                    ui.weak("discovering…");
                    return;
                }
                let kinds = self.discovery.kinds.clone();
                for k in &kinds {
                    let selected = self.selection.entity.as_deref() == Some(k.slug.as_str());
                    // Row count badge for the loaded entity only; other
                    // entities have no snapshot in memory.
                    let label = if selected && !self.results.loading {
                        format!("{} ({})", k.label, self.results.rows.len())
                    } else {
                        k.label.clone()
                    };
                    let resp = ui.selectable_label(selected, label);
                    if resp.clicked() {
                        self.on_select_entity(&k.slug);
                    }
                }
            });
    }

    fn on_select_entity(&mut self, slug: &str) {
        tracing::info!(entity = %slug, "ui: entity clicked");
        self.selection.entity = Some(slug.to_string());
    }
}
