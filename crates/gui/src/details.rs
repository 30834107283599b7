#![forbid(unsafe_code)]

use std::time::Instant;

use eframe::egui;
use metrics::histogram;
use tracing::info;

use desko_core::RowId;

use crate::{DeskoGuiApp, UiUpdate};

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn pretty_json(s: &str) -> String {
    serde_json::from_str::<serde_json::Value>(s)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| s.to_string())
}

impl DeskoGuiApp {
    /// Select a row and fetch its full record plus recent saved payloads.
    /// Cancels any in-flight fetch for a previous selection.
    pub(crate) fn select_row(&mut self, id: RowId) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        info!(id, entity = %entity, "details: selecting row");
        self.details.selected = Some(id);
        self.details.buffer.clear();
        self.details.saved.clear();
        if let Some(stop) = self.details.stop.take() {
            info!("details: cancelling previous task");
            let _ = stop.send(());
        }
        let api = self.api.clone();
        let tx = self.updates_tx();
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
        self.details.stop = Some(stop_tx);
        self.details.task = Some(tokio::spawn(async move {
            let t0 = Instant::now();
            let fetch = async {
                match api.get_raw(&entity, id).await {
                    Ok(v) => {
                        let y0 = Instant::now();
                        let text =
                            serde_yaml::to_string(&v).unwrap_or_else(|_| v.to_string());
                        histogram!(
                            "details_yaml_serialize_ms",
                            y0.elapsed().as_millis() as f64
                        );
                        info!(took_ms = %t0.elapsed().as_millis(), "details: fetch ok");
                        let _ = tx.send(UiUpdate::Detail { id, text });
                    }
                    Err(e) => {
                        info!(took_ms = %t0.elapsed().as_millis(), error = %e, "details: fetch failed");
                        let _ = tx.send(UiUpdate::DetailError(e.to_string()));
                    }
                }
                match api.saved_payloads(&entity, id, Some(5)).await {
                    Ok(items) => {
                        let _ = tx.send(UiUpdate::SavedList { id, items });
                    }
                    Err(e) => {
                        info!(error = %e, "details: saved payloads failed");
                    }
                }
            };
            tokio::select! { _ = &mut stop_rx => {}, _ = fetch => {} }
        }));
    }

    pub(crate) fn ui_details(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Details");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("×").on_hover_text("Close details").clicked() {
                    self.details.selected = None;
                    self.details.buffer.clear();
                    self.details.saved.clear();
                    if let Some(stop) = self.details.stop.take() {
                        let _ = stop.send(());
                    }
                }
            });
        });
        let Some(id) = self.details.selected else {
            ui.label(egui::RichText::new("Select a row to view details").weak());
            return;
        };
        let name = self
            .results
            .rows
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.clone());
        ui.horizontal(|ui| {
            if let Some(name) = &name {
                ui.strong(name);
            }
            ui.label(egui::RichText::new(format!("#{}", id)).weak().monospace());
            if self.details.buffer.is_empty() {
                ui.add(egui::Spinner::new());
            }
        });
        ui.separator();
        egui::ScrollArea::vertical()
            .id_salt("details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if self.details.buffer.is_empty() {
                    ui.label(egui::RichText::new("loading…").weak());
                } else {
                    let mut layouter = crate::util::highlight::yaml_layouter();
                    let mut text = self.details.buffer.clone();
                    let te = egui::TextEdit::multiline(&mut text)
                        .font(egui::TextStyle::Monospace)
                        .desired_rows(24)
                        .desired_width(f32::INFINITY)
                        .interactive(false)
                        .layouter(&mut layouter);
                    ui.add(te);
                }
                if !self.details.saved.is_empty() {
                    ui.add_space(6.0);
                    ui.separator();
                    ui.strong("Saved payloads");
                    for (i, sp) in self.details.saved.iter().enumerate() {
                        egui::CollapsingHeader::new(format_ts(sp.ts))
                            .id_salt(("saved_payload", i))
                            .show(ui, |ui| {
                                let mut body = pretty_json(&sp.json);
                                ui.add(
                                    egui::TextEdit::multiline(&mut body)
                                        .font(egui::TextStyle::Monospace)
                                        .desired_width(f32::INFINITY)
                                        .interactive(false),
                                );
                            });
                    }
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_utc() {
        assert_eq!(format_ts(0), "1970-01-01 00:00:00");
        assert_eq!(format_ts(1_700_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn payload_json_is_prettified_or_passed_through() {
        assert_eq!(pretty_json("{\"a\":1}"), "{\n  \"a\": 1\n}");
        assert_eq!(pretty_json("not json"), "not json");
    }
}
