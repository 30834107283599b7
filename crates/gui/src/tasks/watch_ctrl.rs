#![forbid(unsafe_code)]

use std::sync::mpsc;
use std::time::Instant;

use tracing::info;

use crate::model::UiUpdate;
use crate::DeskoGuiApp;
use desko_api::StreamHandle;
use desko_core::columns;

impl DeskoGuiApp {
    // Start or refresh the active watch when the nav selection changes.
    pub(crate) fn ensure_watch_for_selection(&mut self) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        let changed = self.watch.loaded_entity.as_deref() != Some(entity.as_str());
        if !changed {
            return;
        }

        // Swap in the new entity's descriptor and reset the view state.
        self.results.columns = columns::builtin_columns_for(&entity);
        self.results.search_keys = columns::builtin_search_keys_for(&entity);
        self.results.filter_groups = columns::builtin_filters_for(&entity);
        self.results.filters.reset(&self.results.filter_groups);
        let (mapping, widget) = columns::builtin_status_for(&entity);
        self.results.status_mapping = mapping;
        self.results.status_widget = widget;
        self.results.view = columns::builtin_view_for(&entity);
        self.results.search_text.clear();
        self.results.prev_search.clear();
        self.results.pager.page = 1;
        self.results.selection.clear();
        self.results.sort_col = None;
        self.results.sort_asc = true;
        self.results.rows.clear();
        self.results.epoch = None;
        self.results.loading = true;
        self.details.selected = None;
        self.details.buffer.clear();
        self.details.saved.clear();
        self.editor = None;
        self.confirm_delete = None;
        self.last_error = None;

        // Cancel previous task if any
        if let Some(stop) = self.watch.stop.take() {
            info!("watch: stopping previous task");
            let _ = stop.send(());
        }
        // mark selection start for TTFR metric
        self.watch.select_t0 = Some(Instant::now());
        self.watch.ttfr_logged = false;
        let (tx, rx) = mpsc::channel::<UiUpdate>();
        self.watch.updates_tx = Some(tx.clone());
        self.watch.updates_rx = Some(rx);
        let api = self.api.clone();
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
        let ent = entity.clone();
        info!(entity = %ent, "watch: starting snapshot + watch");
        let task = tokio::spawn(async move {
            let load_t0 = Instant::now();
            // Fast first rows: one direct snapshot in parallel with the watch.
            let snap_tx = tx.clone();
            let snap_api = api.clone();
            let snap_ent = ent.clone();
            tokio::spawn(async move {
                let t0 = Instant::now();
                info!(entity = %snap_ent, "snapshot: request start");
                match snap_api.snapshot(&snap_ent).await {
                    Ok(resp) => {
                        info!(
                            items = resp.data.items.len(),
                            took_ms = %t0.elapsed().as_millis(),
                            "snapshot: response ok"
                        );
                        let epoch = resp.data.epoch;
                        let _ = snap_tx.send(UiUpdate::Snapshot(resp.data.items));
                        let _ = snap_tx.send(UiUpdate::Epoch(epoch));
                    }
                    Err(e) => {
                        let _ = snap_tx
                            .send(UiUpdate::Error(format!("snapshot({}) error: {}", snap_ent, e)));
                        info!(error = %e, "snapshot: request failed");
                    }
                }
            });
            // Watch: deltas feed the coalescing ingest loop; each published
            // epoch becomes a fresh row snapshot for the table.
            let work = async {
                match api.watch(&ent).await {
                    Ok(StreamHandle {
                        rx: mut deltas,
                        cancel,
                    }) => {
                        info!(took_ms = %load_t0.elapsed().as_millis(), "watch: stream opened");
                        let cap = std::env::var("DESKO_QUEUE_CAP")
                            .ok()
                            .and_then(|s| s.parse::<usize>().ok())
                            .unwrap_or(2048);
                        let (delta_tx, handle) = desko_store::spawn_ingest(&ent, cap);
                        let mut epochs = handle.subscribe_epoch();
                        let mut first_delta = true;
                        loop {
                            tokio::select! {
                                evt = deltas.recv() => {
                                    match evt {
                                        Some(delta) => {
                                            if first_delta {
                                                let ms = load_t0.elapsed().as_millis();
                                                info!(since_ms = %ms, "watch: first delta received");
                                                first_delta = false;
                                            }
                                            if delta_tx.send(delta).await.is_err() {
                                                break;
                                            }
                                        }
                                        None => break,
                                    }
                                }
                                changed = epochs.changed() => {
                                    if changed.is_err() {
                                        break;
                                    }
                                    let snap = handle.current();
                                    let epoch = snap.epoch;
                                    if tx.send(UiUpdate::Snapshot(snap.items.clone())).is_err() {
                                        break;
                                    }
                                    let _ = tx.send(UiUpdate::Epoch(epoch));
                                }
                            }
                        }
                        cancel.cancel();
                    }
                    Err(e) => {
                        let _ = tx.send(UiUpdate::Error(format!("watch({}) error: {}", ent, e)));
                    }
                }
            };
            tokio::select! { _ = &mut stop_rx => {}, _ = work => {} }
            info!(took_ms = %load_t0.elapsed().as_millis(), "watch: stopped or stream ended");
        });
        self.watch.task = Some(task);
        self.watch.stop = Some(stop_tx);
        self.watch.loaded_entity = Some(entity);
    }

    // One-shot snapshot refresh, used after a save so the table converges
    // without waiting for the next relist.
    pub(crate) fn start_refresh_task(&mut self) {
        let Some(entity) = self.selection.entity.clone() else {
            return;
        };
        let api = self.api.clone();
        let tx = self.updates_tx();
        info!(entity = %entity, "refresh: request start");
        tokio::spawn(async move {
            let t0 = Instant::now();
            match api.snapshot(&entity).await {
                Ok(resp) => {
                    info!(
                        items = resp.data.items.len(),
                        took_ms = %t0.elapsed().as_millis(),
                        "refresh: response ok"
                    );
                    let epoch = resp.data.epoch;
                    let _ = tx.send(UiUpdate::Snapshot(resp.data.items));
                    let _ = tx.send(UiUpdate::Epoch(epoch));
                }
                Err(e) => {
                    let _ = tx.send(UiUpdate::Error(format!("refresh({}) error: {}", entity, e)));
                }
            }
        });
    }
}
