#![forbid(unsafe_code)]

use std::sync::{mpsc, Arc};
use std::time::Instant;

use desko_api::{DeskoApi, EntityKind};
use desko_core::columns::label_for;
use eframe::egui;
use tracing::info;

mod details;
mod dialogs;
mod model;
mod nav;
mod results;
mod tasks;
mod ui;
mod util;

use model::{
    DetailsState, DiscoveryState, PaletteState, PendingOps, ResultsState, SelectionState,
    UiDebounce, WatchState,
};
pub use model::{PaletteItem, Toast, ToastKind, UiUpdate};

/// Entry point used by the launcher binary.
pub fn run_native(api: Arc<dyn DeskoApi>, base_url: String) -> eframe::Result<()> {
    let options = eframe::NativeOptions::default();
    let app = DeskoGuiApp::new(api, base_url);
    eframe::run_native("Desko", options, Box::new(|_cc| Ok(Box::new(app))))
}

pub struct DeskoGuiApp {
    api: Arc<dyn DeskoApi>,
    base_url: String,
    // discovery -> catalog state
    discovery: DiscoveryState,
    // results + updates
    results: ResultsState,
    watch: WatchState,
    // selection + details
    selection: SelectionState,
    details: DetailsState,
    // modal dialogs; None means closed
    editor: Option<model::EditorState>,
    confirm_delete: Option<model::ConfirmDelete>,
    // optimistic edits awaiting server acks
    pending: PendingOps,
    // status
    last_error: Option<String>,
    log: String,
    // layout visibility
    show_nav: bool,
    show_details: bool,
    // perf: debounce repaint requests
    ui_debounce: UiDebounce,
    // Global search palette (Cmd-K)
    palette: PaletteState,
    // UI toasts
    toasts: Vec<model::Toast>,
    // Adaptive idle repaint cadence
    idle_repaint_fast_ms: u64,
    idle_repaint_slow_ms: u64,
    idle_fast_window_ms: u64,
    last_activity: Option<Instant>,
}

impl DeskoGuiApp {
    pub fn new(api: Arc<dyn DeskoApi>, base_url: String) -> Self {
        info!("desko gui starting");
        info!("starting discovery task");
        // Kick off discovery asynchronously on the existing Tokio runtime.
        let (tx, rx) = mpsc::channel::<Result<Vec<EntityKind>, String>>();
        let api_clone = api.clone();
        let _ = tokio::spawn(async move {
            let t0 = Instant::now();
            let res = api_clone.discover().await.map_err(|e| e.to_string());
            match &res {
                Ok(v) => {
                    info!(took_ms = %t0.elapsed().as_millis(), kinds = v.len(), "discovery completed")
                }
                Err(e) => {
                    info!(took_ms = %t0.elapsed().as_millis(), error = %e, "discovery failed")
                }
            }
            let _ = tx.send(res);
        });
        Self {
            api,
            base_url,
            discovery: DiscoveryState {
                kinds: Vec::new(),
                rx: Some(rx),
            },
            selection: SelectionState { entity: None },
            results: ResultsState::default(),
            watch: WatchState::default(),
            details: DetailsState::default(),
            editor: None,
            confirm_delete: None,
            pending: PendingOps::default(),
            last_error: None,
            log: String::new(),
            show_nav: true,
            show_details: true,
            ui_debounce: UiDebounce {
                ms: std::env::var("DESKO_UI_DEBOUNCE_MS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(100),
                pending_count: 0,
                pending_since: None,
            },
            palette: PaletteState {
                open: false,
                query: String::new(),
                results: Vec::new(),
                sel: None,
                changed_at: None,
                debounce_ms: 80,
                need_focus: false,
                width_hint: 560.0,
            },
            toasts: Vec::new(),
            idle_repaint_fast_ms: std::env::var("DESKO_IDLE_FAST_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(8),
            idle_repaint_slow_ms: std::env::var("DESKO_IDLE_SLOW_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(120),
            idle_fast_window_ms: std::env::var("DESKO_IDLE_FAST_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1000),
            last_activity: None,
        }
    }

    /// Sender for the UI update channel, creating the channel on first use.
    pub(crate) fn updates_tx(&mut self) -> mpsc::Sender<UiUpdate> {
        if let Some(tx) = &self.watch.updates_tx {
            tx.clone()
        } else {
            let (tx0, rx0) = mpsc::channel::<UiUpdate>();
            self.watch.updates_tx = Some(tx0.clone());
            self.watch.updates_rx = Some(rx0);
            tx0
        }
    }
}

impl eframe::App for DeskoGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll discovery once per frame; populate the catalog when ready
        crate::ui::init::process_discovery(self);
        // Drain UI updates and apply debounce
        crate::ui::updates::process_updates(self, ctx);
        // Periodic repaint: bound queue latency with adaptive cadence
        if !self.results.rows.is_empty() || !self.pending.is_empty() || self.palette.open {
            let fast = match self.last_activity {
                Some(t) => (t.elapsed().as_millis() as u64) <= self.idle_fast_window_ms,
                None => false,
            };
            let ms = if fast {
                self.idle_repaint_fast_ms
            } else {
                self.idle_repaint_slow_ms
            };
            ctx.request_repaint_after(std::time::Duration::from_millis(ms));
        }

        // Global keybinding: Cmd-K / Ctrl-K opens palette
        ui::palette::handle_palette_shortcut(self, ctx);
        // Global keybindings: F (focus search), N (new), Del, Cmd/Ctrl-S, Esc
        ui::shortcuts::handle_global_shortcuts(self, ctx);

        ui::topbar::ui_topbar(self, ctx);

        if self.show_nav {
            egui::SidePanel::left("nav_panel")
                .resizable(true)
                .default_width(180.0)
                .show(ctx, |ui| {
                    ui.vertical(|ui| {
                        ui.heading("Entities");
                        ui.separator();
                        self.ui_entity_list(ui);
                        if let Some(entity) = self.selection.entity.clone() {
                            ui.separator();
                            ui.label(format!("Selected: {}", label_for(&entity)));
                        }
                    });
                });
        }

        if self.show_details {
            egui::SidePanel::right("details_panel")
                .resizable(true)
                .default_width(380.0)
                .show(ctx, |ui| {
                    self.ui_details(ui);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.ui_results(ui);
        });

        dialogs::ui_dialogs(self, ctx);
        ui::palette::ui_palette(self, ctx);

        ui::statusbar::ui_statusbar(self, ctx);
        // draw toasts overlay
        ui::toasts::draw_toasts(self, ctx);

        // Auto start/refresh watch when selection changes
        self.ensure_watch_for_selection();
    }
}
