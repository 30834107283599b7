#![forbid(unsafe_code)]

use eframe::egui;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::model::PaletteItem;
use crate::DeskoGuiApp;

pub(crate) fn ui_palette(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    if !app.palette.open {
        return;
    }
    let palette_width: f32 = app.palette.width_hint.clamp(520.0, 860.0);
    let list_row_h: f32 = 20.0;
    let list_max_rows: usize = 14; // visible rows target
    let list_max_h: f32 = list_row_h * (list_max_rows as f32) + 8.0;
    let min_h = list_max_h + 70.0; // input + padding
    let mut win_open = app.palette.open;
    egui::Window::new("cmd_k_palette")
        .open(&mut win_open)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, -12.0))
        .title_bar(false)
        .resizable(false)
        .collapsible(false)
        .movable(false)
        .default_size([palette_width, min_h])
        .min_size([palette_width, min_h])
        .show(ctx, |ui| {
            ui.set_min_width(palette_width);
            // Dense spacing
            ui.spacing_mut().item_spacing.y = 4.0;
            let te = egui::TextEdit::singleline(&mut app.palette.query)
                .hint_text("Jump to: entity or row name …")
                .desired_width(f32::INFINITY);
            let resp = ui.add(te);
            if app.palette.need_focus {
                resp.request_focus();
                app.palette.need_focus = false;
                app.rebuild_palette_results();
            }
            if resp.changed() {
                app.palette.changed_at = Some(std::time::Instant::now());
            }
            // Debounce build
            if let Some(t0) = app.palette.changed_at {
                if t0.elapsed().as_millis() as u64 >= app.palette.debounce_ms {
                    app.rebuild_palette_results();
                    app.palette.changed_at = None;
                }
            }
            ui.separator();
            // Keyboard selection
            let prev_sel = app.palette.sel;
            if ui.input(|i| i.key_pressed(egui::Key::ArrowDown)) {
                let len = app.palette.results.len();
                if len > 0 {
                    let cur = app.palette.sel.unwrap_or(usize::MAX);
                    app.palette.sel = Some(if cur == usize::MAX {
                        0
                    } else {
                        (cur + 1) % len
                    });
                }
            }
            if ui.input(|i| i.key_pressed(egui::Key::ArrowUp)) {
                let len = app.palette.results.len();
                if len > 0 {
                    let cur = app.palette.sel.unwrap_or(0);
                    app.palette.sel = Some(if cur == 0 { len - 1 } else { cur - 1 });
                }
            }
            let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                app.palette.open = false;
            }
            let scroll_to_selected = app.palette.sel != prev_sel;
            let mut chosen: Option<PaletteItem> = None;
            // Results list
            let font = egui::FontId::monospace(13.0);
            egui::ScrollArea::vertical()
                .max_height(list_max_h)
                .show(ui, |ui| {
                    ui.style_mut().spacing.interact_size.y = list_row_h;
                    for (idx, it) in app.palette.results.clone().into_iter().enumerate() {
                        let is_sel = app.palette.sel == Some(idx);
                        let (rect, resp) = ui.allocate_exact_size(
                            egui::vec2(palette_width - 24.0, list_row_h),
                            egui::Sense::click(),
                        );
                        if is_sel {
                            ui.painter()
                                .rect_filled(rect, 4.0, ui.visuals().selection.bg_fill);
                        }
                        // primary with highlight
                        let mut job = egui::text::LayoutJob::default();
                        let normal = egui::text::TextFormat {
                            font_id: font.clone(),
                            color: ui.visuals().text_color(),
                            ..Default::default()
                        };
                        let hl = egui::text::TextFormat {
                            font_id: font.clone(),
                            color: ui.visuals().strong_text_color(),
                            ..Default::default()
                        };
                        let chars: Vec<char> = it.primary.chars().collect();
                        for (i, ch) in chars.iter().enumerate() {
                            let fmt = if it.hi_indices.binary_search(&i).is_ok() {
                                &hl
                            } else {
                                &normal
                            };
                            job.append(&ch.to_string(), 0.0, fmt.clone());
                        }
                        let galley = ui.fonts(|f| f.layout_job(job));
                        let text_pos =
                            egui::pos2(rect.left() + 8.0, rect.center().y - galley.size().y * 0.5);
                        ui.painter()
                            .galley(text_pos, galley, ui.visuals().text_color());
                        // right-aligned secondary, weak
                        let galley2 = ui.fonts(|f| {
                            f.layout_no_wrap(
                                it.secondary.clone(),
                                font.clone(),
                                ui.visuals().weak_text_color(),
                            )
                        });
                        let sec_pos = egui::pos2(
                            rect.right() - galley2.size().x - 8.0,
                            rect.center().y - galley2.size().y * 0.5,
                        );
                        ui.painter()
                            .galley(sec_pos, galley2, ui.visuals().weak_text_color());
                        if is_sel && scroll_to_selected {
                            ui.scroll_to_rect(rect, None);
                        }
                        if resp.clicked() {
                            chosen = Some(it.clone());
                        }
                    }
                });
            if enter {
                if let Some(sel) = app
                    .palette
                    .sel
                    .and_then(|i| app.palette.results.get(i).cloned())
                {
                    chosen = Some(sel);
                }
            }
            if let Some(item) = chosen.take() {
                app.open_palette_item(item);
                app.palette.open = false;
            }
        });
    app.palette.open = win_open;
}

pub(crate) fn handle_palette_shortcut(app: &mut DeskoGuiApp, ctx: &egui::Context) {
    if ctx.input(|i| (i.modifiers.command || i.modifiers.ctrl) && i.key_pressed(egui::Key::K)) {
        app.palette.open = true;
        app.palette.sel = None;
        app.palette.need_focus = true;
    }
}

impl DeskoGuiApp {
    /// Candidates are the entity catalog plus the rows of the selected
    /// entity. An empty query lists the entities so the palette doubles as
    /// a switcher.
    pub(crate) fn rebuild_palette_results(&mut self) {
        self.palette.results.clear();
        let raw = self.palette.query.trim().to_string();
        let free_q = raw.to_lowercase();
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<PaletteItem> = Vec::new();
        for k in &self.discovery.kinds {
            if free_q.is_empty() {
                scored.push(PaletteItem {
                    entity: k.slug.clone(),
                    id: None,
                    score: 0.0,
                    primary: k.label.clone(),
                    hi_indices: Vec::new(),
                    secondary: k.slug.clone(),
                });
                continue;
            }
            let hay = format!("{} {}", k.label.to_lowercase(), k.slug);
            if let Some(score) = matcher.fuzzy_match(&hay, &free_q) {
                let hi = matcher
                    .fuzzy_indices(&k.label, &raw)
                    .map(|(_, idx)| idx)
                    .unwrap_or_default();
                scored.push(PaletteItem {
                    entity: k.slug.clone(),
                    id: None,
                    score: score as f32,
                    primary: k.label.clone(),
                    hi_indices: hi,
                    secondary: k.slug.clone(),
                });
            }
        }
        if !free_q.is_empty() {
            if let Some(entity) = self.selection.entity.clone() {
                for row in &self.results.rows {
                    let mut hay = row.name.to_lowercase();
                    if let Some(st) = &row.status {
                        hay.push(' ');
                        hay.push_str(&st.to_lowercase());
                    }
                    for (_, v) in row.projected.iter() {
                        hay.push(' ');
                        hay.push_str(&v.to_lowercase());
                    }
                    if let Some(score) = matcher.fuzzy_match(&hay, &free_q) {
                        let hi = matcher
                            .fuzzy_indices(&row.name, &raw)
                            .map(|(_, idx)| idx)
                            .unwrap_or_default();
                        scored.push(PaletteItem {
                            entity: entity.clone(),
                            id: Some(row.id),
                            score: score as f32,
                            primary: row.name.clone(),
                            hi_indices: hi,
                            secondary: format!("#{}", row.id),
                        });
                    }
                }
            }
        }
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.primary.cmp(&b.primary))
        });
        self.palette.results = scored.into_iter().take(50).collect();
        self.palette.sel = if self.palette.results.is_empty() {
            None
        } else {
            Some(0)
        };
        // Width hint based on visible text lengths
        let mut max_p = 0usize;
        let mut max_s = 0usize;
        for it in self.palette.results.iter().take(20) {
            max_p = max_p.max(it.primary.len());
            max_s = max_s.max(it.secondary.len());
        }
        let est = 60.0 + (max_p as f32) * 7.5 + (max_s as f32) * 6.5;
        self.palette.width_hint = est.clamp(520.0, 860.0);
    }

    pub(crate) fn open_palette_item(&mut self, item: PaletteItem) {
        if self.selection.entity.as_deref() != Some(item.entity.as_str()) {
            self.selection.entity = Some(item.entity.clone());
        }
        if let Some(id) = item.id {
            self.select_row(id);
        }
    }
}
