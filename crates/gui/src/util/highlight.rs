#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use egui::text::{LayoutJob, TextFormat};
use egui::{Color32, TextStyle};
use once_cell::sync::Lazy;

static SYNTAX_SET: Lazy<syntect::parsing::SyntaxSet> =
    Lazy::new(syntect::parsing::SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<syntect::highlighting::ThemeSet> =
    Lazy::new(syntect::highlighting::ThemeSet::load_defaults);

// Memoize identical text/theme/width galleys; the details pane re-lays the
// same buffer every frame.
static CACHE: Lazy<Mutex<HashMap<u64, Arc<egui::Galley>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

const CACHE_CAP: usize = 64;

fn to_color32(c: syntect::highlighting::Color) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

fn cache_key(s: &str, dark: bool, wrap: f32) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut h = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut h);
    dark.hash(&mut h);
    // quantized so tiny width jitter reuses the entry
    (((wrap / 8.0).round() as i32).max(0)).hash(&mut h);
    h.finish()
}

fn pick_theme(dark: bool) -> &'static syntect::highlighting::Theme {
    let name = if dark { "Solarized (dark)" } else { "Solarized (light)" };
    THEME_SET
        .themes
        .get(name)
        .or_else(|| THEME_SET.themes.get("base16-ocean.dark"))
        .unwrap_or_else(|| THEME_SET.themes.values().next().unwrap())
}

/// Layouter for YAML text edits: syntect-highlighted, monospace, memoized.
pub fn yaml_layouter() -> impl FnMut(&egui::Ui, &dyn egui::TextBuffer, f32) -> Arc<egui::Galley> {
    move |ui: &egui::Ui, text: &dyn egui::TextBuffer, wrap_width: f32| {
        let dark = ui.style().visuals.dark_mode;
        let s = text.as_str();
        let key = cache_key(s, dark, wrap_width);
        if let Some(galley) = CACHE.lock().ok().and_then(|m| m.get(&key).cloned()) {
            return galley;
        }
        let syn = SYNTAX_SET
            .find_syntax_by_extension("yaml")
            .or_else(|| SYNTAX_SET.find_syntax_by_extension("yml"))
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
        let mut hl = syntect::easy::HighlightLines::new(syn, pick_theme(dark));
        let mono = TextStyle::Monospace.resolve(ui.style());
        let mut job = LayoutJob::default();
        job.wrap.max_width = wrap_width;
        for line in s.split_inclusive('\n') {
            let regions = hl
                .highlight_line(line.trim_end_matches('\n'), &SYNTAX_SET)
                .unwrap_or_default();
            for (style, piece) in regions {
                job.append(
                    piece,
                    0.0,
                    TextFormat {
                        font_id: mono.clone(),
                        color: to_color32(style.foreground),
                        ..Default::default()
                    },
                );
            }
            if line.ends_with('\n') {
                job.append(
                    "\n",
                    0.0,
                    TextFormat {
                        font_id: mono.clone(),
                        color: ui.visuals().text_color(),
                        ..Default::default()
                    },
                );
            }
        }
        let galley = ui.fonts(|f| f.layout_job(job));
        if let Ok(mut m) = CACHE.lock() {
            if m.len() > CACHE_CAP {
                m.clear();
            }
            m.insert(key, galley.clone());
        }
        galley
    }
}
