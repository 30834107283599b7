//! Desko search: client-side filtering and ranked lookup over a row snapshot.
//! Everything here is synchronous and allocation-light; the table view calls
//! [`visible_indices`] on every input change.

#![forbid(unsafe_code)]

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::debug;

use desko_core::table::FilterState;
use desko_core::{display_value, LiteRow, RowId, RowSnapshot};

pub type DocId = u32;

#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub doc: DocId,
    pub score: f32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchDebugInfo {
    pub total: usize,
    pub after_filters: usize,
    pub matched: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOpts {
    pub max_candidates: Option<usize>,
    pub min_score: Option<f32>,
}

/// A parsed query: `key=value` tokens become equality filters on dotted
/// paths, everything else is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub filters: Vec<(String, String)>,
    pub text: String,
}

/// Parse `status=Active type=sales alpha` into filters + free text.
pub fn parse_query(q: &str) -> TableQuery {
    let mut filters = Vec::new();
    let mut free: Vec<&str> = Vec::new();
    for tok in q.split_whitespace() {
        match tok.split_once('=') {
            Some((k, v)) if !k.is_empty() && !v.is_empty() => {
                filters.push((k.to_string(), v.to_string()));
            }
            _ => free.push(tok),
        }
    }
    TableQuery {
        filters,
        text: free.join(" "),
    }
}

/// The table view's visibility pipeline.
///
/// Step 1: non-empty search text keeps rows where at least one search key
/// resolves, case-insensitively, to a substring match (OR across keys). An
/// empty key set disables the search step entirely.
/// Step 2: every active filter group must match by stringified, lower-cased
/// equality on its dotted path (AND across groups).
///
/// Returns indices into `rows`, preserving insertion order.
pub fn visible_indices(
    rows: &[LiteRow],
    search_keys: &[&str],
    search_text: &str,
    filters: &FilterState,
) -> Vec<usize> {
    let needle = search_text.trim().to_lowercase();
    let active: Vec<(&str, String)> = filters
        .active()
        .map(|(k, v)| (k, v.to_lowercase()))
        .collect();

    let mut out = Vec::new();
    'row: for (i, row) in rows.iter().enumerate() {
        if !needle.is_empty() && !search_keys.is_empty() {
            let hit = search_keys.iter().any(|key| {
                display_value(&row.raw, key)
                    .map(|v| v.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            });
            if !hit {
                continue;
            }
        }
        for (key, want) in &active {
            match display_value(&row.raw, key) {
                Some(got) if got.to_lowercase() == *want => {}
                _ => continue 'row,
            }
        }
        out.push(i);
    }
    out
}

/// Ranked lookup over a snapshot: typed `key=value` filters plus fuzzy free
/// text over the display haystack. Used by the CLI `search` command and the
/// GUI palette; the plain table visibility path is [`visible_indices`].
pub struct Index {
    texts: Vec<String>,
    names: Vec<String>,
    ids: Vec<RowId>,
    raws: Vec<serde_json::Value>,
}

impl Index {
    pub fn build_from_snapshot(snap: &RowSnapshot) -> Self {
        let mut texts = Vec::with_capacity(snap.items.len());
        let mut names = Vec::with_capacity(snap.items.len());
        let mut ids = Vec::with_capacity(snap.items.len());
        let mut raws = Vec::with_capacity(snap.items.len());
        for row in snap.items.iter() {
            let mut display = String::new();
            display.push_str(&row.name);
            for (_id, val) in row.projected.iter() {
                display.push(' ');
                display.push_str(val);
            }
            if let Some(st) = &row.status {
                display.push(' ');
                display.push_str(st);
            }
            texts.push(display);
            names.push(row.name.clone());
            ids.push(row.id);
            raws.push(row.raw.clone());
        }
        metrics::gauge!("search_docs", texts.len() as f64);
        Self {
            texts,
            names,
            ids,
            raws,
        }
    }

    pub fn search(&self, q: &str, limit: usize) -> Vec<Hit> {
        self.search_with_opts(q, limit, SearchOpts::default()).0
    }

    pub fn search_with_opts(
        &self,
        q: &str,
        limit: usize,
        opts: SearchOpts,
    ) -> (Vec<Hit>, SearchDebugInfo) {
        let started = std::time::Instant::now();
        let query = parse_query(q);
        let total = self.texts.len();

        // Equality filters narrow the candidate set first.
        let mut candidates: Vec<usize> = (0..self.texts.len()).collect();
        for (key, val) in &query.filters {
            let want = val.to_lowercase();
            candidates.retain(|&i| {
                display_value(&self.raws[i], key)
                    .map(|got| got.to_lowercase() == want)
                    .unwrap_or(false)
            });
        }
        let after_filters = candidates.len();
        if let Some(maxc) = opts.max_candidates {
            candidates.truncate(maxc);
        }
        metrics::histogram!("search_candidates", candidates.len() as f64);

        let matcher = SkimMatcherV2::default();
        let mut hits: Vec<Hit> = Vec::new();
        for i in candidates {
            if query.text.is_empty() {
                let score = 0.0f32;
                if opts.min_score.map(|m| score >= m).unwrap_or(true) {
                    hits.push(Hit {
                        doc: i as DocId,
                        score,
                    });
                }
            } else if let Some(score_i) = matcher.fuzzy_match(&self.texts[i], &query.text) {
                let score = score_i as f32;
                if opts.min_score.map(|m| score >= m).unwrap_or(true) {
                    hits.push(Hit {
                        doc: i as DocId,
                        score,
                    });
                }
            }
        }

        // Stable ranking: score desc, then name, then id.
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| self.names[a.doc as usize].cmp(&self.names[b.doc as usize]))
                .then_with(|| self.ids[a.doc as usize].cmp(&self.ids[b.doc as usize]))
        });
        hits.truncate(limit);

        let matched = hits.len();
        let elapsed = started.elapsed();
        metrics::histogram!("search_eval_ms", elapsed.as_secs_f64() * 1_000.0);
        debug!(total, after_filters, matched, "search: eval done");
        (
            hits,
            SearchDebugInfo {
                total,
                after_filters,
                matched,
            },
        )
    }

    pub fn id_of(&self, hit: &Hit) -> RowId {
        self.ids[hit.doc as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desko_core::table::FilterGroup;
    use serde_json::json;
    use smallvec::SmallVec;

    fn row(id: RowId, raw: serde_json::Value) -> LiteRow {
        let name = raw
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let status = raw.get("status").map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        LiteRow {
            id,
            name,
            created_ts: 0,
            status,
            projected: SmallVec::new(),
            raw,
        }
    }

    fn snap(items: Vec<LiteRow>) -> RowSnapshot {
        RowSnapshot { epoch: 1, items }
    }

    fn filter_state(groups: &[FilterGroup], set: &[(&str, &str)]) -> FilterState {
        let mut st = FilterState::default();
        st.reset(groups);
        for (k, v) in set {
            st.set(k, v);
        }
        st
    }

    #[test]
    fn substring_search_is_case_insensitive() {
        let rows = vec![
            row(1, json!({"name": "Alpha"})),
            row(2, json!({"name": "beta"})),
        ];
        let ix = visible_indices(&rows, &["name"], "AL", &FilterState::default());
        assert_eq!(ix, vec![0]);
    }

    #[test]
    fn search_matches_any_key() {
        let rows = vec![
            row(1, json!({"name": "Alpha", "email": "a@x.io"})),
            row(2, json!({"name": "beta", "email": "alpha@y.io"})),
            row(3, json!({"name": "gamma", "email": "g@z.io"})),
        ];
        let ix = visible_indices(&rows, &["name", "email"], "alpha", &FilterState::default());
        assert_eq!(ix, vec![0, 1]);
    }

    #[test]
    fn search_skips_non_primitive_values() {
        let rows = vec![
            row(1, json!({"name": "one", "country": {"name": "Jordan"}})),
            row(2, json!({"name": "two", "country": "Jordania"})),
        ];
        // "country" resolves to an object for row one; only the nested path matches it
        let ix = visible_indices(&rows, &["country"], "jord", &FilterState::default());
        assert_eq!(ix, vec![1]);
        let ix = visible_indices(&rows, &["country.name"], "jord", &FilterState::default());
        assert_eq!(ix, vec![0]);
    }

    #[test]
    fn empty_search_keys_disable_the_search_step() {
        let rows = vec![row(1, json!({"name": "Alpha"})), row(2, json!({"name": "beta"}))];
        let ix = visible_indices(&rows, &[], "zzz", &FilterState::default());
        assert_eq!(ix, vec![0, 1]);
    }

    #[test]
    fn filters_compose_by_and() {
        let groups = vec![
            FilterGroup::new("status", "Status", &["Active", "inactive"]),
            FilterGroup::new("type", "Type", &["sales", "company"]),
        ];
        let rows = vec![
            row(1, json!({"name": "a", "status": "Active", "type": "sales"})),
            row(2, json!({"name": "b", "status": "Active", "type": "company"})),
            row(3, json!({"name": "c", "status": "inactive", "type": "sales"})),
        ];
        let st = filter_state(&groups, &[("status", "Active"), ("type", "sales")]);
        let ix = visible_indices(&rows, &["name"], "", &st);
        assert_eq!(ix, vec![0]);
    }

    #[test]
    fn filter_equality_is_case_insensitive_and_stringified() {
        let groups = vec![FilterGroup::new("status", "Status", &["true", "false"])];
        let rows = vec![
            row(1, json!({"name": "a", "status": true})),
            row(2, json!({"name": "b", "status": false})),
        ];
        let st = filter_state(&groups, &[("status", "True")]);
        let ix = visible_indices(&rows, &["name"], "", &st);
        assert_eq!(ix, vec![0]);
    }

    #[test]
    fn filter_on_missing_path_excludes_the_row() {
        let groups = vec![FilterGroup::new("region", "Region", &["north"])];
        let rows = vec![
            row(1, json!({"name": "a", "region": "north"})),
            row(2, json!({"name": "b"})),
        ];
        let st = filter_state(&groups, &[("region", "north")]);
        let ix = visible_indices(&rows, &["name"], "", &st);
        assert_eq!(ix, vec![0]);
    }

    #[test]
    fn search_and_filters_combine() {
        let groups = vec![FilterGroup::new("status", "Status", &["Active", "inactive"])];
        let rows = vec![
            row(1, json!({"name": "Acme", "status": "Active"})),
            row(2, json!({"name": "Acorn", "status": "inactive"})),
            row(3, json!({"name": "Zest", "status": "Active"})),
        ];
        let st = filter_state(&groups, &[("status", "Active")]);
        let ix = visible_indices(&rows, &["name"], "ac", &st);
        assert_eq!(ix, vec![0]);
    }

    #[test]
    fn query_tokens_split_into_filters_and_text() {
        let q = parse_query("status=Active type=sales alpha beta");
        assert_eq!(
            q.filters,
            vec![
                ("status".to_string(), "Active".to_string()),
                ("type".to_string(), "sales".to_string())
            ]
        );
        assert_eq!(q.text, "alpha beta");
    }

    #[test]
    fn index_filters_then_ranks() {
        let s = snap(vec![
            row(1, json!({"name": "Acme Lead", "status": "Active"})),
            row(2, json!({"name": "Acme Corp", "status": "inactive"})),
            row(3, json!({"name": "Beta", "status": "Active"})),
        ]);
        let idx = Index::build_from_snapshot(&s);
        let hits = idx.search("status=Active acme", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(idx.id_of(&hits[0]), 1);

        let (all_active, dbg) = idx.search_with_opts("status=Active", 10, SearchOpts::default());
        assert_eq!(all_active.len(), 2);
        assert_eq!(dbg.after_filters, 2);
    }

    #[test]
    fn index_ranking_is_stable() {
        let s = snap(vec![
            row(2, json!({"name": "pay-2"})),
            row(1, json!({"name": "pay-1"})),
        ]);
        let idx = Index::build_from_snapshot(&s);
        // No free text: equal scores, name breaks the tie
        let hits = idx.search("", 10);
        assert_eq!(idx.id_of(&hits[0]), 1);
        assert_eq!(idx.id_of(&hits[1]), 2);
    }
}
