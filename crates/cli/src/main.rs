use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tokio::signal;
use tracing::{info, warn};

use desko_api::{builtin_entities, DeskoApi, InProcApi};
use desko_core::columns;
use desko_core::table::{FilterState, Pager, StatusWidget};
use desko_core::StatusMapping;
use desko_persist::{SessionRecord, SqliteStore, Store};
use desko_resthub::Session;

#[derive(Parser, Debug)]
#[command(name = "deskoctl", version, about = "Desko CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Backend base URL (overrides env and the stored session)
    #[arg(long = "url", global = true)]
    url: Option<String>,

    /// Bearer token (overrides env and the stored session)
    #[arg(long = "token", global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List catalog entities
    Entities,
    /// List rows through the table pipeline (search, filters, pagination)
    Ls {
        /// Entity slug, e.g. "leads"
        entity: String,
        /// Substring search across the entity's search keys
        #[arg(long = "search")]
        search: Option<String>,
        /// Column filter as key=value; repeatable, dotted paths allowed
        #[arg(long = "filter")]
        filter: Vec<String>,
        /// 1-based page; out-of-range pages clamp to the last one
        #[arg(long = "page", default_value_t = 1)]
        page: usize,
        #[arg(long = "per-page")]
        per_page: Option<usize>,
    },
    /// Print one raw record as JSON
    Get { entity: String, id: i64 },
    /// Ranked search; key=value tokens filter, the rest is fuzzy text
    Search {
        entity: String,
        /// Query tokens, e.g. status=Active acme
        query: Vec<String>,
        #[arg(long = "limit", default_value_t = 20)]
        limit: usize,
    },
    /// Flip or set a row's status
    Toggle {
        entity: String,
        id: i64,
        /// Use the entity's "on" status value
        #[arg(long = "on", action = ArgAction::SetTrue, conflicts_with_all = ["off", "value"])]
        on: bool,
        /// Use the entity's "off" status value
        #[arg(long = "off", action = ArgAction::SetTrue, conflicts_with = "value")]
        off: bool,
        /// Explicit status value, for select-style entities
        #[arg(long = "value")]
        value: Option<String>,
    },
    /// Delete one row or several
    Rm {
        entity: String,
        /// Single row id
        id: Option<i64>,
        /// Comma-separated ids for a bulk delete
        #[arg(long = "ids", value_delimiter = ',')]
        ids: Vec<i64>,
        /// Skip the confirmation prompt
        #[arg(long = "yes", action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Create or update a record from a JSON payload
    Save {
        entity: String,
        /// Update this id; omit to create
        #[arg(long = "id")]
        id: Option<i64>,
        /// Payload file; '-' reads stdin
        #[arg(short = 'f', long = "file")]
        file: String,
    },
    /// Stream row events (+ applied, - deleted)
    Watch { entity: String },
    /// Recent accepted payloads for a record, newest first
    Saved {
        entity: String,
        id: i64,
        #[arg(long = "limit")]
        limit: Option<usize>,
    },
    /// Store the backend session used by later commands
    Login {
        #[arg(long = "url")]
        url: String,
        #[arg(long = "token")]
        token: String,
        #[arg(long = "user")]
        user: Option<String>,
    },
    /// Facade stats and limits
    Stats,
}

fn init_tracing() {
    let env = std::env::var("DESKO_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("DESKO_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid DESKO_METRICS_ADDR; expected host:port");
        }
    }
}

/// Session precedence: `--url`/`--token` pair, then env, then the stored
/// record, with flag overrides applied on top.
fn resolve_session(url: Option<&str>, token: Option<&str>) -> Result<Session> {
    if let (Some(u), Some(t)) = (url, token) {
        return Ok(Session::new(u, t));
    }
    let stored = match Session::from_env() {
        Some(s) => Some(s),
        None => SqliteStore::open_default()?.get_session()?.map(|rec| Session {
            base_url: rec.base_url,
            token: rec.token,
            user: rec.user,
        }),
    };
    let mut session = stored.ok_or_else(|| {
        anyhow!("no session: pass --url/--token, set DESKO_API_URL/DESKO_TOKEN, or run `deskoctl login`")
    })?;
    if let Some(u) = url {
        session.base_url = u.to_string();
    }
    if let Some(t) = token {
        session.token = t.to_string();
    }
    Ok(session)
}

fn connect(url: Option<&str>, token: Option<&str>) -> Result<Arc<dyn DeskoApi>> {
    let session = resolve_session(url, token)?;
    info!(base_url = %session.base_url, "connecting");
    Ok(Arc::new(InProcApi::connect(session)?))
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}

/// Map a user-supplied status string onto the entity's mapping so bool-status
/// entities get a real boolean and string-status entities keep strings.
fn status_value(mapping: &StatusMapping, v: String) -> Value {
    let as_str = |val: &Value| match val {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if as_str(&mapping.on).eq_ignore_ascii_case(&v) {
        mapping.on.clone()
    } else if as_str(&mapping.off).eq_ignore_ascii_case(&v) {
        mapping.off.clone()
    } else {
        Value::String(v)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let Cli {
        output,
        url,
        token,
        command,
    } = Cli::parse();
    let url = url.as_deref();
    let token = token.as_deref();

    match command {
        Commands::Entities => {
            let kinds = builtin_entities();
            match output {
                Output::Human => {
                    for k in &kinds {
                        let w = match k.widget {
                            StatusWidget::Switch => "switch",
                            StatusWidget::Select => "select",
                        };
                        println!("{:<14} {:<14} {}", k.slug, k.label, w);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&kinds)?),
            }
        }
        Commands::Ls {
            entity,
            search,
            filter,
            page,
            per_page,
        } => {
            info!(entity = %entity, page, "ls invoked");
            let api = connect(url, token)?;
            let resp = api.snapshot(&entity).await?;
            let rows = resp.data.items;

            let groups = columns::builtin_filters_for(&entity);
            let mut filters = FilterState::default();
            filters.reset(&groups);
            for f in &filter {
                let (k, v) = f
                    .split_once('=')
                    .ok_or_else(|| anyhow!("bad --filter {:?}; expected key=value", f))?;
                filters.set(k, v);
            }
            let keys = columns::builtin_search_keys_for(&entity);
            let needle = search.as_deref().unwrap_or("");
            let ix = desko_search::visible_indices(&rows, keys, needle, &filters);

            let per = per_page.unwrap_or_else(|| {
                std::env::var("DESKO_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10)
            });
            let mut pager = Pager::new(per);
            pager.set_page(page, ix.len());

            match output {
                Output::Human => {
                    println!("{:<8} {:<28} {:<12} {}", "ID", "NAME", "STATUS", "CREATED");
                    for k in pager.range(ix.len()) {
                        let row = &rows[ix[k]];
                        println!(
                            "{:<8} {:<28} {:<12} {}",
                            row.id,
                            row.name,
                            row.status.as_deref().unwrap_or("-"),
                            render_age(row.created_ts)
                        );
                    }
                    eprintln!(
                        "page {} of {} ({} matching)",
                        pager.page,
                        pager.total_pages(ix.len()).max(1),
                        ix.len()
                    );
                }
                Output::Json => {
                    let items: Vec<_> = pager.range(ix.len()).map(|k| rows[ix[k]].clone()).collect();
                    println!("{}", serde_json::to_string_pretty(&items)?);
                }
            }
        }
        Commands::Get { entity, id } => {
            let api = connect(url, token)?;
            let v = api.get_raw(&entity, id).await?;
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        Commands::Search {
            entity,
            query,
            limit,
        } => {
            let q = query.join(" ");
            info!(entity = %entity, query = %q, limit, "search invoked");
            let api = connect(url, token)?;
            let resp = api.search(&entity, &q, limit).await?;
            match output {
                Output::Human => {
                    println!("{:<8} {:<28} {}", "ID", "NAME", "SCORE");
                    for h in &resp.hits {
                        println!("{:<8} {:<28} {:.1}", h.id, h.name, h.score);
                    }
                    eprintln!(
                        "debug: total={} after_filters={} matched={}",
                        resp.debug.total, resp.debug.after_filters, resp.debug.matched
                    );
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&resp.hits)?),
            }
        }
        Commands::Toggle {
            entity,
            id,
            on,
            off,
            value,
        } => {
            let (mapping, _widget) = columns::builtin_status_for(&entity);
            let status = if let Some(v) = value {
                status_value(&mapping, v)
            } else if on {
                mapping.on.clone()
            } else if off {
                mapping.off.clone()
            } else {
                bail!("pass --on, --off, or --value");
            };
            info!(entity = %entity, id, status = %status, "toggle invoked");
            let api = connect(url, token)?;
            api.ops().set_status(&entity, id, &status).await?;
            match output {
                Output::Human => println!("status set: {} #{} -> {}", entity, id, status),
                Output::Json => println!(
                    "{}",
                    serde_json::json!({"entity": entity, "id": id, "status": status})
                ),
            }
        }
        Commands::Rm {
            entity,
            id,
            ids,
            yes,
        } => {
            let ids: Vec<i64> = match id {
                Some(one) => vec![one],
                None => ids,
            };
            if ids.is_empty() {
                bail!("pass an id or --ids");
            }
            if !yes
                && !confirm(&format!(
                    "delete {} row(s) from {}?",
                    ids.len(),
                    entity
                ))?
            {
                eprintln!("aborted");
                return Ok(());
            }
            let api = connect(url, token)?;
            if let [single] = ids[..] {
                api.ops().delete(&entity, single).await?;
                match output {
                    Output::Human => println!("deleted {} #{}", entity, single),
                    Output::Json => println!(
                        "{}",
                        serde_json::json!({"entity": entity, "deleted": [single]})
                    ),
                }
            } else {
                let out = api.ops().delete_many(&entity, &ids).await?;
                match output {
                    Output::Human => {
                        println!("deleted {} of {}", out.deleted.len(), ids.len());
                        for (fid, err) in &out.failed {
                            eprintln!("#{}: {}", fid, err);
                        }
                    }
                    Output::Json => println!("{}", serde_json::to_string_pretty(&out)?),
                }
                if !out.failed.is_empty() {
                    bail!("{} of {} deletes failed", out.failed.len(), ids.len());
                }
            }
        }
        Commands::Save { entity, id, file } => {
            let text = if file == "-" {
                let mut s = String::new();
                std::io::stdin().read_to_string(&mut s)?;
                s
            } else {
                std::fs::read_to_string(&file).with_context(|| format!("reading {}", file))?
            };
            let payload: Value =
                serde_json::from_str(&text).context("parsing payload as JSON")?;
            let form = desko_schema::form_for(&entity);
            let draft = desko_schema::FormDraft::from_record(&form, &payload);
            let issues = desko_schema::validate(&form, &draft);
            if !issues.is_empty() {
                for i in &issues {
                    match &i.hint {
                        Some(h) => eprintln!("{}: {} ({})", i.field, i.error, h),
                        None => eprintln!("{}: {}", i.field, i.error),
                    }
                }
                bail!("payload failed validation with {} issue(s)", issues.len());
            }
            info!(entity = %entity, id = ?id, "save invoked");
            let api = connect(url, token)?;
            let outcome = api.ops().save(&entity, id, &payload).await?;
            match output {
                Output::Human => match &outcome {
                    desko_api::SaveOutcome::Created { id: Some(new_id) } => {
                        println!("created {} #{}", entity, new_id)
                    }
                    desko_api::SaveOutcome::Created { id: None } => println!("created {}", entity),
                    desko_api::SaveOutcome::Updated { id } => println!("saved {} #{}", entity, id),
                },
                Output::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }
        }
        Commands::Watch { entity } => {
            info!(entity = %entity, "watch invoked");
            let api = connect(url, token)?;
            let mut handle = api.watch(&entity).await?;
            loop {
                tokio::select! {
                    maybe = handle.rx.recv() => {
                        match maybe {
                            Some(d) => match output {
                                Output::Human => match d.kind {
                                    desko_core::DeltaKind::Applied => {
                                        let name = desko_resthub::to_lite(&entity, d.raw.clone())
                                            .map(|r| r.name)
                                            .unwrap_or_default();
                                        println!("+ {} #{} {}", entity, d.id, name);
                                    }
                                    desko_core::DeltaKind::Deleted => {
                                        println!("- {} #{}", entity, d.id);
                                    }
                                },
                                // line-delimited JSON, one event per line
                                Output::Json => println!("{}", serde_json::to_string(&d)?),
                            },
                            None => {
                                warn!("event stream closed; exiting watch loop");
                                break;
                            }
                        }
                    }
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; shutting down watch loop");
                        break;
                    }
                }
            }
            handle.cancel.cancel();
        }
        Commands::Saved { entity, id, limit } => {
            let api = connect(url, token)?;
            let items = api.saved_payloads(&entity, id, limit).await?;
            match output {
                Output::Human => {
                    for sp in &items {
                        println!("{}\t{}", sp.ts, sp.json);
                    }
                    if items.is_empty() {
                        eprintln!("no saved payloads for {} #{}", entity, id);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&items)?),
            }
        }
        Commands::Login { url, token, user } => {
            let ts = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            let store = SqliteStore::open_default()?;
            store.put_session(SessionRecord {
                base_url: url.clone(),
                token,
                user,
                ts,
            })?;
            println!("session stored for {}", url);
        }
        Commands::Stats => {
            let api = connect(url, token)?;
            let s = api.stats().await?;
            match output {
                Output::Human => {
                    println!("relist_secs: {}", s.relist_secs);
                    println!("http_timeout_secs: {}", s.http_timeout_secs);
                    println!("page_size: {}", s.page_size);
                    match s.results_soft_cap {
                        Some(v) => println!("results_soft_cap: {}", v),
                        None => println!("results_soft_cap: (none)"),
                    }
                    match &s.metrics_addr {
                        Some(a) => println!("metrics_addr: {}", a),
                        None => println!("metrics_addr: (none)"),
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&s)?),
            }
        }
    }

    Ok(())
}

fn render_age(creation_ts: i64) -> String {
    if creation_ts <= 0 {
        return "-".to_string();
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let mut secs = (now - creation_ts).max(0) as u64;
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3600;
    secs %= 3600;
    let mins = secs / 60;
    secs %= 60;
    if days > 0 {
        format!("{}d{}h", days, hours)
    } else if hours > 0 {
        format!("{}h{}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}
