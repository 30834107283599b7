use std::str::FromStr;
use std::sync::Arc;

use desko_api::Session;
use desko_persist::{SqliteStore, Store};

fn init_tracing() {
    let env = std::env::var("DESKO_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Env wins over the persisted record so a shell override never fights the
/// session saved by `deskoctl login`.
fn resolve_session() -> Option<Session> {
    if let Some(s) = Session::from_env() {
        return Some(s);
    }
    let store = SqliteStore::open_default().ok()?;
    store.get_session().ok().flatten().map(|rec| Session {
        base_url: rec.base_url,
        token: rec.token,
        user: rec.user,
    })
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    init_tracing();
    let Some(session) = resolve_session() else {
        eprintln!("no session: set DESKO_API_URL/DESKO_TOKEN or run `deskoctl login`");
        std::process::exit(2);
    };
    let base_url = session.base_url.clone();
    let api = match desko_api::InProcApi::connect(session) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            eprintln!("backend error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = desko_gui::run_native(api, base_url) {
        eprintln!("GUI error: {}", e);
        std::process::exit(1);
    }
}
