#![forbid(unsafe_code)]

use tracing::info;

use crate::DeskoGuiApp;

pub(crate) fn process_discovery(app: &mut DeskoGuiApp) {
    use std::sync::mpsc::TryRecvError;
    if let Some(rx) = &app.discovery.rx {
        match rx.try_recv() {
            Ok(Ok(v)) => {
                // Catalog order is curated; keep it as served.
                info!(kinds = v.len(), "ui: discovery ready");
                app.discovery.kinds = v;
                app.discovery.rx = None;
                if app.selection.entity.is_none() {
                    if let Some(first) = app.discovery.kinds.first() {
                        app.selection.entity = Some(first.slug.clone());
                    }
                }
            }
            Ok(Err(err)) => {
                info!(error = %err, "ui: discovery error");
                app.log = format!("discover error: {}", err);
                app.last_error = Some(err);
                app.discovery.rx = None;
            }
            Err(TryRecvError::Disconnected) => {
                app.discovery.rx = None;
            }
            Err(TryRecvError::Empty) => {}
        }
    }
}
