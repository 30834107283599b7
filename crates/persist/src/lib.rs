//! Desko persistence: minimal SQLite store for the session record and
//! recent save payloads. Keep code tiny and predictable.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

use desko_core::RowId;

/// The single stored connection identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub base_url: String,
    pub token: String,
    pub user: Option<String>,
    pub ts: i64,
}

/// One payload as sent to the backend, kept for quick re-apply and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPayload {
    pub entity: String,
    pub row_id: RowId,
    pub ts: i64,
    pub json: String,
}

pub trait Store {
    fn put_session(&self, rec: SessionRecord) -> Result<()>;
    fn get_session(&self) -> Result<Option<SessionRecord>>;
    fn put_saved(&self, sp: SavedPayload) -> Result<()>;
    fn get_saved(&self, entity: &str, row_id: RowId, limit: Option<usize>) -> Result<Vec<SavedPayload>>;
}

/// SQLite-backed store. Simple, synchronous. Nothing here is latency
/// sensitive.
pub struct SqliteStore {
    db: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    pub fn open_default() -> Result<Self> {
        let path = std::env::var("DESKO_DB_PATH").unwrap_or_else(|_| default_db_path());
        Self::open(&path)
    }

    pub fn open(path: &str) -> Result<Self> {
        let started = std::time::Instant::now();
        let db = rusqlite::Connection::open(path)
            .with_context(|| format!("opening sqlite db at {}", path))?;
        db.pragma_update(None, "journal_mode", &"WAL").ok();
        db.pragma_update(None, "synchronous", &"NORMAL").ok();
        db.execute(
            "CREATE TABLE IF NOT EXISTS session (
                id       INTEGER PRIMARY KEY CHECK (id = 1),
                base_url TEXT NOT NULL,
                token    TEXT NOT NULL,
                user     TEXT,
                ts       INTEGER NOT NULL
            )",
            [],
        )
        .context("creating session table")?;
        db.execute(
            "CREATE TABLE IF NOT EXISTS saved_payloads (
                entity TEXT NOT NULL,
                row_id INTEGER NOT NULL,
                ts     INTEGER NOT NULL,
                json   TEXT NOT NULL
            )",
            [],
        )
        .context("creating saved_payloads table")?;
        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_saved_entity_row_ts ON saved_payloads(entity, row_id, ts DESC)",
            [],
        )
        .ok();
        let me = Self {
            db: std::sync::Mutex::new(db),
        };
        histogram!("persist_open_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(me)
    }
}

impl Store for SqliteStore {
    fn put_session(&self, rec: SessionRecord) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR REPLACE INTO session(id, base_url, token, user, ts) VALUES (1, ?1, ?2, ?3, ?4)",
            (&rec.base_url, &rec.token, &rec.user, rec.ts),
        )?;
        counter!("persist_session_put_total", 1u64);
        Ok(())
    }

    fn get_session(&self) -> Result<Option<SessionRecord>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT base_url, token, user, ts FROM session WHERE id = 1")?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(SessionRecord {
                base_url: row.get(0)?,
                token: row.get(1)?,
                user: row.get(2)?,
                ts: row.get(3)?,
            }));
        }
        Ok(None)
    }

    fn put_saved(&self, sp: SavedPayload) -> Result<()> {
        let started = std::time::Instant::now();
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO saved_payloads(entity, row_id, ts, json) VALUES (?1, ?2, ?3, ?4)",
            (&sp.entity, sp.row_id, sp.ts, &sp.json),
        )?;
        // Keep latest 3 per record (delete older rows by rowid)
        tx.execute(
            "DELETE FROM saved_payloads
             WHERE entity = ?1 AND row_id = ?2
               AND rowid NOT IN (
                   SELECT rowid FROM saved_payloads
                   WHERE entity = ?1 AND row_id = ?2
                   ORDER BY ts DESC, rowid DESC LIMIT 3
               )",
            (&sp.entity, sp.row_id),
        )?;
        tx.commit()?;
        histogram!("persist_put_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("persist_put_total", 1u64);
        Ok(())
    }

    fn get_saved(&self, entity: &str, row_id: RowId, limit: Option<usize>) -> Result<Vec<SavedPayload>> {
        let started = std::time::Instant::now();
        let cap = limit.unwrap_or(3);
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT ts, json FROM saved_payloads
             WHERE entity = ?1 AND row_id = ?2
             ORDER BY ts DESC, rowid DESC LIMIT ?3",
        )?;
        let mut rows = stmt.query((entity, row_id, cap as i64))?;
        let mut out: Vec<SavedPayload> = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(SavedPayload {
                entity: entity.to_string(),
                row_id,
                ts: row.get(0)?,
                json: row.get(1)?,
            });
        }
        histogram!("persist_get_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(out)
    }
}

fn default_db_path() -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let mut p = std::path::PathBuf::from(home);
        p.push(".desko");
        let _ = std::fs::create_dir_all(&p);
        p.push("desko.db");
        return p.to_string_lossy().to_string();
    }
    // Fallback to current directory
    "desko.db".to_string()
}

pub fn now_ts() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> String {
        let dir = std::env::temp_dir();
        let f = format!(
            "desko-test-{}.db",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        dir.join(f).to_string_lossy().to_string()
    }

    #[test]
    fn session_roundtrip_overwrites() {
        let s = SqliteStore::open(&temp_db()).unwrap();
        assert!(s.get_session().unwrap().is_none());
        s.put_session(SessionRecord {
            base_url: "https://api.acme.io".into(),
            token: "t1".into(),
            user: None,
            ts: 10,
        })
        .unwrap();
        s.put_session(SessionRecord {
            base_url: "https://api.acme.io".into(),
            token: "t2".into(),
            user: Some("ana".into()),
            ts: 20,
        })
        .unwrap();
        let rec = s.get_session().unwrap().unwrap();
        assert_eq!(rec.token, "t2");
        assert_eq!(rec.user.as_deref(), Some("ana"));
    }

    #[test]
    fn saved_payloads_rotate_per_record() {
        let s = SqliteStore::open(&temp_db()).unwrap();
        for i in 0..5 {
            s.put_saved(SavedPayload {
                entity: "leads".into(),
                row_id: 7,
                ts: i,
                json: format!("{{\"name\": \"v{}\"}}", i),
            })
            .unwrap();
        }
        // A different record is untouched by the rotation
        s.put_saved(SavedPayload {
            entity: "leads".into(),
            row_id: 8,
            ts: 1,
            json: "{}".into(),
        })
        .unwrap();

        let rows = s.get_saved("leads", 7, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].json, "{\"name\": \"v4\"}");
        assert_eq!(rows[2].json, "{\"name\": \"v2\"}");
        assert_eq!(s.get_saved("leads", 8, None).unwrap().len(), 1);
    }
}
