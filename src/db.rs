use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::session::TestSession;

/// Local persistence: key/value settings (remote-store owner/repo only,
/// never credentials) and finished session summaries.
pub struct DashboardDb {
    conn: Mutex<Connection>,
    #[allow(dead_code)]
    db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub session_id: String,
    pub successful: usize,
    pub total: usize,
    pub finished_at: String,
    pub results_json: String,
}

impl DashboardDb {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("vortex-dashboard.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS test_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                successful INTEGER NOT NULL,
                total INTEGER NOT NULL,
                finished_at TEXT NOT NULL,
                results_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_finished
                ON test_sessions(finished_at);
        ",
        )?;
        Ok(())
    }

    pub fn save_setting(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn save_store_settings(&self, owner: &str, repo: &str) -> anyhow::Result<()> {
        self.save_setting("store_owner", owner)?;
        self.save_setting("store_repo", repo)
    }

    pub fn load_store_settings(&self) -> anyhow::Result<Option<(String, String)>> {
        let owner = self.get_setting("store_owner")?;
        let repo = self.get_setting("store_repo")?;
        Ok(owner.zip(repo))
    }

    /// Record a finished session for the dashboard's history view.
    pub fn save_session_summary(
        &self,
        session: &TestSession,
        successful: usize,
    ) -> anyhow::Result<i64> {
        let finished_at = session
            .finished_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        let results_json = serde_json::to_string(&session.records)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO test_sessions (session_id, successful, total, finished_at, results_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                successful as i64,
                session.total as i64,
                finished_at,
                results_json
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn latest_session(&self) -> anyhow::Result<Option<StoredSession>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT session_id, successful, total, finished_at, results_json
                 FROM test_sessions ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(StoredSession {
                        session_id: row.get(0)?,
                        successful: row.get::<_, i64>(1)? as usize,
                        total: row.get::<_, i64>(2)? as usize,
                        finished_at: row.get(3)?,
                        results_json: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
