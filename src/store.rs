//! Durable session store
//!
//! Append-only SQLite table of closed sessions. The full record is kept as
//! JSON next to a few columns used for inspection with the sqlite shell.

mod schema;

use schema::SCHEMA;

use crate::runtime::SessionStore;
use crate::session::Session;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt session record: {0}")]
    Record(#[from] serde_json::Error),
    #[error("Session already stored: {0}")]
    DuplicateSession(String),
    #[error("Session is still open: {0}")]
    NotFinalized(String),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Append a closed session
    pub fn append_session(&self, session: &Session) -> DbResult<()> {
        if !session.is_closed() {
            return Err(DbError::NotFinalized(session.id().to_string()));
        }

        let record = serde_json::to_string(session)?;
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO sessions (id, vehicle_id, route_id, turn, start_time, end_time, total_collected, board_count, record, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO NOTHING",
            params![
                session.id(),
                session.vehicle_id(),
                session.route_id(),
                session.turn(),
                session.start_time().timestamp_millis(),
                session.end_time().map(|t| t.timestamp_millis()),
                i64::try_from(session.total_collected()).unwrap_or(i64::MAX),
                i64::try_from(session.board_count()).unwrap_or(i64::MAX),
                record,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            return Err(DbError::DuplicateSession(session.id().to_string()));
        }
        Ok(())
    }

    /// All stored sessions in commit order
    pub fn list_sessions(&self) -> DbResult<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT record FROM sessions ORDER BY seq ASC")?;
        let records = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        records
            .iter()
            .map(|raw| serde_json::from_str(raw).map_err(DbError::from))
            .collect()
    }

    pub fn session_count(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// The session list as a JSON array, the service's persisted artifact
    pub fn export_json(&self) -> DbResult<String> {
        Ok(serde_json::to_string_pretty(&self.list_sessions()?)?)
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn append(&self, session: &Session) -> Result<(), DbError> {
        self.append_session(session)?;
        tracing::info!(
            session_id = %session.id(),
            route_id = %session.route_id(),
            total_collected = session.total_collected(),
            "Session stored"
        );
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Session>, DbError> {
        self.list_sessions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Coordinates;
    use chrono::{DateTime, Duration, TimeZone};

    const HERE: Coordinates = Coordinates::new(4.53, -75.68);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()
    }

    fn closed_session(id: &str, boards: usize) -> Session {
        let mut session = Session::new(id, "v1", "1", "Mañana (5:00 - 13:00)", t0());
        for i in 0..boards {
            session.board(t0() + Duration::minutes(i as i64), HERE);
        }
        session.finalize(12_000, t0() + Duration::hours(3));
        session
    }

    #[test]
    fn test_append_and_list_in_order() {
        let db = Database::open_in_memory().unwrap();
        db.append_session(&closed_session("b", 2)).unwrap();
        db.append_session(&closed_session("a", 1)).unwrap();

        let sessions = db.list_sessions().unwrap();
        let ids: Vec<_> = sessions.iter().map(Session::id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(sessions[0], closed_session("b", 2));
        assert_eq!(sessions[0].total_collected(), 24_000);
        assert_eq!(db.session_count().unwrap(), 2);
    }

    #[test]
    fn test_rejects_open_session() {
        let db = Database::open_in_memory().unwrap();
        let open = Session::new("open", "v1", "1", "Tarde", t0());
        assert!(matches!(
            db.append_session(&open),
            Err(DbError::NotFinalized(id)) if id == "open"
        ));
        assert_eq!(db.session_count().unwrap(), 0);
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let db = Database::open_in_memory().unwrap();
        db.append_session(&closed_session("dup", 1)).unwrap();
        assert!(matches!(
            db.append_session(&closed_session("dup", 5)),
            Err(DbError::DuplicateSession(_))
        ));

        // The original record is untouched
        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].board_count(), 1);
    }

    #[test]
    fn test_empty_store_loads_empty_list() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.list_sessions().unwrap().is_empty());
        assert_eq!(db.export_json().unwrap(), "[]");
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");

        {
            let db = Database::open(&path).unwrap();
            db.append_session(&closed_session("persisted", 3)).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id(), "persisted");
        assert!(sessions[0].is_closed());
    }

    #[test]
    fn test_export_json_shape() {
        let db = Database::open_in_memory().unwrap();
        db.append_session(&closed_session("s1", 2)).unwrap();

        let exported: serde_json::Value = serde_json::from_str(&db.export_json().unwrap()).unwrap();
        let first = &exported[0];
        assert_eq!(first["id"], "s1");
        assert_eq!(first["totalCollected"], 24_000);
        assert_eq!(first["closed"], true);
        assert_eq!(first["events"].as_array().unwrap().len(), 2);
        assert_eq!(first["endTime"], (t0() + Duration::hours(3)).timestamp_millis());
    }
}
