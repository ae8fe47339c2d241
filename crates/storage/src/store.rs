//! SQLite audit store implementation.

use crate::{Event, EventKind, Result, SessionId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;

/// Per-session aggregate returned by [`AuditStore::list_sessions`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub user_id: Option<UserId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub denial_count: usize,
}

/// SQLite-backed audit store.
pub struct AuditStore {
    conn: Connection,
}

impl AuditStore {
    /// Open or create an audit store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory audit store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                session_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_session
                ON events(session_id, seq);
            "#,
        )?;
        Ok(())
    }

    /// Append an event to the store.
    pub fn append(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, seq, session_id, timestamp, kind, data)
             VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM events), ?2, ?3, ?4, ?5)",
            params![
                event.id.to_string(),
                event.session_id.to_string(),
                event.timestamp.to_rfc3339(),
                event.kind.name(),
                serde_json::to_string(&event.kind)?,
            ],
        )?;
        Ok(())
    }

    /// Load all events for a session, in append order.
    pub fn load_session(&self, session_id: SessionId) -> Result<Vec<Event>> {
        self.load_events(session_id, None)
    }

    /// Load events for a session, optionally only those of one kind
    /// (e.g. `"access_denied"`).
    pub fn load_events(&self, session_id: SessionId, kind: Option<&str>) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, timestamp, data FROM events
             WHERE session_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY seq",
        )?;

        let events = stmt
            .query_map(params![session_id.to_string(), kind], |row| {
                let id: String = row.get(0)?;
                let session_id: String = row.get(1)?;
                let timestamp: String = row.get(2)?;
                let data: String = row.get(3)?;
                Ok((id, session_id, timestamp, data))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, session_id, timestamp, data)| {
                Some(Event {
                    id: id.parse().ok()?,
                    session_id: session_id.parse().ok()?,
                    timestamp: timestamp.parse().ok()?,
                    kind: serde_json::from_str(&data).ok()?,
                })
            })
            .collect();

        Ok(events)
    }

    /// Summaries of every recorded session, most recent first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id,
                    MIN(timestamp),
                    MAX(CASE WHEN kind = 'session_end' THEN timestamp END),
                    SUM(CASE WHEN kind = 'access_denied' THEN 1 ELSE 0 END),
                    (SELECT data FROM events s
                      WHERE s.session_id = e.session_id AND s.kind = 'session_start'
                      ORDER BY s.seq LIMIT 1)
             FROM events e
             GROUP BY session_id
             ORDER BY MAX(seq) DESC",
        )?;

        let sessions = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let started: String = row.get(1)?;
                let ended: Option<String> = row.get(2)?;
                let denials: i64 = row.get(3)?;
                let start_data: Option<String> = row.get(4)?;
                Ok((id, started, ended, denials, start_data))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, started, ended, denials, start_data)| {
                let user_id = start_data
                    .and_then(|data| serde_json::from_str::<EventKind>(&data).ok())
                    .and_then(|kind| match kind {
                        EventKind::SessionStart { user_id } => Some(user_id),
                        _ => None,
                    });
                Some(SessionSummary {
                    id: id.parse().ok()?,
                    user_id,
                    started_at: started.parse().ok()?,
                    ended_at: ended.and_then(|t| t.parse().ok()),
                    denial_count: usize::try_from(denials).unwrap_or(0),
                })
            })
            .collect();

        Ok(sessions)
    }
}
