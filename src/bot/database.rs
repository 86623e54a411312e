//! Append-only SQLite log of chat lines.
//!
//! One row per observed or bot-emitted message. There is no update or
//! delete path; `id` order is conversation order.

use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// One logged chat line.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub id: i64,
    /// Telegram message id (not unique across chats).
    pub message_id: i64,
    pub author: String,
    pub text: String,
    /// Telegram message id this line replied to. Dangling references are
    /// legal: replies to pre-history messages are never backfilled.
    pub reply_to_id: Option<i64>,
    pub timestamp_millis: i64,
}

/// A line about to be appended.
pub struct NewLine<'a> {
    pub message_id: i64,
    pub author: &'a str,
    pub text: &'a str,
    pub reply_to_id: Option<i64>,
    pub timestamp_millis: i64,
}

/// Persistent log backing context assembly and summarization.
pub struct MessageLog {
    conn: Mutex<Connection>,
}

impl MessageLog {
    /// Create a new in-memory log.
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
        let log = Self { conn: Mutex::new(conn) };
        log.init_schema();
        log
    }

    /// Open (or create) the log at the given path.
    pub fn open(path: &Path) -> Self {
        let conn = Connection::open(path).expect("Failed to open database");
        let log = Self { conn: Mutex::new(conn) };
        log.init_schema();
        info!("Loaded message log from {:?} ({} lines)", path, log.line_count());
        log
    }

    fn init_schema(&self) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id INTEGER NOT NULL,
                author TEXT NOT NULL,
                text TEXT NOT NULL,
                reply_to_id INTEGER,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
            CREATE INDEX IF NOT EXISTS idx_messages_reply_to ON messages(reply_to_id);
        "#).expect("Failed to initialize database schema");
    }

    /// Append one line. Failures are logged, not propagated; a dropped
    /// line only shrinks the context window.
    pub fn append(&self, line: &NewLine) {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO messages (message_id, author, text, reply_to_id, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![line.message_id, line.author, line.text, line.reply_to_id, line.timestamp_millis],
        ).unwrap_or_else(|e| {
            warn!("Failed to append message: {e}");
            0
        });
    }

    /// The last `limit` lines, in chronological order.
    pub fn recent(&self, limit: usize) -> Vec<LogLine> {
        self.select_desc("SELECT id, message_id, author, text, reply_to_id, timestamp
             FROM messages ORDER BY id DESC LIMIT ?1", params![limit as i64])
    }

    /// Lines newer than `cutoff_millis`, newest `limit` of them, in
    /// chronological order.
    pub fn since(&self, cutoff_millis: i64, limit: usize) -> Vec<LogLine> {
        self.select_desc(
            "SELECT id, message_id, author, text, reply_to_id, timestamp
             FROM messages WHERE timestamp > ?1 ORDER BY id DESC LIMIT ?2",
            params![cutoff_millis, limit as i64],
        )
    }

    fn select_desc(&self, sql: &str, args: impl rusqlite::Params) -> Vec<LogLine> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                warn!("Failed to prepare query: {e}");
                return Vec::new();
            }
        };

        let rows = stmt.query_map(args, |row| {
            Ok(LogLine {
                id: row.get(0)?,
                message_id: row.get(1)?,
                author: row.get(2)?,
                text: row.get(3)?,
                reply_to_id: row.get(4)?,
                timestamp_millis: row.get(5)?,
            })
        });

        let mut result: Vec<LogLine> = match rows {
            Ok(rows) => rows.filter_map(Result::ok).collect(),
            Err(e) => {
                warn!("Query failed: {e}");
                return Vec::new();
            }
        };

        result.reverse();
        result
    }

    /// Total line count.
    pub fn line_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
