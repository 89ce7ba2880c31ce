//! SQLite storage for daily documents and their derived entities.
//!
//! The store is opened once by the caller and passed down explicitly. Row loaders
//! are free functions over `&Connection` so they work both on the store and inside
//! a write transaction (which derefs to `Connection`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{
    Connection, OptionalExtension, Result as SqliteResult, Row, Transaction, TransactionBehavior,
    params,
};

use crate::model::{DailyDocument, Todo, TodoNotes, TodoStatus, TopicEntry, now_ms};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS daily_notes (
    date TEXT PRIMARY KEY,
    markdown TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS daily_notes_updated_at_idx ON daily_notes(updated_at);

CREATE TABLE IF NOT EXISTS topics (
    name TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS todos (
    id TEXT PRIMARY KEY,
    daily_date TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    topic_name TEXT,
    deleted_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS todos_daily_date_idx ON todos(daily_date);
CREATE INDEX IF NOT EXISTS todos_status_idx ON todos(status);
CREATE INDEX IF NOT EXISTS todos_topic_name_idx ON todos(topic_name);

CREATE TABLE IF NOT EXISTS todo_notes (
    todo_id TEXT PRIMARY KEY REFERENCES todos(id) ON DELETE CASCADE,
    markdown TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS topic_entries (
    id TEXT PRIMARY KEY,
    topic_name TEXT NOT NULL REFERENCES topics(name) ON DELETE CASCADE,
    daily_date TEXT NOT NULL,
    content_markdown TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS topic_entries_topic_name_idx ON topic_entries(topic_name);
CREATE INDEX IF NOT EXISTS topic_entries_daily_date_idx ON topic_entries(daily_date);
CREATE INDEX IF NOT EXISTS topic_entries_topic_daily_idx ON topic_entries(topic_name, daily_date);
"#;

const TODO_COLUMNS: &str =
    "id, daily_date, title, status, topic_name, deleted_at, created_at, updated_at";

/// Handle to the journal database.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, String> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| format!("creating {}: {}", parent.display(), e))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| format!("opening database {}: {}", path.display(), e))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| format!("configuring database: {}", e))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| format!("configuring database: {}", e))?;

        let store = Store {
            conn,
            path: Some(path.to_path_buf()),
        };
        store
            .migrate()
            .map_err(|e| format!("migrating database {}: {}", path.display(), e))?;

        log::debug!("[STORE] opened {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory().map_err(|e| format!("opening database: {}", e))?;
        let store = Store { conn, path: None };
        store
            .migrate()
            .map_err(|e| format!("migrating database: {}", e))?;
        Ok(store)
    }

    fn migrate(&self) -> SqliteResult<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)
    }

    /// Close the connection, reporting any error SQLite raises while doing so.
    pub fn close(self) -> Result<(), String> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, e)| format!("closing database: {}", e))?;
        if let Some(path) = path {
            log::debug!("[STORE] closed {}", path.display());
        }
        Ok(())
    }

    /// Database file path (`None` for in-memory stores).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction that holds the database write lock from the start.
    ///
    /// Concurrent writers queue on the lock (bounded by the busy timeout), so no two
    /// read-modify-write sequences interleave.
    pub(crate) fn write_tx(&mut self) -> SqliteResult<Transaction<'_>> {
        self.conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn daily(&self, date: &str) -> SqliteResult<Option<DailyDocument>> {
        load_daily(&self.conn, date)
    }

    /// Saved dates, newest first.
    pub fn list_dates(&self, limit: usize) -> SqliteResult<Vec<DailyDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, markdown, created_at, updated_at FROM daily_notes
             ORDER BY date DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], daily_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Non-deleted todos, most recently updated first.
    pub fn list_todos(
        &self,
        status: Option<TodoStatus>,
        limit: usize,
    ) -> SqliteResult<Vec<Todo>> {
        let sql = format!(
            "SELECT {} FROM todos
             WHERE deleted_at IS NULL AND (?1 IS NULL OR status = ?1)
             ORDER BY updated_at DESC, rowid DESC LIMIT ?2",
            TODO_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![status, limit as i64], todo_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Todos owned by a date in document order.
    pub fn todos_for_date(&self, date: &str, include_deleted: bool) -> SqliteResult<Vec<Todo>> {
        let sql = format!(
            "SELECT {} FROM todos
             WHERE daily_date = ?1 AND (?2 OR deleted_at IS NULL)
             ORDER BY rowid",
            TODO_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![date, include_deleted], todo_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn todo(&self, id: &str, include_deleted: bool) -> SqliteResult<Option<Todo>> {
        load_todo(&self.conn, id, include_deleted)
    }

    /// Ids of non-deleted todos starting with `prefix`.
    pub fn todo_ids_with_prefix(&self, prefix: &str) -> SqliteResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM todos
             WHERE deleted_at IS NULL AND substr(id, 1, length(?1)) = ?1
             ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![prefix], |row| row.get(0))?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(ids)
    }

    pub fn todo_notes(&self, todo_id: &str) -> SqliteResult<Option<TodoNotes>> {
        self.conn
            .query_row(
                "SELECT todo_id, markdown, updated_at FROM todo_notes WHERE todo_id = ?1",
                params![todo_id],
                |row| {
                    Ok(TodoNotes {
                        todo_id: row.get(0)?,
                        markdown: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    /// Replace a todo's notes. Returns `false` if the todo does not exist.
    ///
    /// Independent of any date-level transaction.
    pub fn set_todo_notes(&self, todo_id: &str, markdown: &str) -> SqliteResult<bool> {
        if load_todo(&self.conn, todo_id, true)?.is_none() {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO todo_notes (todo_id, markdown, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(todo_id) DO UPDATE SET
                markdown = excluded.markdown,
                updated_at = excluded.updated_at",
            params![todo_id, markdown, now_ms()],
        )?;
        Ok(true)
    }

    /// Topics with at least one entry, newest topic first.
    pub fn list_topics(&self, limit: usize) -> SqliteResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM topics t
             WHERE EXISTS (SELECT 1 FROM topic_entries e WHERE e.topic_name = t.name)
             ORDER BY t.created_at DESC, t.name LIMIT ?1",
        )?;
        let names = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(names)
    }

    pub fn topic_exists(&self, name: &str) -> SqliteResult<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM topics WHERE name = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
    }

    /// Entries of one topic, newest date first.
    pub fn topic_entries(&self, name: &str, limit: usize) -> SqliteResult<Vec<TopicEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, topic_name, daily_date, content_markdown, created_at, updated_at
             FROM topic_entries WHERE topic_name = ?1
             ORDER BY daily_date DESC, updated_at DESC, rowid LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![name, limit as i64], entry_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Entries of one date in document order.
    pub fn entries_for_date(&self, date: &str) -> SqliteResult<Vec<TopicEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, topic_name, daily_date, content_markdown, created_at, updated_at
             FROM topic_entries WHERE daily_date = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![date], entry_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

// ============================================================================
// Row loaders (usable with a Connection or a Transaction)
// ============================================================================

pub(crate) fn load_daily(conn: &Connection, date: &str) -> SqliteResult<Option<DailyDocument>> {
    conn.query_row(
        "SELECT date, markdown, created_at, updated_at FROM daily_notes WHERE date = ?1",
        params![date],
        daily_from_row,
    )
    .optional()
}

pub(crate) fn load_todo(
    conn: &Connection,
    id: &str,
    include_deleted: bool,
) -> SqliteResult<Option<Todo>> {
    let sql = format!(
        "SELECT {} FROM todos WHERE id = ?1 AND (?2 OR deleted_at IS NULL)",
        TODO_COLUMNS
    );
    conn.query_row(&sql, params![id, include_deleted], todo_from_row)
        .optional()
}

fn daily_from_row(row: &Row<'_>) -> SqliteResult<DailyDocument> {
    Ok(DailyDocument {
        date: row.get(0)?,
        markdown: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn todo_from_row(row: &Row<'_>) -> SqliteResult<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        daily_date: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        topic_name: row.get(4)?,
        deleted_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> SqliteResult<TopicEntry> {
    Ok(TopicEntry {
        id: row.get(0)?,
        topic_name: row.get(1)?,
        daily_date: row.get(2)?,
        content_markdown: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
