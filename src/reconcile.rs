//! Applying document saves and status flips to storage.
//!
//! A save runs stabilize -> index -> write inside one immediate transaction; any
//! error rolls the whole unit back (the `Transaction` rolls back on drop).

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use rusqlite::{Connection, Result as SqliteResult, params};
use serde::Serialize;

use crate::index::{ParsedTodo, ParsedTopicEntry, index_markdown};
use crate::marker;
use crate::model::{Todo, TodoStatus, date_key, now_ms};
use crate::stabilize::stabilize_markers;
use crate::store::{self, Store};
use crate::toggle::toggle_checkbox;

/// What a save produced.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub date: String,
    /// Authoritative text as stored; may differ from the submitted text.
    pub markdown: String,
    pub todos: usize,
    pub created: usize,
    pub soft_deleted: usize,
    pub topic_entries: usize,
}

/// Save a date's document and reconcile its todos, topics and topic entries.
pub fn save_daily(store: &mut Store, date: NaiveDate, submitted: &str) -> Result<SaveOutcome, String> {
    let date = date_key(date);
    let outcome = save_in_tx(store, &date, submitted)
        .map_err(|e| format!("failed to save {}: {}", date, e))?;

    log::info!(
        "[SAVE] {}: {} todos ({} new, {} removed), {} topic entries",
        outcome.date,
        outcome.todos,
        outcome.created,
        outcome.soft_deleted,
        outcome.topic_entries
    );
    Ok(outcome)
}

fn save_in_tx(store: &mut Store, date: &str, submitted: &str) -> SqliteResult<SaveOutcome> {
    let now = now_ms();
    let tx = store.write_tx()?;

    let previous = store::load_daily(&tx, date)?
        .map(|doc| doc.markdown)
        .unwrap_or_default();
    let stabilized = stabilize_markers(&previous, submitted);
    let indexed = index_markdown(&stabilized);
    let carried = marker::marked_todo_ids(&previous);

    upsert_daily(&tx, date, &indexed.markdown, now)?;

    let incoming: HashSet<&str> = indexed.todos.iter().map(|t| t.id.as_str()).collect();
    let soft_deleted = soft_delete_missing(&tx, date, &incoming, now)?;

    let mut created = 0;
    for todo in &indexed.todos {
        if upsert_todo(&tx, date, todo, carried.contains(&todo.id), now)? {
            created += 1;
        }
    }

    ensure_topics(&tx, &indexed.topic_entries, now)?;
    replace_topic_entries(&tx, date, &indexed.topic_entries, now)?;

    tx.commit()?;

    log::debug!(
        "[SAVE] {}: stabilized {} -> {} bytes, canonical {} bytes",
        date,
        submitted.len(),
        stabilized.len(),
        indexed.markdown.len()
    );

    Ok(SaveOutcome {
        date: date.to_string(),
        todos: indexed.todos.len(),
        created,
        soft_deleted,
        topic_entries: indexed.topic_entries.len(),
        markdown: indexed.markdown,
    })
}

fn upsert_daily(conn: &Connection, date: &str, markdown: &str, now: i64) -> SqliteResult<()> {
    conn.execute(
        "INSERT INTO daily_notes (date, markdown, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(date) DO UPDATE SET
            markdown = excluded.markdown,
            updated_at = excluded.updated_at",
        params![date, markdown, now],
    )?;
    Ok(())
}

/// Mark every live todo of `date` not in `incoming` as deleted. Returns the count.
fn soft_delete_missing(
    conn: &Connection,
    date: &str,
    incoming: &HashSet<&str>,
    now: i64,
) -> SqliteResult<usize> {
    let live: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT id FROM todos WHERE daily_date = ?1 AND deleted_at IS NULL")?;
        stmt.query_map(params![date], |row| row.get(0))?
            .collect::<SqliteResult<Vec<String>>>()?
    };

    let mut count = 0;
    for id in live.iter().filter(|id| !incoming.contains(id.as_str())) {
        conn.execute(
            "UPDATE todos SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        count += 1;
    }
    Ok(count)
}

/// Write one indexed todo. Returns `true` if a new row was created.
///
/// Ids carried over from the previous document update their row in place. Any other
/// id was minted during this save and is inserted; a primary-key conflict on it is an
/// error, never a merge with an unrelated todo.
fn upsert_todo(
    conn: &Connection,
    date: &str,
    todo: &ParsedTodo,
    carried: bool,
    now: i64,
) -> SqliteResult<bool> {
    if carried {
        let updated = conn.execute(
            "UPDATE todos SET
                daily_date = ?1, title = ?2, status = ?3, topic_name = ?4,
                deleted_at = NULL, updated_at = ?5
             WHERE id = ?6",
            params![date, todo.title, todo.status, todo.topic_name, now, todo.id],
        )?;
        if updated > 0 {
            return Ok(false);
        }
    }

    conn.execute(
        "INSERT INTO todos
            (id, daily_date, title, status, topic_name, deleted_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)",
        params![todo.id, date, todo.title, todo.status, todo.topic_name, now],
    )?;
    conn.execute(
        "INSERT INTO todo_notes (todo_id, markdown, updated_at) VALUES (?1, '', ?2)
         ON CONFLICT(todo_id) DO NOTHING",
        params![todo.id, now],
    )?;
    Ok(true)
}

fn ensure_topics(conn: &Connection, entries: &[ParsedTopicEntry], now: i64) -> SqliteResult<()> {
    let names: BTreeSet<&str> = entries.iter().map(|e| e.topic_name.as_str()).collect();
    for name in names {
        conn.execute(
            "INSERT INTO topics (name, created_at) VALUES (?1, ?2)
             ON CONFLICT(name) DO NOTHING",
            params![name, now],
        )?;
    }
    Ok(())
}

fn replace_topic_entries(
    conn: &Connection,
    date: &str,
    entries: &[ParsedTopicEntry],
    now: i64,
) -> SqliteResult<()> {
    conn.execute(
        "DELETE FROM topic_entries WHERE daily_date = ?1",
        params![date],
    )?;
    for entry in entries {
        conn.execute(
            "INSERT INTO topic_entries
                (id, topic_name, daily_date, content_markdown, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                marker::new_todo_id(),
                entry.topic_name,
                date,
                entry.content_markdown,
                now
            ],
        )?;
    }
    Ok(())
}

/// Change a todo's status from the entity side and mirror it into its source line.
pub fn set_todo_status(store: &mut Store, id: &str, status: TodoStatus) -> Result<Todo, String> {
    let todo = set_status_in_tx(store, id, status)
        .map_err(|e| format!("failed to update todo {}: {}", id, e))?
        .ok_or_else(|| format!("todo not found: {}", id))?;

    log::info!("[TODO] {} -> {}", todo.id, todo.status);
    Ok(todo)
}

fn set_status_in_tx(
    store: &mut Store,
    id: &str,
    status: TodoStatus,
) -> SqliteResult<Option<Todo>> {
    let now = now_ms();
    let tx = store.write_tx()?;

    let Some(todo) = store::load_todo(&tx, id, false)? else {
        return Ok(None);
    };

    tx.execute(
        "UPDATE todos SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, now, todo.id],
    )?;

    if let Some(doc) = store::load_daily(&tx, &todo.daily_date)? {
        let patched = toggle_checkbox(&doc.markdown, &todo.id, status.is_done());
        if patched != doc.markdown {
            tx.execute(
                "UPDATE daily_notes SET markdown = ?1, updated_at = ?2 WHERE date = ?3",
                params![patched, now, doc.date],
            )?;
        } else {
            log::debug!("[TODO] {}: no checkbox to patch in {}", todo.id, doc.date);
        }
    }

    let updated = store::load_todo(&tx, id, false)?;
    tx.commit()?;
    Ok(updated)
}
