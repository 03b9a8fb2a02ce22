// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Data access layer.
//!
//! This module handles all interactions with the SQLite database backing the
//! audiobook library. The library is a tree: a single `items` table holds
//! both folders and books, addressed by a `relative_path` that doubles as
//! the item's location below the managed storage root.
//!
//! # Tables
//!
//! * `items` - Folders and books. `parent_path` is `NULL` for items at the
//!   library root, otherwise the `relative_path` of the owning folder.
//!
//! # Invariants
//!
//! * `relative_path` is unique across the library.
//! * An item has exactly one parent (the root or one folder).
//! * Folder aggregate fields (`duration`, `percent_completed`,
//!   `is_finished`) are derived from direct children and only change via
//!   [`rebuild_folder_stats`].
//!
//! # Performance
//!
//! Most functions in this module use [`rusqlite::Connection::prepare_cached`]
//! to reduce SQL parsing overhead.

pub(crate) mod import;
mod model;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{DeleteMode, ItemKind, SimpleLibraryItem, SortKind};

const MIN_SEARCH_LEN: usize = 3;

/// Opens a connection to the SQLite database and configures performance
/// settings.
///
/// This function performs the following setup:
/// * **WAL Mode**: Enables Write-Ahead Logging for better concurrency.
/// * **Performance Tuning**: Sets synchronous mode to `NORMAL` and increases
///   the cache size.
/// * **Schema**: Executes [`create_schema`] to ensure all tables and indices
///   exist.
///
/// # Arguments
///
/// * `path` - The file system path to the SQLite database file.
///
/// # Errors
///
/// Returns an error if the database file cannot be opened, the initial
/// PRAGMA configurations fail, or the schema initialization fails.
pub(crate) fn init_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;

    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
    if journal_mode != "wal" {
        anyhow::bail!(
            "Failed to switch to WAL mode. Current mode: {}",
            journal_mode
        );
    }

    conn.execute_batch(
        "
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -64000; -- Use 64MB of RAM for cache
    ",
    )?;

    conn.set_prepared_statement_cache_capacity(100);

    create_schema(&conn)?;

    Ok(conn)
}

/// Create the database schema.
///
/// The whole library lives in a single `items` table; the tree shape is
/// encoded in `parent_path` rather than row references so that an item's
/// identity and its location stay the same value.
///
/// # Errors
///
/// Returns an error if the transaction fails, if there are permission issues
/// with the database file, or if the SQL syntax is invalid.
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            relative_path TEXT NOT NULL UNIQUE,
            parent_path TEXT,
            title TEXT NOT NULL COLLATE NOCASE,
            kind INTEGER NOT NULL,
            duration REAL NOT NULL DEFAULT 0,
            current_position REAL NOT NULL DEFAULT 0,
            percent_completed REAL NOT NULL DEFAULT 0,
            is_finished INTEGER NOT NULL DEFAULT 0,
            order_rank INTEGER NOT NULL DEFAULT 0,
            remote_url TEXT,
            artwork_url TEXT,
            original_filename TEXT,
            last_play_date INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_items_parent_path ON items (parent_path);

        COMMIT;",
    )
    .context("Failed to create schema")
}

const ITEM_COLUMNS: &str = "relative_path, parent_path, title, kind, duration, \
     current_position, percent_completed, is_finished, order_rank, \
     remote_url, artwork_url, original_filename, last_play_date";

/// Fetches one page of the contents of a folder level, ordered by rank.
///
/// # Arguments
///
/// * `conn` - A reference to the SQLite connection.
/// * `parent` - The folder to list, or `None` for the library root.
/// * `limit` - Maximum number of rows, or `None` for everything.
/// * `offset` - Number of leading rows to skip.
///
/// # Errors
///
/// Returns an error if the SQL query fails or if there is a type mismatch
/// when mapping the database rows to [`SimpleLibraryItem`].
pub(crate) fn fetch_contents(
    conn: &Connection,
    parent: Option<&str>,
    limit: Option<i64>,
    offset: i64,
) -> Result<Vec<SimpleLibraryItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS}
         FROM items
         WHERE parent_path IS ?
         ORDER BY order_rank
         LIMIT ? OFFSET ?"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map(
            params![parent, limit.unwrap_or(-1), offset],
            SimpleLibraryItem::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Returns the total number of items directly inside a folder level.
pub(crate) fn item_count(conn: &Connection, parent: Option<&str>) -> Result<i64> {
    let mut stmt = conn.prepare_cached("SELECT COUNT(*) FROM items WHERE parent_path IS ?")?;
    let count = stmt.query_row(params![parent], |row| row.get(0))?;

    Ok(count)
}

/// Looks up a single item by its relative path.
pub(crate) fn get_item(conn: &Connection, relative_path: &str) -> Result<Option<SimpleLibraryItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE relative_path = ?");

    let mut stmt = conn.prepare_cached(&sql)?;
    let item = stmt
        .query_row(params![relative_path], SimpleLibraryItem::from_row)
        .optional()?;

    Ok(item)
}

/// Inserts a new item row, assigning it the next rank in its parent.
///
/// The caller is responsible for the on-disk file; this only creates the
/// record.
///
/// # Errors
///
/// Returns an error if the `relative_path` already exists in the library or
/// if the insert fails.
pub(crate) fn insert_item(conn: &Connection, item: &SimpleLibraryItem) -> Result<()> {
    let rank = next_order_rank(conn, item.parent_path.as_deref())?;

    let sql = format!(
        "INSERT INTO items ({ITEM_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.execute(params![
        item.relative_path,
        item.parent_path,
        item.title,
        item.kind,
        item.duration,
        item.current_time,
        item.percent_completed,
        item.is_finished,
        rank,
        item.remote_url,
        item.artwork_url,
        item.original_filename,
        item.last_play_date,
    ])
    .with_context(|| format!("Failed to insert item {}", item.relative_path))?;

    Ok(())
}

fn next_order_rank(conn: &Connection, parent: Option<&str>) -> Result<i64> {
    let mut stmt = conn
        .prepare_cached("SELECT COALESCE(MAX(order_rank) + 1, 0) FROM items WHERE parent_path IS ?")?;
    let rank = stmt.query_row(params![parent], |row| row.get(0))?;

    Ok(rank)
}

/// Creates a new, empty folder inside `parent` (or at the library root).
///
/// # Errors
///
/// Returns an error if a folder or book with the same relative path already
/// exists.
pub(crate) fn create_folder(
    conn: &Connection,
    title: &str,
    parent: Option<&str>,
) -> Result<SimpleLibraryItem> {
    let relative_path = match parent {
        Some(parent) => format!("{parent}/{title}"),
        None => title.to_string(),
    };

    let folder = SimpleLibraryItem {
        relative_path,
        parent_path: parent.map(str::to_string),
        title: title.to_string(),
        kind: ItemKind::Folder,
        duration: 0.0,
        current_time: 0.0,
        percent_completed: 0.0,
        is_finished: false,
        order_rank: 0,
        remote_url: None,
        artwork_url: None,
        original_filename: None,
        last_play_date: None,
    };

    insert_item(conn, &folder)?;

    get_item(conn, &folder.relative_path)?
        .context("Folder vanished immediately after creation")
}

/// Moves items into a destination folder, or to the library root.
///
/// Each moved item keeps its last path component; its own subtree (for
/// folders) is re-rooted underneath the new location in the same statement
/// batch. Ranks are assigned at the end of the destination.
///
/// Only records move here; relocating the underlying files is the caller's
/// concern.
///
/// # Errors
///
/// Returns an error if a destination path collides with an existing item or
/// if any statement fails; the transaction rolls back as a whole.
pub(crate) fn move_items(
    conn: &mut Connection,
    paths: &[String],
    destination: Option<&str>,
) -> Result<()> {
    let tx = conn.transaction()?;

    for path in paths {
        let last_component = path.rsplit('/').next().unwrap_or(path);
        let new_path = match destination {
            Some(dest) => format!("{dest}/{last_component}"),
            None => last_component.to_string(),
        };

        if new_path == *path {
            continue;
        }

        let rank: i64 = tx.query_row(
            "SELECT COALESCE(MAX(order_rank) + 1, 0) FROM items WHERE parent_path IS ?",
            params![destination],
            |row| row.get(0),
        )?;

        tx.execute(
            "UPDATE items SET relative_path = ?2, parent_path = ?3, order_rank = ?4
             WHERE relative_path = ?1",
            params![path, new_path, destination, rank],
        )?;

        // Re-root the whole subtree below a moved folder.
        tx.execute(
            "UPDATE items
             SET relative_path = ?2 || substr(relative_path, length(?1) + 1),
                 parent_path = ?2 || substr(parent_path, length(?1) + 1)
             WHERE relative_path LIKE ?1 || '/%'",
            params![path, new_path],
        )?;
    }

    tx.commit().context("Failed to move items")
}

/// Deletes items, returning the relative paths of every removed record.
///
/// With [`DeleteMode::Deep`] a folder takes its entire subtree with it; with
/// [`DeleteMode::Shallow`] the folder's direct children are first moved up
/// into the folder's own parent. Books are unaffected by the mode.
///
/// # Errors
///
/// Returns an error if any statement fails; the transaction rolls back as a
/// whole.
pub(crate) fn delete_items(
    conn: &mut Connection,
    paths: &[String],
    mode: DeleteMode,
) -> Result<Vec<String>> {
    let mut removed = Vec::new();

    for path in paths {
        let Some(item) = get_item(conn, path)? else {
            continue;
        };

        if item.kind != ItemKind::Book && mode == DeleteMode::Shallow {
            let children: Vec<String> = fetch_contents(conn, Some(path), None, 0)?
                .into_iter()
                .map(|child| child.relative_path)
                .collect();
            move_items(conn, &children, item.parent_path.as_deref())?;
        }

        let tx = conn.transaction()?;

        if item.kind != ItemKind::Book {
            let mut stmt = tx.prepare_cached(
                "SELECT relative_path FROM items WHERE relative_path LIKE ? || '/%'",
            )?;
            let descendants = stmt
                .query_map(params![path], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            removed.extend(descendants);
            tx.execute(
                "DELETE FROM items WHERE relative_path LIKE ? || '/%'",
                params![path],
            )?;
        }

        tx.execute("DELETE FROM items WHERE relative_path = ?", params![path])?;
        removed.push(path.clone());

        tx.commit()?;
    }

    Ok(removed)
}

/// Moves the item at `source_index` within a folder level to
/// `destination_index`, renumbering ranks to keep them dense.
///
/// Out-of-range indices are clamped to the last position.
pub(crate) fn reorder_item(
    conn: &mut Connection,
    parent: Option<&str>,
    source_index: usize,
    destination_index: usize,
) -> Result<()> {
    let mut paths: Vec<String> = fetch_contents(conn, parent, None, 0)?
        .into_iter()
        .map(|item| item.relative_path)
        .collect();

    if paths.is_empty() || source_index >= paths.len() {
        return Ok(());
    }

    let destination_index = destination_index.min(paths.len() - 1);
    let moved = paths.remove(source_index);
    paths.insert(destination_index, moved);

    renumber_ranks(conn, &paths)
}

/// Re-sorts the contents of one folder level and persists new ranks.
pub(crate) fn sort_contents(
    conn: &mut Connection,
    parent: Option<&str>,
    kind: SortKind,
) -> Result<()> {
    let order_clause = match kind {
        SortKind::Title => "title COLLATE NOCASE",
        SortKind::OriginalFileName => "original_filename COLLATE NOCASE",
        SortKind::MostRecent => "last_play_date DESC",
        SortKind::ReverseOrder => "order_rank DESC",
    };

    let sql = format!(
        "SELECT relative_path FROM items WHERE parent_path IS ? ORDER BY {order_clause}"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let paths = stmt
        .query_map(params![parent], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    renumber_ranks(conn, &paths)
}

fn renumber_ranks(conn: &mut Connection, ordered_paths: &[String]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt =
            tx.prepare_cached("UPDATE items SET order_rank = ? WHERE relative_path = ?")?;
        for (rank, path) in ordered_paths.iter().enumerate() {
            stmt.execute(params![rank as i64, path])?;
        }
    }
    tx.commit().context("Failed to renumber ranks")
}

/// Recomputes a folder's aggregate fields from its direct children.
///
/// Progress is the mean of children's `percent_completed`, duration the sum,
/// and the finished flag the conjunction. Returns the new progress value so
/// callers can broadcast it.
pub(crate) fn rebuild_folder_stats(conn: &Connection, folder: &str) -> Result<f64> {
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(AVG(percent_completed), 0),
                COALESCE(SUM(duration), 0),
                COALESCE(MIN(is_finished), 0)
         FROM items WHERE parent_path IS ?",
    )?;
    let (progress, duration, finished): (f64, f64, bool) =
        stmt.query_row(params![folder], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;

    let mut update = conn.prepare_cached(
        "UPDATE items SET percent_completed = ?, duration = ?, is_finished = ?
         WHERE relative_path = ? AND kind != 2",
    )?;
    update.execute(params![progress, duration, finished, folder])?;

    Ok(progress)
}

/// Changes the container kind (regular folder or bound volume) of the given
/// folders. Book rows are left untouched.
pub(crate) fn update_folder_kind(
    conn: &Connection,
    paths: &[String],
    kind: ItemKind,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE items SET kind = ? WHERE relative_path = ? AND kind != 2",
    )?;
    for path in paths {
        stmt.execute(params![kind, path])?;
    }

    Ok(())
}

/// Records a new playback position for a book and returns the resulting
/// completion percentage.
///
/// The stored duration wins over `fallback_duration`; the fallback covers
/// books imported before their duration could be probed.
pub(crate) fn update_playback_position(
    conn: &Connection,
    relative_path: &str,
    position: f64,
    fallback_duration: f64,
) -> Result<f64> {
    let stored: Option<f64> = conn
        .prepare_cached("SELECT duration FROM items WHERE relative_path = ?")?
        .query_row(params![relative_path], |row| row.get(0))
        .optional()?;

    let duration = match stored {
        Some(duration) if duration > 0.0 => duration,
        _ => fallback_duration,
    };

    let percent = if duration > 0.0 {
        (position / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let mut stmt = conn.prepare_cached(
        "UPDATE items
         SET current_position = ?, percent_completed = ?, duration = ?, last_play_date = ?
         WHERE relative_path = ?",
    )?;
    stmt.execute(params![position, percent, duration, now_timestamp(), relative_path])?;

    Ok(percent)
}

/// Sets or clears the finished flag on a book.
pub(crate) fn mark_finished(conn: &Connection, relative_path: &str, flag: bool) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE items
         SET is_finished = ?,
             percent_completed = CASE WHEN ? THEN 100.0 ELSE percent_completed END
         WHERE relative_path = ?",
    )?;
    stmt.execute(params![flag, flag, relative_path])?;

    Ok(())
}

/// Resets a book's playback position to the beginning.
pub(crate) fn jump_to_start(conn: &Connection, relative_path: &str) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE items
         SET current_position = 0, percent_completed = 0, is_finished = 0
         WHERE relative_path = ?",
    )?;
    stmt.execute(params![relative_path])?;

    Ok(())
}

/// The first unfinished book inside a folder's subtree, in rank order.
///
/// Used to start or continue playback of a whole folder.
pub(crate) fn first_unfinished_book(
    conn: &Connection,
    folder: &str,
) -> Result<Option<SimpleLibraryItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS}
         FROM items
         WHERE kind = 2 AND is_finished = 0
           AND (parent_path IS ?1 OR relative_path LIKE ?1 || '/%')
         ORDER BY relative_path, order_rank
         LIMIT 1"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let item = stmt
        .query_row(params![folder], SimpleLibraryItem::from_row)
        .optional()?;

    Ok(item)
}

/// The next unfinished book after `relative_path` within the same folder
/// level, if any.
pub(crate) fn next_book_after(
    conn: &Connection,
    relative_path: &str,
) -> Result<Option<SimpleLibraryItem>> {
    let Some(item) = get_item(conn, relative_path)? else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {ITEM_COLUMNS}
         FROM items
         WHERE parent_path IS ? AND kind = 2 AND is_finished = 0 AND order_rank > ?
         ORDER BY order_rank
         LIMIT 1"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let next = stmt
        .query_row(
            params![item.parent_path, item.order_rank],
            SimpleLibraryItem::from_row,
        )
        .optional()?;

    Ok(next)
}

/// Searches item titles across the whole library.
///
/// Queries shorter than three characters return nothing rather than walking
/// the entire table.
pub(crate) fn search_items(conn: &Connection, text: &str) -> Result<Vec<SimpleLibraryItem>> {
    if text.len() < MIN_SEARCH_LEN {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {ITEM_COLUMNS}
         FROM items
         WHERE title LIKE ?
         ORDER BY title COLLATE NOCASE"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map(params![format!("%{text}%")], SimpleLibraryItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// The most recently played books, newest first.
pub(crate) fn last_played(conn: &Connection, limit: i64) -> Result<Vec<SimpleLibraryItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS}
         FROM items
         WHERE kind = 2 AND last_play_date IS NOT NULL
         ORDER BY last_play_date DESC
         LIMIT ?"
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map(params![limit], SimpleLibraryItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Restores the one-parent invariant by adopting orphans into the root.
///
/// Runs once at startup; a crash between the two statements of a historical
/// move can leave rows whose `parent_path` no longer exists.
pub(crate) fn adopt_orphans(conn: &Connection) -> Result<usize> {
    let orphans: Vec<String> = conn
        .prepare_cached(
            "SELECT relative_path FROM items
             WHERE parent_path IS NOT NULL
               AND parent_path NOT IN (SELECT relative_path FROM items WHERE kind = 1)",
        )?
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    for path in &orphans {
        let last_component = path.rsplit('/').next().unwrap_or(path);
        conn.execute(
            "UPDATE items SET parent_path = NULL, relative_path = ? WHERE relative_path = ?",
            params![last_component, path],
        )?;
    }

    Ok(orphans.len())
}

pub(crate) fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parent_path_of, tests::test_item};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    fn insert_book(conn: &Connection, path: &str) {
        let parent = parent_path_of(path).map(str::to_string);
        let mut item = test_item(path, parent.as_deref());
        item.title = item.last_path_component().to_string();
        item.duration = 60.0;
        insert_item(conn, &item).unwrap();
    }

    fn insert_folder(conn: &Connection, path: &str) {
        let parent = parent_path_of(path);
        let title = path.rsplit('/').next().unwrap();
        create_folder(conn, title, parent).unwrap();
    }

    #[test]
    fn fetch_contents_pages_never_exceed_total() {
        let conn = test_db();
        for i in 0..7 {
            insert_book(&conn, &format!("book{i}.mp3"));
        }

        let total = item_count(&conn, None).unwrap();
        assert_eq!(total, 7);

        let mut fetched = Vec::new();
        let mut offset = 0;
        loop {
            let page = fetch_contents(&conn, None, Some(3), offset).unwrap();
            if page.is_empty() {
                break;
            }
            offset += page.len() as i64;
            fetched.extend(page);
        }

        assert_eq!(fetched.len() as i64, total);
        assert!(fetch_contents(&conn, None, Some(3), total).unwrap().is_empty());
    }

    #[test]
    fn duplicate_relative_path_is_rejected() {
        let conn = test_db();
        insert_book(&conn, "book.mp3");

        let duplicate = test_item("book.mp3", None);
        assert!(insert_item(&conn, &duplicate).is_err());
    }

    #[test]
    fn reorder_preserves_count_and_moves_item() {
        let mut conn = test_db();
        for i in 0..5 {
            insert_book(&conn, &format!("book{i}.mp3"));
        }

        reorder_item(&mut conn, None, 0, 3).unwrap();

        let items = fetch_contents(&conn, None, None, 0).unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[3].relative_path, "book0.mp3");
        assert_eq!(items[0].relative_path, "book1.mp3");
    }

    #[test]
    fn reorder_clamps_out_of_range_destination() {
        let mut conn = test_db();
        for i in 0..3 {
            insert_book(&conn, &format!("book{i}.mp3"));
        }

        reorder_item(&mut conn, None, 0, 99).unwrap();

        let items = fetch_contents(&conn, None, None, 0).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].relative_path, "book0.mp3");
    }

    #[test]
    fn deleted_item_disappears_from_parent_fetches() {
        let mut conn = test_db();
        insert_folder(&conn, "A");
        insert_book(&conn, "A/one.mp3");
        insert_book(&conn, "A/two.mp3");

        let removed =
            delete_items(&mut conn, &["A/one.mp3".to_string()], DeleteMode::Deep).unwrap();
        assert_eq!(removed, vec!["A/one.mp3".to_string()]);

        let items = fetch_contents(&conn, Some("A"), None, 0).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].relative_path, "A/two.mp3");
    }

    #[test]
    fn deep_delete_takes_the_subtree() {
        let mut conn = test_db();
        insert_folder(&conn, "A");
        insert_folder(&conn, "A/B");
        insert_book(&conn, "A/B/one.mp3");

        let removed = delete_items(&mut conn, &["A".to_string()], DeleteMode::Deep).unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(item_count(&conn, None).unwrap(), 0);
    }

    #[test]
    fn shallow_delete_reparents_children() {
        let mut conn = test_db();
        insert_folder(&conn, "A");
        insert_book(&conn, "A/one.mp3");

        delete_items(&mut conn, &["A".to_string()], DeleteMode::Shallow).unwrap();

        let items = fetch_contents(&conn, None, None, 0).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].relative_path, "one.mp3");
        assert_eq!(items[0].parent_path, None);
    }

    #[test]
    fn move_items_reroots_subtrees() {
        let mut conn = test_db();
        insert_folder(&conn, "A");
        insert_folder(&conn, "B");
        insert_folder(&conn, "A/C");
        insert_book(&conn, "A/C/deep.mp3");

        move_items(&mut conn, &["A/C".to_string()], Some("B")).unwrap();

        assert!(get_item(&conn, "A/C").unwrap().is_none());
        let moved = get_item(&conn, "B/C").unwrap().unwrap();
        assert_eq!(moved.parent_path.as_deref(), Some("B"));

        let book = get_item(&conn, "B/C/deep.mp3").unwrap().unwrap();
        assert_eq!(book.parent_path.as_deref(), Some("B/C"));
    }

    #[test]
    fn move_to_root_strips_the_prefix() {
        let mut conn = test_db();
        insert_folder(&conn, "A");
        insert_book(&conn, "A/one.mp3");

        move_items(&mut conn, &["A/one.mp3".to_string()], None).unwrap();

        let moved = get_item(&conn, "one.mp3").unwrap().unwrap();
        assert_eq!(moved.parent_path, None);
    }

    #[test]
    fn folder_progress_is_mean_of_children() {
        let conn = test_db();
        insert_folder(&conn, "A");
        insert_book(&conn, "A/one.mp3");
        insert_book(&conn, "A/two.mp3");

        update_playback_position(&conn, "A/one.mp3", 30.0, 60.0).unwrap();
        let progress = rebuild_folder_stats(&conn, "A").unwrap();
        assert!((progress - 25.0).abs() < f64::EPSILON);

        let folder = get_item(&conn, "A").unwrap().unwrap();
        assert!((folder.percent_completed - 25.0).abs() < f64::EPSILON);
        assert!((folder.duration - 120.0).abs() < f64::EPSILON);
        assert!(!folder.is_finished);
    }

    #[test]
    fn folder_finishes_only_when_all_children_do() {
        let conn = test_db();
        insert_folder(&conn, "A");
        insert_book(&conn, "A/one.mp3");
        insert_book(&conn, "A/two.mp3");

        mark_finished(&conn, "A/one.mp3", true).unwrap();
        rebuild_folder_stats(&conn, "A").unwrap();
        assert!(!get_item(&conn, "A").unwrap().unwrap().is_finished);

        mark_finished(&conn, "A/two.mp3", true).unwrap();
        rebuild_folder_stats(&conn, "A").unwrap();
        assert!(get_item(&conn, "A").unwrap().unwrap().is_finished);
    }

    #[test]
    fn sort_by_title_then_reverse() {
        let mut conn = test_db();
        insert_book(&conn, "charlie.mp3");
        insert_book(&conn, "alpha.mp3");
        insert_book(&conn, "bravo.mp3");

        sort_contents(&mut conn, None, SortKind::Title).unwrap();
        let items = fetch_contents(&conn, None, None, 0).unwrap();
        assert_eq!(items[0].relative_path, "alpha.mp3");
        assert_eq!(items[2].relative_path, "charlie.mp3");

        sort_contents(&mut conn, None, SortKind::ReverseOrder).unwrap();
        let items = fetch_contents(&conn, None, None, 0).unwrap();
        assert_eq!(items[0].relative_path, "charlie.mp3");
    }

    #[test]
    fn playback_position_updates_percent_and_last_played() {
        let conn = test_db();
        insert_book(&conn, "book.mp3");

        let percent = update_playback_position(&conn, "book.mp3", 15.0, 0.0).unwrap();
        assert!((percent - 25.0).abs() < f64::EPSILON);

        let recent = last_played(&conn, 5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].relative_path, "book.mp3");

        jump_to_start(&conn, "book.mp3").unwrap();
        let item = get_item(&conn, "book.mp3").unwrap().unwrap();
        assert_eq!(item.current_time, 0.0);
        assert_eq!(item.percent_completed, 0.0);
    }

    #[test]
    fn search_requires_three_characters() {
        let conn = test_db();
        insert_book(&conn, "wind-in-the-willows.mp3");

        assert!(search_items(&conn, "wi").unwrap().is_empty());
        assert_eq!(search_items(&conn, "willow").unwrap().len(), 1);
    }

    #[test]
    fn first_unfinished_book_walks_the_subtree() {
        let conn = test_db();
        insert_folder(&conn, "A");
        insert_folder(&conn, "A/B");
        insert_book(&conn, "A/B/one.mp3");
        insert_book(&conn, "A/B/two.mp3");

        mark_finished(&conn, "A/B/one.mp3", true).unwrap();

        let next = first_unfinished_book(&conn, "A").unwrap().unwrap();
        assert_eq!(next.relative_path, "A/B/two.mp3");
    }

    #[test]
    fn next_book_after_respects_rank_order_and_skips_finished() {
        let conn = test_db();
        insert_folder(&conn, "A");
        insert_book(&conn, "A/one.mp3");
        insert_book(&conn, "A/two.mp3");

        let next = next_book_after(&conn, "A/one.mp3").unwrap().unwrap();
        assert_eq!(next.relative_path, "A/two.mp3");
        assert!(next_book_after(&conn, "A/two.mp3").unwrap().is_none());

        mark_finished(&conn, "A/two.mp3", true).unwrap();
        assert!(next_book_after(&conn, "A/one.mp3").unwrap().is_none());
    }

    #[test]
    fn folder_kind_updates_skip_books() {
        let conn = test_db();
        insert_folder(&conn, "A");
        insert_book(&conn, "A/one.mp3");

        update_folder_kind(
            &conn,
            &["A".to_string(), "A/one.mp3".to_string()],
            ItemKind::Bound,
        )
        .unwrap();

        assert_eq!(get_item(&conn, "A").unwrap().unwrap().kind, ItemKind::Bound);
        assert_eq!(
            get_item(&conn, "A/one.mp3").unwrap().unwrap().kind,
            ItemKind::Book
        );
    }

    #[test]
    fn orphans_are_adopted_by_the_root() {
        let conn = test_db();
        insert_book(&conn, "book.mp3");
        conn.execute(
            "UPDATE items SET parent_path = 'gone', relative_path = 'gone/book.mp3'",
            [],
        )
        .unwrap();

        assert_eq!(adopt_orphans(&conn).unwrap(), 1);
        assert!(get_item(&conn, "book.mp3").unwrap().is_some());
    }
}
