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

//! Library import and on-disk storage management.
//!
//! This module handles bringing external audio files into the managed
//! storage tree and creating the matching library records. Sources outside
//! the storage root are copied in; files already below the root are adopted
//! in place.
//!
//! It utilizes `WalkDir` for directory traversal and `Lofty` for metadata
//! extraction. Embedded cover art is handed to the artwork cache; books
//! without one fall back to the generated default at display time.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use rusqlite::Connection;
use tracing::warn;
use walkdir::WalkDir;

use crate::artwork::ArtworkCache;
use crate::db;
use crate::model::{ItemKind, SimpleLibraryItem, parent_path_of};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "m4b", "aac", "flac", "ogg", "opus", "wav"];

/// Metadata pulled from an audio file's tags, with fallbacks for files
/// whose tags cannot be read.
struct ProbedMetadata {
    title: String,
    duration: f64,
    cover: Option<Vec<u8>>,
}

/// Imports the given sources into the library under `destination`.
///
/// Directories are walked recursively; every nested directory becomes a
/// folder item and every audio file a book item. Returns the records created
/// at the top level of the operation, so callers can size the visible-page
/// reload padding.
///
/// # Arguments
///
/// * `conn` - A mutable reference to the SQLite database connection.
/// * `storage_root` - The managed storage root files are copied below.
/// * `artwork` - Cache receiving embedded cover art.
/// * `sources` - Files or directories to import.
/// * `destination` - The folder to import into, or `None` for the root.
///
/// # Errors
///
/// Returns an error if the storage tree cannot be written or a record
/// insert fails. Unreadable individual files are skipped with a warning
/// rather than aborting the whole import.
pub(crate) fn import_paths(
    conn: &mut Connection,
    storage_root: &Path,
    artwork: &mut ArtworkCache,
    sources: &[PathBuf],
    destination: Option<&str>,
) -> Result<Vec<SimpleLibraryItem>> {
    let mut imported = Vec::new();

    for source in sources {
        if source.is_dir() {
            if let Some(item) = import_directory(conn, storage_root, artwork, source, destination)?
            {
                imported.push(item);
            }
        } else if is_audio_file(source) {
            if let Some(item) = import_file(conn, storage_root, artwork, source, destination)? {
                imported.push(item);
            }
        } else {
            warn!(path = %source.display(), "skipping non-audio import source");
        }
    }

    Ok(imported)
}

fn import_directory(
    conn: &mut Connection,
    storage_root: &Path,
    artwork: &mut ArtworkCache,
    source: &Path,
    destination: Option<&str>,
) -> Result<Option<SimpleLibraryItem>> {
    let dir_name = match source.file_name().and_then(|name| name.to_str()) {
        Some(name) => name.to_string(),
        None => return Ok(None),
    };

    let folder_path = join_relative(destination, &dir_name);
    let folder = ensure_folder(conn, &folder_path)?;

    for entry in WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        let Ok(suffix) = entry.path().strip_prefix(source) else {
            continue;
        };
        let Some(suffix) = relative_string(suffix) else {
            continue;
        };

        let target_rel = format!("{folder_path}/{suffix}");

        if entry.file_type().is_dir() {
            ensure_folder(conn, &target_rel)?;
        } else if is_audio_file(entry.path()) {
            place_book(conn, storage_root, artwork, entry.path(), &target_rel)?;
        }
    }

    db::rebuild_folder_stats(conn, &folder_path)?;

    Ok(Some(folder))
}

fn import_file(
    conn: &mut Connection,
    storage_root: &Path,
    artwork: &mut ArtworkCache,
    source: &Path,
    destination: Option<&str>,
) -> Result<Option<SimpleLibraryItem>> {
    let file_name = match source.file_name().and_then(|name| name.to_str()) {
        Some(name) => name.to_string(),
        None => return Ok(None),
    };

    let relative_path = join_relative(destination, &file_name);
    place_book(conn, storage_root, artwork, source, &relative_path)
}

/// Copies one audio file into the storage tree (unless it is already there)
/// and creates its book record.
///
/// Books without embedded cover art receive the generated default artwork,
/// so every record's artwork resolves to cached PNG bytes.
fn place_book(
    conn: &Connection,
    storage_root: &Path,
    artwork: &mut ArtworkCache,
    source: &Path,
    relative_path: &str,
) -> Result<Option<SimpleLibraryItem>> {
    if db::get_item(conn, relative_path)?.is_some() {
        return Ok(None);
    }

    let target = storage_root.join(relative_path);
    if source != target {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::copy(source, &target)
            .with_context(|| format!("Failed to copy {} into the library", source.display()))?;
    }

    let metadata = probe_metadata(&target);

    let cover = match metadata.cover {
        Some(cover) => cover,
        None => artwork.default_artwork().to_vec(),
    };

    let mut artwork_url = None;
    match artwork.store(relative_path, &cover) {
        Ok(path) => artwork_url = Some(path.to_string_lossy().into_owned()),
        Err(e) => warn!(path = relative_path, error = %e, "failed to cache cover art"),
    }

    let item = SimpleLibraryItem {
        relative_path: relative_path.to_string(),
        parent_path: parent_path_of(relative_path).map(str::to_string),
        title: metadata.title,
        kind: ItemKind::Book,
        duration: metadata.duration,
        current_time: 0.0,
        percent_completed: 0.0,
        is_finished: false,
        order_rank: 0,
        remote_url: None,
        artwork_url,
        original_filename: Some(
            source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
        last_play_date: None,
    };

    db::insert_item(conn, &item)?;

    db::get_item(conn, relative_path)
}

/// Refreshes a freshly downloaded book from its file on disk.
///
/// Downloads are registered before any bytes arrive, so the record's
/// duration and artwork are placeholders until the transfer finishes.
pub(crate) fn adopt_downloaded(
    conn: &Connection,
    storage_root: &Path,
    artwork: &mut ArtworkCache,
    relative_path: &str,
) -> Result<()> {
    let target = storage_root.join(relative_path);
    let metadata = probe_metadata(&target);

    let cover = match metadata.cover {
        Some(cover) => Some(cover),
        None if artwork.load(relative_path).is_none() => {
            Some(artwork.default_artwork().to_vec())
        }
        None => None,
    };
    if let Some(cover) = cover {
        if let Err(e) = artwork.store(relative_path, &cover) {
            warn!(path = relative_path, error = %e, "failed to cache cover art");
        }
    }

    if metadata.duration > 0.0 {
        conn.execute(
            "UPDATE items SET duration = ? WHERE relative_path = ?",
            rusqlite::params![metadata.duration, relative_path],
        )?;
    }

    Ok(())
}

/// Creates every missing folder record along `relative_path` and returns
/// the deepest one.
pub(crate) fn ensure_folder(conn: &Connection, relative_path: &str) -> Result<SimpleLibraryItem> {
    if let Some(existing) = db::get_item(conn, relative_path)? {
        return Ok(existing);
    }

    if let Some(parent) = parent_path_of(relative_path) {
        if db::get_item(conn, parent)?.is_none() {
            ensure_folder(conn, parent)?;
        }
    }

    let title = relative_path.rsplit('/').next().unwrap_or(relative_path);
    db::create_folder(conn, title, parent_path_of(relative_path))
}

/// Reads title, duration and cover art from an audio file's tags.
///
/// Books with unreadable tags are still imported; the file stem stands in
/// for the title and the duration stays unknown until first playback.
fn probe_metadata(path: &Path) -> ProbedMetadata {
    let fallback_title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read tags");
            return ProbedMetadata {
                title: fallback_title,
                duration: 0.0,
                cover: None,
            };
        }
    };

    let duration = tagged_file.properties().duration().as_secs_f64();

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    let title = tag
        .and_then(|tag| tag.title().map(|title| title.to_string()))
        .unwrap_or(fallback_title);

    let cover = tag
        .and_then(|tag| tag.pictures().first())
        .map(|picture| picture.data().to_vec());

    ProbedMetadata {
        title,
        duration,
        cover,
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn join_relative(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}/{name}"),
        None => name.to_string(),
    }
}

fn relative_string(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Connection, ArtworkCache) {
        let dir = TempDir::new().unwrap();
        let conn = init_db(&dir.path().join("library.db")).unwrap();
        let artwork = ArtworkCache::new(dir.path().join("artwork"), (250, 189, 47));
        (dir, conn, artwork)
    }

    #[test]
    fn importing_a_directory_builds_the_tree() {
        let (dir, mut conn, mut artwork) = fixture();
        let storage = dir.path().join("storage");

        let source = dir.path().join("My Book");
        fs::create_dir_all(source.join("Part 1")).unwrap();
        fs::write(source.join("Part 1/ch1.mp3"), b"not really audio").unwrap();
        fs::write(source.join("notes.txt"), b"ignored").unwrap();

        let imported =
            import_paths(&mut conn, &storage, &mut artwork, &[source], None).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].relative_path, "My Book");
        assert_eq!(imported[0].kind, ItemKind::Folder);

        let book = db::get_item(&conn, "My Book/Part 1/ch1.mp3")
            .unwrap()
            .unwrap();
        assert_eq!(book.parent_path.as_deref(), Some("My Book/Part 1"));
        assert!(storage.join("My Book/Part 1/ch1.mp3").exists());

        // Non-audio files never become records.
        assert!(db::get_item(&conn, "My Book/notes.txt").unwrap().is_none());
    }

    #[test]
    fn importing_a_single_file_into_a_folder() {
        let (dir, mut conn, mut artwork) = fixture();
        let storage = dir.path().join("storage");
        db::create_folder(&conn, "Inbox", None).unwrap();

        let source = dir.path().join("tale.mp3");
        fs::write(&source, b"garbage").unwrap();

        let imported =
            import_paths(&mut conn, &storage, &mut artwork, &[source], Some("Inbox")).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].relative_path, "Inbox/tale.mp3");
        // Unreadable tags fall back to the file stem.
        assert_eq!(imported[0].title, "tale");
    }

    #[test]
    fn reimporting_an_existing_path_is_skipped() {
        let (dir, mut conn, mut artwork) = fixture();
        let storage = dir.path().join("storage");

        let source = dir.path().join("tale.mp3");
        fs::write(&source, b"garbage").unwrap();

        import_paths(&mut conn, &storage, &mut artwork, &[source.clone()], None).unwrap();
        let second = import_paths(&mut conn, &storage, &mut artwork, &[source], None).unwrap();

        assert!(second.is_empty());
        assert_eq!(db::item_count(&conn, None).unwrap(), 1);
    }
}
