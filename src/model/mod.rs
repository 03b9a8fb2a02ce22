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

//! Domain models and core data structures.
//!
//! This module defines the central entities of the application: library
//! items, their tree addressing, and the per-item download and sort states
//! used by the browser and the persistence layer.

use std::path::{Path, PathBuf};

/// Kind discriminant for a library item.
///
/// A bound folder is still a container on disk, but it plays through as a
/// single continuous book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Folder,
    Book,
    Bound,
}

/// Row projection of a library item, used for list display and
/// download-state tracking without loading the full tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimpleLibraryItem {
    pub(crate) relative_path: String,
    pub(crate) parent_path: Option<String>,
    pub(crate) title: String,
    pub(crate) kind: ItemKind,
    /// Total duration in seconds; for folders, the aggregate of children.
    pub(crate) duration: f64,
    pub(crate) current_time: f64,
    /// 0.0 ..= 100.0; for folders, the aggregate of children.
    pub(crate) percent_completed: f64,
    pub(crate) is_finished: bool,
    pub(crate) order_rank: i64,
    pub(crate) remote_url: Option<String>,
    pub(crate) artwork_url: Option<String>,
    pub(crate) original_filename: Option<String>,
    pub(crate) last_play_date: Option<i64>,
}

impl SimpleLibraryItem {
    /// The on-disk location of this item below the managed storage root.
    pub(crate) fn file_path(&self, storage_root: &Path) -> PathBuf {
        storage_root.join(&self.relative_path)
    }

    pub(crate) fn last_path_component(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Download state of a single item, derived from disk presence and the
/// in-memory transfer map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DownloadState {
    NotDownloaded,
    Downloading(f64),
    Downloaded,
}

/// Sort orders supported for the contents of one folder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortKind {
    Title,
    OriginalFileName,
    MostRecent,
    ReverseOrder,
}

impl SortKind {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "title" => Some(SortKind::Title),
            "file" => Some(SortKind::OriginalFileName),
            "recent" => Some(SortKind::MostRecent),
            "reverse" => Some(SortKind::ReverseOrder),
            _ => None,
        }
    }
}

/// Whether deleting a folder also deletes its descendants (and files), or
/// re-parents them one level up first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteMode {
    Deep,
    Shallow,
}

/// Returns the parent component of a relative path, or `None` for a
/// top-level path.
pub(crate) fn parent_path_of(relative_path: &str) -> Option<&str> {
    relative_path.rfind('/').map(|idx| &relative_path[..idx])
}

/// Whether `path` is `prefix` itself or lives somewhere below it.
///
/// Matches whole path segments; `"AB/x"` is not under `"A"`.
pub(crate) fn path_is_or_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// All ancestor folder paths of `relative_path`, deepest first.
///
/// `"A/B/book.mp3"` yields `["A/B", "A"]`.
pub(crate) fn ancestor_paths(relative_path: &str) -> Vec<&str> {
    let mut ancestors = Vec::new();
    let mut current = relative_path;
    while let Some(parent) = parent_path_of(current) {
        ancestors.push(parent);
        current = parent;
    }
    ancestors
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn parent_of_nested_path() {
        assert_eq!(parent_path_of("A/B/book.mp3"), Some("A/B"));
        assert_eq!(parent_path_of("A"), None);
    }

    #[test]
    fn ancestors_deepest_first() {
        assert_eq!(ancestor_paths("A/B/book.mp3"), vec!["A/B", "A"]);
        assert!(ancestor_paths("book.mp3").is_empty());
    }

    #[test]
    fn prefix_containment_respects_segments() {
        assert!(path_is_or_under("A/B/book.mp3", "A"));
        assert!(path_is_or_under("A/B/book.mp3", "A/B"));
        assert!(path_is_or_under("A", "A"));
        assert!(!path_is_or_under("AB/book.mp3", "A"));
        assert!(!path_is_or_under("A", "A/B"));
    }

    #[test]
    fn last_path_component_falls_back_to_whole_path() {
        let item = test_item("standalone.mp3", None);
        assert_eq!(item.last_path_component(), "standalone.mp3");

        let nested = test_item("A/B/book.mp3", Some("A/B"));
        assert_eq!(nested.last_path_component(), "book.mp3");
    }

    pub(crate) fn test_item(path: &str, parent: Option<&str>) -> SimpleLibraryItem {
        SimpleLibraryItem {
            relative_path: path.to_string(),
            parent_path: parent.map(str::to_string),
            title: path.to_string(),
            kind: ItemKind::Book,
            duration: 0.0,
            current_time: 0.0,
            percent_completed: 0.0,
            is_finished: false,
            order_rank: 0,
            remote_url: None,
            artwork_url: None,
            original_filename: None,
            last_play_date: None,
        }
    }
}
