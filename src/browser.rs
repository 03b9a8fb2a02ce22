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

//! Library browser state management.
//!
//! This module provides state for one folder level of the library tree:
//! pagination bookkeeping, the in-play ancestor resolution that lights up
//! folder rows while something inside them is playing, and the per-item
//! download tracking map.
//!
//! Fetching itself happens on the task worker; the browser only decides
//! which page to ask for and folds fetched pages back in. After structural
//! mutations the whole visible page is re-fetched rather than patched, with
//! padding so the visible item count stays stable across inserts; only
//! progress updates are patched in place.

use std::collections::HashMap;
use std::path::Path;

use ratatui::widgets::TableState;

use crate::downloads::DownloadHandle;
use crate::model::{DownloadState, SimpleLibraryItem, ancestor_paths, parent_path_of};

pub(crate) const DEFAULT_PAGE_SIZE: i64 = 13;

/// A page of the library the task worker should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub(crate) folder: Option<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: i64,
    pub(crate) kind: FetchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchKind {
    /// Replaces the current page (initial load and post-mutation reloads).
    Initial,
    /// Appends to the current page.
    Append,
}

/// Browser state for the folder level currently on screen.
pub(crate) struct ItemList {
    /// The folder being listed; `None` is the library root.
    pub(crate) folder: Option<String>,
    pub(crate) title: String,
    pub(crate) items: Vec<SimpleLibraryItem>,
    pub(crate) total: i64,
    offset: i64,
    pub(crate) table_state: TableState,

    /// Path of the currently playing book, if any.
    pub(crate) playing_path: Option<String>,
    /// Cached path for the containing folder of the playing item in
    /// relation to this list path.
    playing_parent: Option<String>,

    /// Active transfers by relative path. Session-wide; navigation does not
    /// cancel transfers.
    downloads: HashMap<String, DownloadHandle>,
    download_progress: HashMap<String, f64>,
    /// Paths whose transfer was requested but has not reported yet.
    pub(crate) pending_downloads: Vec<String>,

    /// Most recently played books, shown in the header strip.
    pub(crate) recent: Vec<SimpleLibraryItem>,
}

impl ItemList {
    pub(crate) fn new() -> Self {
        Self {
            folder: None,
            title: "Library".to_string(),
            items: Vec::new(),
            total: 0,
            offset: 0,
            table_state: TableState::default(),
            playing_path: None,
            playing_parent: None,
            downloads: HashMap::new(),
            download_progress: HashMap::new(),
            pending_downloads: Vec::new(),
            recent: Vec::new(),
        }
    }

    // Pagination ----------------------------------------------------------

    pub(crate) fn initial_request(&self, page_size: i64) -> PageRequest {
        PageRequest {
            folder: self.folder.clone(),
            limit: Some(page_size),
            offset: 0,
            kind: FetchKind::Initial,
        }
    }

    /// The next page to append, or `None` once the whole folder is loaded.
    pub(crate) fn next_request(&self, page_size: i64) -> Option<PageRequest> {
        if self.offset >= self.total {
            return None;
        }
        Some(PageRequest {
            folder: self.folder.clone(),
            limit: Some(page_size),
            offset: self.offset,
            kind: FetchKind::Append,
        })
    }

    /// Fetches everything below the current offset in one go.
    pub(crate) fn load_all_request(&self) -> Option<PageRequest> {
        if self.offset >= self.total {
            return None;
        }
        Some(PageRequest {
            folder: self.folder.clone(),
            limit: None,
            offset: 0,
            kind: FetchKind::Initial,
        })
    }

    /// Re-fetches the visible page after a mutation, padded so the visible
    /// item count stays stable across inserts.
    pub(crate) fn reload_request(&self, padding: i64) -> PageRequest {
        let size = (self.items.len() as i64 + padding).max(DEFAULT_PAGE_SIZE);
        PageRequest {
            folder: self.folder.clone(),
            limit: Some(size),
            offset: 0,
            kind: FetchKind::Initial,
        }
    }

    /// Folds a fetched page into the list.
    pub(crate) fn apply_fetch(
        &mut self,
        kind: FetchKind,
        items: Vec<SimpleLibraryItem>,
        total: i64,
    ) {
        match kind {
            FetchKind::Initial => {
                self.items = items;
                self.offset = self.items.len() as i64;
            }
            FetchKind::Append => {
                self.offset += items.len() as i64;
                self.items.extend(items);
            }
        }
        self.total = total;

        match self.table_state.selected() {
            Some(selected) if selected >= self.items.len() => {
                self.table_state
                    .select(self.items.len().checked_sub(1));
            }
            None if !self.items.is_empty() => self.table_state.select(Some(0)),
            _ => {}
        }
    }

    // Navigation ----------------------------------------------------------

    /// Switches this browser to another folder level, dropping pagination
    /// state but keeping download tracking and playback state.
    pub(crate) fn open_folder(&mut self, folder: Option<String>, title: String) {
        self.folder = folder;
        self.title = title;
        self.items.clear();
        self.total = 0;
        self.offset = 0;
        self.table_state = TableState::default();
        self.playing_parent = self
            .playing_path
            .as_deref()
            .and_then(|path| resolve_playing_parent(path, self.folder.as_deref()));
    }

    /// The folder one level up, if not already at the root.
    pub(crate) fn parent_folder(&self) -> Option<Option<String>> {
        self.folder
            .as_deref()
            .map(|folder| parent_path_of(folder).map(str::to_string))
    }

    pub(crate) fn selected_item(&self) -> Option<&SimpleLibraryItem> {
        self.items.get(self.table_state.selected()?)
    }

    pub(crate) fn select_next(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub(crate) fn select_previous(&mut self) {
        let len = self.items.len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    // Playback tracking ---------------------------------------------------

    /// Records the currently playing item and re-resolves which row of this
    /// screen is "in play".
    pub(crate) fn set_now_playing(&mut self, playing_path: Option<String>) {
        self.playing_parent = playing_path
            .as_deref()
            .and_then(|path| resolve_playing_parent(path, self.folder.as_deref()));
        self.playing_path = playing_path;
    }

    /// Whether this row should render as playing.
    pub(crate) fn is_in_play(&self, item: &SimpleLibraryItem) -> bool {
        let path = Some(item.relative_path.as_str());
        path == self.playing_path.as_deref() || path == self.playing_parent.as_deref()
    }

    /// Patches a progress value into the matching row, if it is visible.
    pub(crate) fn patch_progress(&mut self, relative_path: &str, percent: f64) {
        if let Some(row) = self
            .items
            .iter_mut()
            .find(|item| item.relative_path == relative_path)
        {
            row.percent_completed = percent;
        }
    }

    /// Folder progress broadcasts only apply when they concern the cached
    /// in-play parent of this screen.
    pub(crate) fn patch_folder_progress(&mut self, relative_path: &str, percent: f64) {
        if self.playing_parent.as_deref() != Some(relative_path) {
            return;
        }
        self.patch_progress(relative_path, percent);
    }

    // Download tracking ---------------------------------------------------

    /// Derives the three-state download status for a row.
    ///
    /// Items without a remote source are always `Downloaded`.
    pub(crate) fn download_state(
        &self,
        item: &SimpleLibraryItem,
        storage_root: &Path,
    ) -> DownloadState {
        if item.remote_url.is_none() {
            return DownloadState::Downloaded;
        }

        if item.file_path(storage_root).exists() {
            return DownloadState::Downloaded;
        }

        if self.downloads.contains_key(&item.relative_path) {
            let fraction = self
                .download_progress
                .get(&item.relative_path)
                .copied()
                .unwrap_or(0.0);
            return DownloadState::Downloading(fraction);
        }

        DownloadState::NotDownloaded
    }

    pub(crate) fn track_download(&mut self, relative_path: String, handle: DownloadHandle) {
        self.pending_downloads.push(relative_path.clone());
        self.downloads.insert(relative_path, handle);
    }

    pub(crate) fn note_download_progress(&mut self, relative_path: &str, fraction: f64) {
        self.pending_downloads.retain(|path| path != relative_path);
        if self.downloads.contains_key(relative_path) {
            self.download_progress
                .insert(relative_path.to_string(), fraction);
        }
    }

    /// Cancels and forgets a transfer; restores the not-downloaded state.
    pub(crate) fn cancel_download(&mut self, relative_path: &str) {
        if let Some(handle) = self.downloads.remove(relative_path) {
            handle.cancel();
        }
        self.download_progress.remove(relative_path);
        self.pending_downloads.retain(|path| path != relative_path);
    }

    /// Clears tracking after a finished (or failed) transfer.
    pub(crate) fn finish_download(&mut self, relative_path: &str) {
        self.downloads.remove(relative_path);
        self.download_progress.remove(relative_path);
        self.pending_downloads.retain(|path| path != relative_path);
    }
}

/// Resolves which ancestor folder of `playing_path` is "in play" for a
/// screen scoped to `screen_folder`.
///
/// With no scope the shallowest ancestor wins; inside a scoped screen it is
/// the child of the scope that lies on the playing item's path. Unrelated
/// scopes resolve to nothing, as does an item sitting directly in the
/// scoped folder (its own row carries the playing state instead).
pub(crate) fn resolve_playing_parent(
    playing_path: &str,
    screen_folder: Option<&str>,
) -> Option<String> {
    let ancestors = ancestor_paths(playing_path);

    match screen_folder {
        None => ancestors.last().map(|path| path.to_string()),
        Some(folder) => {
            let index = ancestors.iter().position(|path| *path == folder)?;
            index
                .checked_sub(1)
                .map(|child| ancestors[child].to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::test_item;
    use tempfile::TempDir;

    fn page(paths: &[&str]) -> Vec<SimpleLibraryItem> {
        paths.iter().map(|path| test_item(path, None)).collect()
    }

    #[test]
    fn appended_pages_never_exceed_the_total() {
        let mut list = ItemList::new();
        list.apply_fetch(FetchKind::Initial, page(&["a", "b", "c"]), 7);

        let mut names = vec!["d", "e", "f", "g", "h", "i"].into_iter();
        while let Some(request) = list.next_request(3) {
            let remaining = (list.total - request.offset).min(3) as usize;
            let batch: Vec<_> = names.by_ref().take(remaining).collect();
            list.apply_fetch(request.kind, page(&batch), 7);
        }

        assert_eq!(list.items.len() as i64, list.total);
        // Once the offset reaches the total, the next request is a no-op.
        assert_eq!(list.next_request(3), None);
        assert_eq!(list.load_all_request(), None);
    }

    #[test]
    fn reload_request_pads_the_current_page() {
        let mut list = ItemList::new();
        let items: Vec<_> = (0..20).map(|i| test_item(&format!("b{i}"), None)).collect();
        list.apply_fetch(FetchKind::Initial, items, 40);

        let request = list.reload_request(2);
        assert_eq!(request.limit, Some(22));
        assert_eq!(request.offset, 0);
        assert_eq!(request.kind, FetchKind::Initial);

        // Small pages still reload at least one default page.
        let mut short = ItemList::new();
        short.apply_fetch(FetchKind::Initial, page(&["a"]), 1);
        assert_eq!(short.reload_request(0).limit, Some(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn in_play_ancestor_matches_the_scoped_folder() {
        assert_eq!(
            resolve_playing_parent("A/B/book.mp3", Some("A")),
            Some("A/B".to_string())
        );
        assert_eq!(resolve_playing_parent("A/B/book.mp3", Some("X")), None);
        assert_eq!(
            resolve_playing_parent("A/B/book.mp3", None),
            Some("A".to_string())
        );
        // Directly contained items carry the playing state themselves.
        assert_eq!(resolve_playing_parent("A/B/book.mp3", Some("A/B")), None);
    }

    #[test]
    fn folder_progress_only_patches_the_in_play_parent() {
        let mut list = ItemList::new();
        list.open_folder(Some("A".to_string()), "A".to_string());
        list.apply_fetch(
            FetchKind::Initial,
            vec![test_item("A/B", Some("A")), test_item("A/C", Some("A"))],
            2,
        );
        list.set_now_playing(Some("A/B/book.mp3".to_string()));

        list.patch_folder_progress("A/B", 40.0);
        assert_eq!(list.items[0].percent_completed, 40.0);

        // An unrelated folder broadcast leaves rows alone.
        list.patch_folder_progress("A/C", 80.0);
        assert_eq!(list.items[1].percent_completed, 0.0);

        assert!(list.is_in_play(&list.items[0].clone()));
        assert!(!list.is_in_play(&list.items[1].clone()));
    }

    #[test]
    fn download_cancel_is_a_closed_loop() {
        let dir = TempDir::new().unwrap();
        let mut list = ItemList::new();

        let mut item = test_item("remote.mp3", None);
        item.remote_url = Some("http://host/Items/abc/Download".to_string());

        assert_eq!(
            list.download_state(&item, dir.path()),
            DownloadState::NotDownloaded
        );

        let handle = crate::downloads::tests::inert_handle();
        list.track_download(item.relative_path.clone(), handle);
        list.note_download_progress(&item.relative_path, 0.25);
        assert_eq!(
            list.download_state(&item, dir.path()),
            DownloadState::Downloading(0.25)
        );

        list.cancel_download(&item.relative_path);
        assert_eq!(
            list.download_state(&item, dir.path()),
            DownloadState::NotDownloaded
        );
    }

    #[test]
    fn downloaded_state_is_terminal_once_the_file_exists() {
        let dir = TempDir::new().unwrap();
        let mut list = ItemList::new();

        let mut item = test_item("remote.mp3", None);
        item.remote_url = Some("http://host/Items/abc/Download".to_string());

        std::fs::write(dir.path().join("remote.mp3"), b"audio").unwrap();
        assert_eq!(
            list.download_state(&item, dir.path()),
            DownloadState::Downloaded
        );

        // Stale tracking entries do not override the on-disk state.
        let handle = crate::downloads::tests::inert_handle();
        list.track_download(item.relative_path.clone(), handle);
        assert_eq!(
            list.download_state(&item, dir.path()),
            DownloadState::Downloaded
        );
    }

    #[test]
    fn local_items_are_always_downloaded() {
        let dir = TempDir::new().unwrap();
        let list = ItemList::new();
        let item = test_item("local.mp3", None);
        assert_eq!(
            list.download_state(&item, dir.path()),
            DownloadState::Downloaded
        );
    }
}
