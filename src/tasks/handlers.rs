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

//! Task handler implementations.
//!
//! Every structural mutation follows the same shape: mutate the persisted
//! tree, drop cached artwork for affected folders, rebuild the affected
//! parent's aggregates, then tell the UI to re-fetch its visible page. The
//! UI sizes the reload padding itself so the visible item count stays
//! stable across inserts.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, warn};
use url::Url;

use crate::account::ConnectionData;
use crate::browser::PageRequest;
use crate::db::{self, import};
use crate::downloads;
use crate::events::AppEvent;
use crate::jellyfin::client::JellyfinClient;
use crate::jellyfin::models::MediaItem;
use crate::model::{
    DeleteMode, ItemKind, SimpleLibraryItem, SortKind, ancestor_paths, parent_path_of,
};
use crate::tasks::{AppTask, TaskContext, TaskResult};

/// Orchestrates the execution of a single task.
pub(super) fn handle_task(task: AppTask, ctx: &mut TaskContext) -> TaskResult {
    match task {
        AppTask::FetchItems(request) => fetch_items(ctx, request),
        AppTask::FetchRecent => fetch_recent(ctx),
        AppTask::Search(text) => search(ctx, &text),

        AppTask::ImportPaths {
            sources,
            destination,
        } => import_paths(ctx, sources, destination),
        AppTask::CreateFolder { title, parent } => create_folder(ctx, &title, parent),
        AppTask::MoveItems { paths, destination } => move_items(ctx, paths, destination),
        AppTask::DeleteItems { paths, mode } => delete_items(ctx, paths, mode),
        AppTask::ReorderItem {
            parent,
            source_index,
            destination_index,
        } => reorder_item(ctx, parent, source_index, destination_index),
        AppTask::SortContents { parent, kind } => sort_contents(ctx, parent, kind),
        AppTask::UpdateFolderKind { paths, kind } => update_folder_kind(ctx, paths, kind),
        AppTask::MarkFinished { paths, flag } => mark_finished(ctx, paths, flag),
        AppTask::SetAccent { accent } => {
            ctx.artwork.set_accent(accent);
            Ok(())
        }
        AppTask::ResetPosition { paths } => reset_position(ctx, paths),

        AppTask::RequestPlayback { relative_path } => request_playback(ctx, &relative_path),
        AppTask::PlayFolder { relative_path } => play_folder(ctx, &relative_path),
        AppTask::RecordProgress {
            relative_path,
            position,
            duration,
        } => record_progress(ctx, &relative_path, position, duration),
        AppTask::FinishBook { relative_path } => finish_book(ctx, &relative_path),

        AppTask::StartDownload { relative_path } => start_download(ctx, &relative_path),
        AppTask::AdoptDownloaded { relative_path } => adopt_downloaded(ctx, &relative_path),

        AppTask::ResolveServer { url } => resolve_server(ctx, &url),
        AppTask::SignIn {
            url,
            username,
            password,
            remember,
            server_name,
        } => sign_in(ctx, &url, &username, &password, remember, server_name),
        AppTask::SignOut => sign_out(ctx),
        AppTask::RestoreConnection => restore_connection(ctx),
        AppTask::FetchRemoteViews => fetch_remote_views(ctx),
        AppTask::FetchRemoteChildren {
            parent_id,
            start_index,
            reset,
        } => fetch_remote_children(ctx, &parent_id, start_index, reset),
        AppTask::StartRemoteDownload { item, folder } => start_remote_download(ctx, item, &folder),
    }
}

// Library fetches ---------------------------------------------------------

fn fetch_items(ctx: &mut TaskContext, request: PageRequest) -> TaskResult {
    let folder = request.folder.as_deref();
    let items = db::fetch_contents(ctx.conn, folder, request.limit, request.offset)?;
    let total = db::item_count(ctx.conn, folder)?;

    ctx.event_tx.send(AppEvent::ItemsFetched {
        kind: request.kind,
        items,
        total,
    })?;

    Ok(())
}

fn fetch_recent(ctx: &mut TaskContext) -> TaskResult {
    let recent = db::last_played(ctx.conn, 4)?;
    ctx.event_tx.send(AppEvent::RecentFetched(recent))?;

    Ok(())
}

fn search(ctx: &mut TaskContext, text: &str) -> TaskResult {
    let results = db::search_items(ctx.conn, text)?;
    if !results.is_empty() {
        ctx.event_tx.send(AppEvent::SearchResultsReady(results))?;
    }

    Ok(())
}

// Structural mutations ----------------------------------------------------

fn import_paths(
    ctx: &mut TaskContext,
    sources: Vec<PathBuf>,
    destination: Option<String>,
) -> TaskResult {
    let storage_root = ctx.config.storage_root();
    let imported = import::import_paths(
        ctx.conn,
        &storage_root,
        &mut ctx.artwork,
        &sources,
        destination.as_deref(),
    )?;

    if let Some(folder) = destination.as_deref() {
        db::rebuild_folder_stats(ctx.conn, folder)?;
    }

    info!(count = imported.len(), "import finished");
    ctx.event_tx.send(AppEvent::LibraryMutated {
        padding: imported.len() as i64,
    })?;

    Ok(())
}

fn create_folder(ctx: &mut TaskContext, title: &str, parent: Option<String>) -> TaskResult {
    let folder = db::create_folder(ctx.conn, title, parent.as_deref())?;
    fs::create_dir_all(ctx.config.storage_root().join(&folder.relative_path))?;

    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 1 })?;

    Ok(())
}

fn move_items(
    ctx: &mut TaskContext,
    paths: Vec<String>,
    destination: Option<String>,
) -> TaskResult {
    let storage_root = ctx.config.storage_root();

    let mut source_parents = Vec::new();
    for path in &paths {
        if let Some(item) = db::get_item(ctx.conn, path)? {
            if let Some(parent) = item.parent_path {
                if !source_parents.contains(&parent) {
                    source_parents.push(parent);
                }
            }
        }
    }

    db::move_items(ctx.conn, &paths, destination.as_deref())?;

    // Relocate the underlying files to match the new record paths.
    for path in &paths {
        let last_component = path.rsplit('/').next().unwrap_or(path);
        let new_path = match destination.as_deref() {
            Some(dest) => format!("{dest}/{last_component}"),
            None => last_component.to_string(),
        };

        let source = storage_root.join(path);
        let target = storage_root.join(&new_path);
        if source.exists() && source != target {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            if let Err(e) = fs::rename(&source, &target) {
                warn!(from = %source.display(), to = %target.display(), error = %e,
                    "failed to relocate file");
            }
        }
    }

    if let Some(folder) = destination.as_deref() {
        ctx.artwork.remove(folder);
        db::rebuild_folder_stats(ctx.conn, folder)?;
    }
    for parent in &source_parents {
        ctx.artwork.remove(parent);
        db::rebuild_folder_stats(ctx.conn, parent)?;
    }

    ctx.event_tx.send(AppEvent::LibraryMutated {
        padding: paths.len() as i64,
    })?;

    Ok(())
}

fn delete_items(ctx: &mut TaskContext, paths: Vec<String>, mode: DeleteMode) -> TaskResult {
    let storage_root = ctx.config.storage_root();

    let mut parent = None;
    let mut deep_targets = Vec::new();
    for path in &paths {
        if let Some(item) = db::get_item(ctx.conn, path)? {
            if parent.is_none() {
                parent = item.parent_path.clone();
            }
            if mode == DeleteMode::Deep || item.kind == ItemKind::Book {
                deep_targets.push((path.clone(), item.kind));
            }
        }
    }

    let removed = db::delete_items(ctx.conn, &paths, mode)?;

    for (path, kind) in deep_targets {
        let target = storage_root.join(&path);
        let result = match kind {
            ItemKind::Book => fs::remove_file(&target),
            ItemKind::Folder | ItemKind::Bound => fs::remove_dir_all(&target),
        };
        if let Err(e) = result {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %target.display(), error = %e, "failed to remove file");
            }
        }
    }

    for path in &removed {
        ctx.artwork.remove(path);
    }
    if let Some(folder) = parent.as_deref() {
        ctx.artwork.remove(folder);
        db::rebuild_folder_stats(ctx.conn, folder)?;
    }

    ctx.event_tx.send(AppEvent::ItemsDeleted { paths: removed })?;
    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 0 })?;

    Ok(())
}

fn reorder_item(
    ctx: &mut TaskContext,
    parent: Option<String>,
    source_index: usize,
    destination_index: usize,
) -> TaskResult {
    if let Some(folder) = parent.as_deref() {
        ctx.artwork.remove(folder);
    }

    db::reorder_item(ctx.conn, parent.as_deref(), source_index, destination_index)?;

    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 0 })?;

    Ok(())
}

fn sort_contents(ctx: &mut TaskContext, parent: Option<String>, kind: SortKind) -> TaskResult {
    db::sort_contents(ctx.conn, parent.as_deref(), kind)?;

    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 0 })?;

    Ok(())
}

fn update_folder_kind(
    ctx: &mut TaskContext,
    paths: Vec<String>,
    kind: ItemKind,
) -> TaskResult {
    db::update_folder_kind(ctx.conn, &paths, kind)?;

    // Rebinding a folder invalidates any playback running inside it.
    ctx.event_tx
        .send(AppEvent::FolderKindUpdated { paths })?;
    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 0 })?;

    Ok(())
}

fn mark_finished(ctx: &mut TaskContext, paths: Vec<String>, flag: bool) -> TaskResult {
    let parent = paths
        .first()
        .and_then(|path| parent_path_of(path))
        .map(str::to_string);

    for path in &paths {
        db::mark_finished(ctx.conn, path, flag)?;
    }

    if let Some(folder) = parent.as_deref() {
        db::rebuild_folder_stats(ctx.conn, folder)?;
    }

    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 0 })?;

    Ok(())
}

fn reset_position(ctx: &mut TaskContext, paths: Vec<String>) -> TaskResult {
    for path in &paths {
        db::jump_to_start(ctx.conn, path)?;
    }

    if let Some(folder) = paths.first().and_then(|path| parent_path_of(path)) {
        db::rebuild_folder_stats(ctx.conn, folder)?;
    }

    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 0 })?;

    Ok(())
}

// Playback bookkeeping ----------------------------------------------------

fn request_playback(ctx: &mut TaskContext, relative_path: &str) -> TaskResult {
    let item = db::get_item(ctx.conn, relative_path)?
        .with_context(|| format!("Unknown item: {relative_path}"))?;

    ctx.event_tx.send(AppEvent::PlayBook { item })?;

    Ok(())
}

fn play_folder(ctx: &mut TaskContext, relative_path: &str) -> TaskResult {
    if let Some(item) = db::first_unfinished_book(ctx.conn, relative_path)? {
        ctx.event_tx.send(AppEvent::PlayBook { item })?;
    }

    Ok(())
}

fn record_progress(
    ctx: &mut TaskContext,
    relative_path: &str,
    position: f64,
    duration: f64,
) -> TaskResult {
    let percent = db::update_playback_position(ctx.conn, relative_path, position, duration)?;
    ctx.event_tx.send(AppEvent::RowProgressUpdated {
        relative_path: relative_path.to_string(),
        percent,
    })?;

    broadcast_folder_progress(ctx, relative_path)?;

    Ok(())
}

fn finish_book(ctx: &mut TaskContext, relative_path: &str) -> TaskResult {
    db::mark_finished(ctx.conn, relative_path, true)?;
    ctx.event_tx.send(AppEvent::RowProgressUpdated {
        relative_path: relative_path.to_string(),
        percent: 100.0,
    })?;

    broadcast_folder_progress(ctx, relative_path)?;

    // Auto-advance to the next sibling book.
    if let Some(next) = db::next_book_after(ctx.conn, relative_path)? {
        ctx.event_tx.send(AppEvent::PlayBook { item: next })?;
    }

    Ok(())
}

/// Rebuilds every ancestor folder's aggregates, deepest first, and
/// broadcasts the refreshed progress values.
fn broadcast_folder_progress(ctx: &mut TaskContext, relative_path: &str) -> TaskResult {
    let ancestors: Vec<String> = ancestor_paths(relative_path)
        .into_iter()
        .map(str::to_string)
        .collect();

    for folder in ancestors {
        let progress = db::rebuild_folder_stats(ctx.conn, &folder)?;
        ctx.event_tx.send(AppEvent::FolderProgressUpdated {
            relative_path: folder,
            progress,
        })?;
    }

    Ok(())
}

// Downloads ---------------------------------------------------------------

fn start_download(ctx: &mut TaskContext, relative_path: &str) -> TaskResult {
    let item = db::get_item(ctx.conn, relative_path)?
        .with_context(|| format!("Unknown item: {relative_path}"))?;
    let remote_url = item
        .remote_url
        .with_context(|| format!("{relative_path} has no remote source"))?;
    let url = Url::parse(&remote_url).context("Invalid remote URL")?;

    let destination = ctx.config.storage_root().join(relative_path);
    let handle = downloads::spawn_download(
        url,
        destination,
        relative_path.to_string(),
        ctx.event_tx.clone(),
    );

    ctx.event_tx.send(AppEvent::DownloadStarted {
        relative_path: relative_path.to_string(),
        handle,
    })?;

    Ok(())
}

fn adopt_downloaded(ctx: &mut TaskContext, relative_path: &str) -> TaskResult {
    let storage_root = ctx.config.storage_root();
    import::adopt_downloaded(ctx.conn, &storage_root, &mut ctx.artwork, relative_path)?;

    broadcast_folder_progress(ctx, relative_path)?;
    ctx.event_tx.send(AppEvent::LibraryMutated { padding: 0 })?;

    Ok(())
}

// Media server ------------------------------------------------------------

fn resolve_server(ctx: &mut TaskContext, url: &str) -> TaskResult {
    let client = JellyfinClient::new(url, &ctx.config.device_name)?;
    let info = client.resolve_server()?;

    info!(server = ?info.server_name, "resolved media server");
    ctx.client = Some(client);
    ctx.event_tx.send(AppEvent::ServerFound {
        name: info.server_name,
    })?;

    Ok(())
}

fn sign_in(
    ctx: &mut TaskContext,
    url: &str,
    username: &str,
    password: &str,
    remember: bool,
    server_name: Option<String>,
) -> TaskResult {
    let mut client = match ctx.client.take() {
        Some(client) => client,
        None => JellyfinClient::new(url, &ctx.config.device_name)?,
    };

    let auth = client.authenticate(username, password)?;

    let connection = ConnectionData {
        server_url: client.server_url().to_string(),
        server_name: server_name.unwrap_or_default(),
        user_id: auth.user.id,
        username: username.to_string(),
        access_token: auth.access_token,
    };

    if remember {
        // A failed save is not fatal; the session continues in memory.
        if let Err(e) = ctx.account.save_connection(&connection) {
            warn!(error = %e, "could not persist connection");
            ctx.event_tx.send(AppEvent::Error(e.to_string()))?;
        }
    }

    ctx.client = Some(client);
    ctx.event_tx.send(AppEvent::SignedIn { connection })?;

    Ok(())
}

fn sign_out(ctx: &mut TaskContext) -> TaskResult {
    ctx.account.remove_saved_connection()?;
    ctx.client = None;

    ctx.event_tx.send(AppEvent::SignedOut)?;

    Ok(())
}

fn restore_connection(ctx: &mut TaskContext) -> TaskResult {
    let connection = ctx.account.find_saved_connection()?;

    if let Some(data) = &connection {
        ctx.client = Some(JellyfinClient::from_connection(
            data,
            &ctx.config.device_name,
        )?);
    }

    ctx.event_tx
        .send(AppEvent::ConnectionRestored { connection })?;

    Ok(())
}

fn fetch_remote_views(ctx: &mut TaskContext) -> TaskResult {
    let client = ctx.client.as_ref().context("Not signed in")?;
    let views = client.user_views()?;

    ctx.event_tx.send(AppEvent::RemoteViews { items: views.items })?;

    Ok(())
}

fn fetch_remote_children(
    ctx: &mut TaskContext,
    parent_id: &str,
    start_index: i64,
    reset: bool,
) -> TaskResult {
    let client = ctx.client.as_ref().context("Not signed in")?;
    let page = client.children(parent_id, start_index, ctx.config.page_size)?;

    ctx.event_tx.send(AppEvent::RemoteChildren {
        items: page.items,
        total: page.total_record_count,
        reset,
    })?;

    Ok(())
}

fn start_remote_download(ctx: &mut TaskContext, item: MediaItem, folder: &str) -> TaskResult {
    let client = ctx.client.as_ref().context("Not signed in")?;
    let url = client.download_url(&item.id)?;

    let extension = item.container.as_deref().unwrap_or("mp3");
    let file_name = format!("{}.{extension}", item.name.replace('/', "-"));
    let relative_path = format!("{folder}/{file_name}");

    import::ensure_folder(ctx.conn, folder)?;

    if db::get_item(ctx.conn, &relative_path)?.is_none() {
        let record = SimpleLibraryItem {
            relative_path: relative_path.clone(),
            parent_path: Some(folder.to_string()),
            title: item.name.clone(),
            kind: ItemKind::Book,
            duration: item.duration_seconds(),
            current_time: 0.0,
            percent_completed: 0.0,
            is_finished: false,
            order_rank: 0,
            remote_url: Some(url.to_string()),
            artwork_url: None,
            original_filename: Some(file_name),
            last_play_date: None,
        };
        db::insert_item(ctx.conn, &record)?;
        ctx.event_tx.send(AppEvent::LibraryMutated { padding: 1 })?;
    }

    start_download(ctx, &relative_path)
}
