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

//! Event handler implementations for the main loop.

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    App, MainView,
    account::ConnectionData,
    browser::FetchKind,
    commander::UserCommand,
    downloads::DownloadHandle,
    events::AppEvent,
    jellyfin::RemoteBrowser,
    jellyfin::models::MediaItem,
    model::{SimpleLibraryItem, path_is_or_under},
    player::PlayerState,
    tasks::AppTask,
};

pub(super) fn handle_set_main_view(app: &mut App, view: MainView) {
    app.main_view = view;
}

pub(super) fn handle_open_folder(
    app: &mut App,
    folder: Option<String>,
    title: String,
) -> Result<()> {
    app.item_list.open_folder(folder, title);
    app.task_tx.send(AppTask::FetchItems(
        app.item_list.initial_request(app.config.page_size),
    ))?;

    Ok(())
}

pub(super) fn handle_items_fetched(
    app: &mut App,
    kind: FetchKind,
    items: Vec<SimpleLibraryItem>,
    total: i64,
) {
    app.item_list.apply_fetch(kind, items, total);
}

pub(super) fn handle_recent_fetched(app: &mut App, items: Vec<SimpleLibraryItem>) {
    app.item_list.recent = items;
}

pub(super) fn handle_search_results_ready(app: &mut App, results: Vec<SimpleLibraryItem>) {
    let count = results.len() as i64;
    app.item_list.title = format!("Search results ({count})");
    app.item_list.apply_fetch(FetchKind::Initial, results, count);
}

/// After any structural mutation the visible page is re-fetched from the
/// source of truth rather than patched in place.
pub(super) fn handle_library_mutated(app: &mut App, padding: i64) -> Result<()> {
    app.task_tx
        .send(AppTask::FetchItems(app.item_list.reload_request(padding)))?;
    app.task_tx.send(AppTask::FetchRecent)?;

    Ok(())
}

/// Stops playback when the playing item, or an ancestor of it, was deleted.
pub(super) fn handle_items_deleted(app: &mut App, paths: Vec<String>) -> Result<()> {
    for path in &paths {
        app.item_list.finish_download(path);
    }

    let playing_affected = app.playing.as_ref().is_some_and(|playing| {
        paths
            .iter()
            .any(|removed| path_is_or_under(&playing.relative_path, removed))
    });

    if playing_affected {
        app.audio_player.stop()?;
        app.playing = None;
        app.item_list.set_now_playing(None);
    }

    Ok(())
}

/// Stops playback if the playing item sits inside a folder whose kind just
/// changed.
pub(super) fn handle_folder_kind_updated(app: &mut App, paths: Vec<String>) -> Result<()> {
    let playing_affected = app.playing.as_ref().is_some_and(|playing| {
        paths
            .iter()
            .any(|folder| {
                playing.relative_path != *folder
                    && path_is_or_under(&playing.relative_path, folder)
            })
    });

    if playing_affected {
        app.audio_player.stop()?;
        app.playing = None;
        app.item_list.set_now_playing(None);
    }

    Ok(())
}

pub(super) fn handle_row_progress_updated(app: &mut App, relative_path: &str, percent: f64) {
    app.item_list.patch_progress(relative_path, percent);
}

pub(super) fn handle_folder_progress_updated(app: &mut App, relative_path: &str, progress: f64) {
    app.item_list.patch_folder_progress(relative_path, progress);
}

pub(super) fn handle_play_book(app: &mut App, item: SimpleLibraryItem) -> Result<()> {
    let file = item.file_path(&app.storage_root);

    if !file.exists() {
        if item.remote_url.is_some() {
            // The file never arrived; fall back to downloading it.
            app.task_tx.send(AppTask::StartDownload {
                relative_path: item.relative_path.clone(),
            })?;
            return Ok(());
        }
        app.alert = Some(format!("File missing: {}", item.last_path_component()));
        return Ok(());
    }

    info!(path = %item.relative_path, "starting playback");
    app.audio_player
        .play_book(&file.to_string_lossy(), item.current_time)?;

    app.player_duration = (item.duration > 0.0).then_some(item.duration);
    app.player_time = None;
    app.last_recorded_second = None;
    app.item_list
        .set_now_playing(Some(item.relative_path.clone()));
    app.playing = Some(item);

    Ok(())
}

pub(super) fn handle_player_state_changed(app: &mut App, state: PlayerState) {
    app.player_state = state;
}

pub(super) fn handle_duration_changed(app: &mut App, duration: f64) {
    if duration > 0.0 {
        app.player_duration = Some(duration);
    }
}

/// Folds engine position updates into persisted progress, at most once per
/// whole second to keep the task channel quiet.
pub(super) fn handle_time_changed(app: &mut App, seconds: f64) -> Result<()> {
    app.player_time = Some(seconds);

    let Some(playing) = app.playing.as_ref() else {
        return Ok(());
    };

    let whole_second = seconds as u64;
    if app.last_recorded_second == Some(whole_second) {
        return Ok(());
    }
    app.last_recorded_second = Some(whole_second);

    app.task_tx.send(AppTask::RecordProgress {
        relative_path: playing.relative_path.clone(),
        position: seconds,
        duration: app.player_duration.unwrap_or(playing.duration),
    })?;

    Ok(())
}

pub(super) fn handle_volume_changed(app: &mut App, volume: u32) {
    app.volume = Some(volume);
}

pub(super) fn handle_speed_changed(app: &mut App, speed: f64) {
    app.speed = speed;
}

pub(super) fn handle_book_finished(app: &mut App) -> Result<()> {
    if let Some(playing) = app.playing.take() {
        app.item_list.set_now_playing(None);
        app.task_tx.send(AppTask::FinishBook {
            relative_path: playing.relative_path,
        })?;
    }

    Ok(())
}

pub(super) fn handle_download_started(app: &mut App, relative_path: String, handle: DownloadHandle) {
    app.item_list.track_download(relative_path, handle);
}

pub(super) fn handle_download_progress(app: &mut App, relative_path: &str, fraction: f64) {
    app.item_list.note_download_progress(relative_path, fraction);
}

pub(super) fn handle_download_completed(app: &mut App, relative_path: &str) -> Result<()> {
    info!(path = relative_path, "download finished");
    app.item_list.finish_download(relative_path);
    app.task_tx.send(AppTask::AdoptDownloaded {
        relative_path: relative_path.to_string(),
    })?;

    Ok(())
}

pub(super) fn handle_download_failed(app: &mut App, relative_path: &str, message: String) {
    warn!(path = relative_path, message = %message, "download failed");
    app.item_list.finish_download(relative_path);
    app.alert = Some(format!("Download failed: {message}"));
}

pub(super) fn handle_server_found(app: &mut App, name: Option<String>) {
    app.connect_form.server_found(name);
}

pub(super) fn handle_signed_in(app: &mut App, connection: ConnectionData) -> Result<()> {
    app.connect_form.signed_in();
    open_remote_library(app, connection)
}

pub(super) fn handle_signed_out(app: &mut App) {
    app.connection = None;
    app.remote = None;
    app.connect_form.reset();
    app.main_view = MainView::Library;
}

pub(super) fn handle_connection_restored(
    app: &mut App,
    connection: Option<ConnectionData>,
) -> Result<()> {
    match connection {
        Some(connection) => open_remote_library(app, connection),
        None => {
            // Nothing saved; fall back to the interactive connect flow.
            app.main_view = MainView::Connect;
            Ok(())
        }
    }
}

/// Eagerly pushes the remote library browser for an established connection.
fn open_remote_library(app: &mut App, connection: ConnectionData) -> Result<()> {
    let mut browser = RemoteBrowser::new(connection.server_name.clone());
    browser.loading = true;

    app.connection = Some(connection);
    app.remote = Some(browser);
    app.main_view = MainView::Remote;
    app.task_tx.send(AppTask::FetchRemoteViews)?;

    Ok(())
}

pub(super) fn handle_remote_views(app: &mut App, items: Vec<MediaItem>) {
    if let Some(remote) = app.remote.as_mut() {
        if remote.levels.is_empty() {
            let total = items.len() as i64;
            remote.apply_page(items, total, true);
        }
    }
}

pub(super) fn handle_remote_children(
    app: &mut App,
    items: Vec<MediaItem>,
    total: i64,
    reset: bool,
) {
    if let Some(remote) = app.remote.as_mut() {
        if !remote.levels.is_empty() {
            remote.apply_page(items, total, reset);
        }
    }
}

pub(super) fn handle_error(app: &mut App, message: String) {
    warn!(message = %message, "surfacing error alert");
    // A failed resolve or sign-in unfreezes the connection form.
    app.connect_form.busy = false;
    if let Some(remote) = app.remote.as_mut() {
        remote.loading = false;
    }
    app.alert = Some(message);
}

pub(super) fn handle_fatal_error(app: &mut App, message: String) {
    tracing::error!(message = %message, "fatal error");
    app.alert = Some(format!("Fatal: {message}"));
}

/// Executes a submitted `:` command.
pub(super) fn execute_user_command(app: &mut App, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Quit => app.event_tx.send(AppEvent::ExitApplication)?,

        UserCommand::Import(path) => app.task_tx.send(AppTask::ImportPaths {
            sources: vec![path],
            destination: app.item_list.folder.clone(),
        })?,

        UserCommand::MakeFolder(title) => app.task_tx.send(AppTask::CreateFolder {
            title,
            parent: app.item_list.folder.clone(),
        })?,

        UserCommand::Sort(kind) => app.task_tx.send(AppTask::SortContents {
            parent: app.item_list.folder.clone(),
            kind,
        })?,

        UserCommand::Find(text) => app.task_tx.send(AppTask::Search(text))?,

        UserCommand::LoadAll => {
            if let Some(request) = app.item_list.load_all_request() {
                app.task_tx.send(AppTask::FetchItems(request))?;
            }
        }

        UserCommand::Root => app.event_tx.send(AppEvent::OpenFolder {
            folder: None,
            title: "Library".to_string(),
        })?,

        UserCommand::Move(destination) => {
            if let Some(item) = app.item_list.selected_item() {
                app.task_tx.send(AppTask::MoveItems {
                    paths: vec![item.relative_path.clone()],
                    destination,
                })?;
            }
        }

        UserCommand::Bind | UserCommand::Unbind => {
            if let Some(item) = app.item_list.selected_item() {
                let kind = if matches!(command, UserCommand::Bind) {
                    crate::model::ItemKind::Bound
                } else {
                    crate::model::ItemKind::Folder
                };
                app.task_tx.send(AppTask::UpdateFolderKind {
                    paths: vec![item.relative_path.clone()],
                    kind,
                })?;
            }
        }

        UserCommand::Connect(url) => match url {
            Some(url) => {
                app.connect_form.reset();
                app.connect_form.server_url = tui_input::Input::new(url);
                app.main_view = MainView::Connect;
            }
            // Bare `:connect` reuses this session's connection, then falls
            // back to the persisted record.
            None => {
                if let Some(connection) = app.connection.clone() {
                    return open_remote_library(app, connection);
                }
                app.task_tx.send(AppTask::RestoreConnection)?;
            }
        },

        UserCommand::SignOut => app.task_tx.send(AppTask::SignOut)?,

        UserCommand::Accent(hex) => match crate::theme::parse_hex(&hex) {
            Some(accent) => {
                app.theme = app.theme.with_accent(accent);
                app.config.accent_colour = Some(hex);
                if let Err(e) = crate::config::save_config(&app.config) {
                    warn!(error = %e, "could not persist accent");
                }
                app.task_tx.send(AppTask::SetAccent { accent })?;
            }
            None => app.alert = Some(format!("Not a color: {hex}")),
        },
    }

    Ok(())
}
