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

//! Application logic, event handling, and task dispatching.
//!
//! This module acts as the central hub for the "Controller" logic of the
//! application. Every cross-component signal is a typed [`AppEvent`] on one
//! channel (keyboard input, worker results, playback progress, download
//! progress), so no listener depends on string-named broadcasts.
//!
//! # Organization
//!
//! * [`AppEvent`]: all events the main loop reacts to.
//! * [`handlers`]: one handler function per event.
//!
//! Destructive actions (deleting items, cancelling a running download) pass
//! through a typed [`Prompt`] so the user confirms before anything happens.

mod handlers;
use handlers::*;

use std::io::Stdout;

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{Terminal, prelude::CrosstermBackend};
use tui_input::backend::crossterm::EventHandler;

use crate::{
    App, MainView,
    account::ConnectionData,
    browser::FetchKind,
    commander::CommanderOutcome,
    downloads::DownloadHandle,
    jellyfin::ConnectionState,
    jellyfin::models::MediaItem,
    model::{DeleteMode, DownloadState, SimpleLibraryItem},
    player::PlayerState,
    render::draw,
    tasks::AppTask,
};

const FINE_VOLUME_DELTA: i32 = 1;
const VOLUME_DELTA: i32 = 5;

const FINE_SEEK_DELTA: i32 = 5;
const SEEK_DELTA: i32 = 20;

const SPEED_DELTA: f64 = 0.1;

#[derive(Debug)]
pub(crate) enum AppEvent {
    Key(KeyEvent),
    Tick,
    ExitApplication,

    SetMainView(MainView),
    OpenFolder {
        folder: Option<String>,
        title: String,
    },

    ItemsFetched {
        kind: FetchKind,
        items: Vec<SimpleLibraryItem>,
        total: i64,
    },
    RecentFetched(Vec<SimpleLibraryItem>),
    SearchResultsReady(Vec<SimpleLibraryItem>),
    LibraryMutated {
        padding: i64,
    },
    ItemsDeleted {
        paths: Vec<String>,
    },
    FolderKindUpdated {
        paths: Vec<String>,
    },
    RowProgressUpdated {
        relative_path: String,
        percent: f64,
    },
    FolderProgressUpdated {
        relative_path: String,
        progress: f64,
    },

    PlayBook {
        item: SimpleLibraryItem,
    },
    PlayerStateChanged(PlayerState),
    DurationChanged(f64),
    TimeChanged(f64),
    VolumeChanged(u32),
    SpeedChanged(f64),
    BookFinished,

    DownloadStarted {
        relative_path: String,
        handle: DownloadHandle,
    },
    DownloadProgress {
        relative_path: String,
        fraction: f64,
    },
    DownloadCompleted {
        relative_path: String,
    },
    DownloadFailed {
        relative_path: String,
        message: String,
    },

    ServerFound {
        name: Option<String>,
    },
    SignedIn {
        connection: ConnectionData,
    },
    SignedOut,
    ConnectionRestored {
        connection: Option<ConnectionData>,
    },
    RemoteViews {
        items: Vec<MediaItem>,
    },
    RemoteChildren {
        items: Vec<MediaItem>,
        total: i64,
        reset: bool,
    },

    Error(String),
    FatalError(String),
}

/// A pending confirmation shown as an overlay; `y` runs the action.
#[derive(Debug)]
pub(crate) struct Prompt {
    pub(crate) message: String,
    pub(crate) action: PromptAction,
}

#[derive(Debug)]
pub(crate) enum PromptAction {
    CancelDownload { relative_path: String },
    DeleteItems { paths: Vec<String>, mode: DeleteMode },
}

/// Runs the main application loop, handling events and rendering the UI in
/// the terminal.
///
/// This function loops until a 'quit' event is received or the event channel
/// is closed.
pub(crate) fn process_events(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<()> {
    while let Ok(event) = app.event_rx.recv() {
        if matches!(event, AppEvent::ExitApplication) {
            break;
        }

        match event {
            AppEvent::Key(key) => process_key_event(app, key)?,
            AppEvent::SetMainView(view) => handle_set_main_view(app, view),
            AppEvent::OpenFolder { folder, title } => handle_open_folder(app, folder, title)?,
            AppEvent::ItemsFetched { kind, items, total } => {
                handle_items_fetched(app, kind, items, total)
            }
            AppEvent::RecentFetched(items) => handle_recent_fetched(app, items),
            AppEvent::SearchResultsReady(results) => handle_search_results_ready(app, results),
            AppEvent::LibraryMutated { padding } => handle_library_mutated(app, padding)?,
            AppEvent::ItemsDeleted { paths } => handle_items_deleted(app, paths)?,
            AppEvent::FolderKindUpdated { paths } => handle_folder_kind_updated(app, paths)?,
            AppEvent::RowProgressUpdated {
                relative_path,
                percent,
            } => handle_row_progress_updated(app, &relative_path, percent),
            AppEvent::FolderProgressUpdated {
                relative_path,
                progress,
            } => handle_folder_progress_updated(app, &relative_path, progress),
            AppEvent::PlayBook { item } => handle_play_book(app, item)?,
            AppEvent::PlayerStateChanged(state) => handle_player_state_changed(app, state),
            AppEvent::DurationChanged(duration) => handle_duration_changed(app, duration),
            AppEvent::TimeChanged(seconds) => handle_time_changed(app, seconds)?,
            AppEvent::VolumeChanged(volume) => handle_volume_changed(app, volume),
            AppEvent::SpeedChanged(speed) => handle_speed_changed(app, speed),
            AppEvent::BookFinished => handle_book_finished(app)?,
            AppEvent::DownloadStarted {
                relative_path,
                handle,
            } => handle_download_started(app, relative_path, handle),
            AppEvent::DownloadProgress {
                relative_path,
                fraction,
            } => handle_download_progress(app, &relative_path, fraction),
            AppEvent::DownloadCompleted { relative_path } => {
                handle_download_completed(app, &relative_path)?
            }
            AppEvent::DownloadFailed {
                relative_path,
                message,
            } => handle_download_failed(app, &relative_path, message),
            AppEvent::ServerFound { name } => handle_server_found(app, name),
            AppEvent::SignedIn { connection } => handle_signed_in(app, connection)?,
            AppEvent::SignedOut => handle_signed_out(app),
            AppEvent::ConnectionRestored { connection } => {
                handle_connection_restored(app, connection)?
            }
            AppEvent::RemoteViews { items } => handle_remote_views(app, items),
            AppEvent::RemoteChildren {
                items,
                total,
                reset,
            } => handle_remote_children(app, items, total, reset),
            AppEvent::Error(message) => handle_error(app, message),
            AppEvent::FatalError(message) => handle_fatal_error(app, message),
            AppEvent::Tick | AppEvent::ExitApplication => {}
        }

        terminal.draw(|f| draw(f, app))?;
    }

    Ok(())
}

/// Maps keyboard input to application actions and playback commands.
///
/// Input is routed through a fixed precedence: a visible alert swallows the
/// key, then a pending prompt, then the `:` commander, then the screen that
/// currently owns the main view.
fn process_key_event(app: &mut App, key: KeyEvent) -> Result<()> {
    if app.alert.take().is_some() {
        return Ok(());
    }

    if let Some(prompt) = app.prompt.take() {
        return process_prompt_key(app, prompt, key);
    }

    match app.commander.handle_event(Event::Key(key)) {
        CommanderOutcome::Handled => return Ok(()),
        CommanderOutcome::Submitted(command) => return execute_user_command(app, command),
        CommanderOutcome::NotHandled => {}
    }

    match app.main_view {
        MainView::Library => process_library_key(app, key),
        MainView::Remote => process_remote_key(app, key),
        MainView::Connect => process_connect_key(app, key),
    }
}

fn process_prompt_key(app: &mut App, prompt: Prompt, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => match prompt.action {
            PromptAction::CancelDownload { relative_path } => {
                app.item_list.cancel_download(&relative_path);
                Ok(())
            }
            PromptAction::DeleteItems { paths, mode } => {
                app.task_tx.send(AppTask::DeleteItems { paths, mode })?;
                Ok(())
            }
        },
        KeyCode::Char('n') | KeyCode::Esc => Ok(()),
        _ => {
            // Any other key keeps the prompt up.
            app.prompt = Some(prompt);
            Ok(())
        }
    }
}

fn process_library_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => {
            app.event_tx.send(AppEvent::ExitApplication)?;
        }

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => {
            app.item_list.select_next();
            request_next_page_if_needed(app)?;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.item_list.select_previous();
        }
        KeyCode::Char('h') | KeyCode::Left => {
            if let Some(parent) = app.item_list.parent_folder() {
                let title = parent
                    .as_deref()
                    .and_then(|path| path.rsplit('/').next())
                    .unwrap_or("Library")
                    .to_string();
                app.event_tx.send(AppEvent::OpenFolder {
                    folder: parent,
                    title,
                })?;
            }
        }

        // Activation: folders open, books download/cancel/play depending on
        // their download state.
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            activate_selected_item(app)?;
        }

        // Play a whole folder from its first unfinished book.
        KeyCode::Char('p') => {
            if let Some(item) = app.item_list.selected_item() {
                let path = item.relative_path.clone();
                match item.kind {
                    crate::model::ItemKind::Folder | crate::model::ItemKind::Bound => {
                        app.task_tx.send(AppTask::PlayFolder {
                            relative_path: path,
                        })?;
                    }
                    crate::model::ItemKind::Book => activate_selected_item(app)?,
                }
            }
        }

        // Reorder the selected row within this folder level.
        KeyCode::Char('J') => reorder_selected(app, 1)?,
        KeyCode::Char('K') => reorder_selected(app, -1)?,

        // Deletion prompts; 'd' removes the subtree, 'D' keeps children.
        KeyCode::Char('d') => prompt_delete(app, DeleteMode::Deep)?,
        KeyCode::Char('D') => prompt_delete(app, DeleteMode::Shallow)?,

        KeyCode::Char('f') => {
            if let Some(item) = app.item_list.selected_item() {
                app.task_tx.send(AppTask::MarkFinished {
                    paths: vec![item.relative_path.clone()],
                    flag: !item.is_finished,
                })?;
            }
        }
        KeyCode::Char('u') => {
            if let Some(item) = app.item_list.selected_item() {
                app.task_tx.send(AppTask::ResetPosition {
                    paths: vec![item.relative_path.clone()],
                })?;
            }
        }

        // Playback controls
        KeyCode::Char(',') => app.audio_player.seek(-FINE_SEEK_DELTA)?,
        KeyCode::Char('.') => app.audio_player.seek(FINE_SEEK_DELTA)?,
        KeyCode::Char('<') => app.audio_player.seek(-SEEK_DELTA)?,
        KeyCode::Char('>') => app.audio_player.seek(SEEK_DELTA)?,
        KeyCode::Char(' ') => app.audio_player.toggle_pause()?,
        KeyCode::Char('s') => {
            app.audio_player.stop()?;
            app.playing = None;
            app.item_list.set_now_playing(None);
        }
        KeyCode::Char('-') => app.audio_player.adjust_volume(-FINE_VOLUME_DELTA)?,
        KeyCode::Char('=') => app.audio_player.adjust_volume(FINE_VOLUME_DELTA)?,
        KeyCode::Char('_') => app.audio_player.adjust_volume(-VOLUME_DELTA)?,
        KeyCode::Char('+') => app.audio_player.adjust_volume(VOLUME_DELTA)?,
        KeyCode::Char('m') => app.audio_player.toggle_mute()?,
        KeyCode::Char('[') => app.audio_player.adjust_speed(-SPEED_DELTA)?,
        KeyCode::Char(']') => app.audio_player.adjust_speed(SPEED_DELTA)?,
        KeyCode::Char('\\') => app.audio_player.reset_speed()?,

        _ => {}
    }

    Ok(())
}

/// Dispatches the tap semantics for the selected library row.
fn activate_selected_item(app: &mut App) -> Result<()> {
    let Some(item) = app.item_list.selected_item().cloned() else {
        return Ok(());
    };

    match item.kind {
        crate::model::ItemKind::Folder => {
            app.event_tx.send(AppEvent::OpenFolder {
                folder: Some(item.relative_path.clone()),
                title: item.title.clone(),
            })?;
        }
        // A bound folder plays through as one continuous book.
        crate::model::ItemKind::Bound => {
            app.task_tx.send(AppTask::PlayFolder {
                relative_path: item.relative_path.clone(),
            })?;
        }
        crate::model::ItemKind::Book => {
            match app.item_list.download_state(&item, &app.storage_root) {
                DownloadState::NotDownloaded => {
                    app.task_tx.send(AppTask::StartDownload {
                        relative_path: item.relative_path.clone(),
                    })?;
                }
                DownloadState::Downloading(_) => {
                    app.prompt = Some(Prompt {
                        message: format!("Cancel download of \"{}\"?", item.title),
                        action: PromptAction::CancelDownload {
                            relative_path: item.relative_path.clone(),
                        },
                    });
                }
                DownloadState::Downloaded => {
                    app.task_tx.send(AppTask::RequestPlayback {
                        relative_path: item.relative_path.clone(),
                    })?;
                }
            }
        }
    }

    Ok(())
}

fn reorder_selected(app: &mut App, delta: i64) -> Result<()> {
    let Some(source_index) = app.item_list.table_state.selected() else {
        return Ok(());
    };
    let destination = source_index as i64 + delta;
    if destination < 0 {
        return Ok(());
    }

    app.task_tx.send(AppTask::ReorderItem {
        parent: app.item_list.folder.clone(),
        source_index,
        destination_index: destination as usize,
    })?;
    app.item_list.table_state.select(Some(
        (destination as usize).min(app.item_list.items.len().saturating_sub(1)),
    ));

    Ok(())
}

fn prompt_delete(app: &mut App, mode: DeleteMode) -> Result<()> {
    if let Some(item) = app.item_list.selected_item() {
        let verb = match mode {
            DeleteMode::Deep => "Delete",
            DeleteMode::Shallow => "Delete (keep contents of)",
        };
        app.prompt = Some(Prompt {
            message: format!("{verb} \"{}\"?", item.title),
            action: PromptAction::DeleteItems {
                paths: vec![item.relative_path.clone()],
                mode,
            },
        });
    }

    Ok(())
}

/// Appends the next page when the selection reaches the bottom row.
fn request_next_page_if_needed(app: &mut App) -> Result<()> {
    let at_bottom = app
        .item_list
        .table_state
        .selected()
        .is_some_and(|selected| selected + 1 >= app.item_list.items.len());

    if at_bottom {
        if let Some(request) = app.item_list.next_request(app.config.page_size) {
            app.task_tx.send(AppTask::FetchItems(request))?;
        }
    }

    Ok(())
}

fn process_remote_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => {
            app.event_tx.send(AppEvent::ExitApplication)?;
            return Ok(());
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(remote) = app.remote.as_mut() {
                remote.select_next();
                let needs_page = remote
                    .list_state
                    .selected()
                    .is_some_and(|selected| selected + 1 >= remote.items.len());
                if needs_page {
                    if let (Some(level), Some(start)) =
                        (remote.current_parent(), remote.next_page_start())
                    {
                        let parent_id = level.parent_id.clone();
                        remote.loading = true;
                        app.task_tx.send(AppTask::FetchRemoteChildren {
                            parent_id,
                            start_index: start,
                            reset: false,
                        })?;
                    }
                }
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(remote) = app.remote.as_mut() {
                remote.select_previous();
            }
        }
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Esc => {
            if let Some(remote) = app.remote.as_mut() {
                if remote.leave() {
                    if let Some(level) = remote.current_parent() {
                        let parent_id = level.parent_id.clone();
                        remote.loading = true;
                        app.task_tx.send(AppTask::FetchRemoteChildren {
                            parent_id,
                            start_index: 0,
                            reset: true,
                        })?;
                    } else {
                        remote.loading = true;
                        app.task_tx.send(AppTask::FetchRemoteViews)?;
                    }
                } else {
                    app.event_tx.send(AppEvent::SetMainView(MainView::Library))?;
                }
            } else {
                app.event_tx.send(AppEvent::SetMainView(MainView::Library))?;
            }
        }
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            let Some(remote) = app.remote.as_mut() else {
                return Ok(());
            };
            let Some(item) = remote.selected_item().cloned() else {
                return Ok(());
            };

            if item.is_folder {
                remote.enter(&item);
                remote.loading = true;
                app.task_tx.send(AppTask::FetchRemoteChildren {
                    parent_id: item.id,
                    start_index: 0,
                    reset: true,
                })?;
            } else {
                let folder = remote.download_folder();
                app.task_tx
                    .send(AppTask::StartRemoteDownload { item, folder })?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn process_connect_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        // Cancel dismisses the flow without side effects.
        KeyCode::Esc => {
            app.connect_form.busy = false;
            app.event_tx.send(AppEvent::SetMainView(MainView::Library))?;
            return Ok(());
        }
        KeyCode::Tab => {
            app.connect_form.next_field();
            return Ok(());
        }
        KeyCode::Enter => {
            if app.connect_form.busy {
                return Ok(());
            }
            match app.connect_form.state {
                ConnectionState::Disconnected => {
                    let url = app.connect_form.server_url.value().trim().to_string();
                    if !url.is_empty() {
                        app.connect_form.busy = true;
                        app.task_tx.send(AppTask::ResolveServer { url })?;
                    }
                }
                ConnectionState::FoundServer => {
                    let form = &app.connect_form;
                    app.task_tx.send(AppTask::SignIn {
                        url: form.server_url.value().trim().to_string(),
                        username: form.username.value().to_string(),
                        password: form.password.value().to_string(),
                        remember: form.remember_me,
                        server_name: form.server_name.clone(),
                    })?;
                    app.connect_form.busy = true;
                }
                ConnectionState::Connected => {}
            }
            return Ok(());
        }
        KeyCode::Char(' ')
            if app.connect_form.focus == crate::jellyfin::ConnectField::RememberMe =>
        {
            app.connect_form.remember_me = !app.connect_form.remember_me;
            return Ok(());
        }
        _ => {}
    }

    if !app.connect_form.busy {
        if let Some(input) = app.connect_form.focused_input() {
            input.handle_event(&Event::Key(key));
        }
    }

    Ok(())
}
