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

//! Asynchronous application task processing.
//!
//! This module implements the command pattern used to offload blocking work
//! from the main UI thread: database queries, structural library mutations,
//! file import, and media-server calls. A dedicated worker loop translates
//! [`AppTask`] requests into operations and broadcasts the results back to
//! the application via [`AppEvent`]s.
//!
//! Errors never escape the loop; each failed task surfaces as an
//! [`AppEvent::Error`] alert and the operation is abandoned, leaving
//! recovery to the user.

mod handlers;

use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use anyhow::Result;
use rusqlite::Connection;
use tracing::error;

use crate::account::AccountStore;
use crate::artwork::ArtworkCache;
use crate::browser::PageRequest;
use crate::config::AppConfig;
use crate::db;
use crate::events::AppEvent;
use crate::jellyfin::client::JellyfinClient;
use crate::jellyfin::models::MediaItem;
use crate::model::{DeleteMode, SortKind};

#[derive(Debug)]
pub(crate) enum AppTask {
    // Library fetches
    FetchItems(PageRequest),
    FetchRecent,
    Search(String),

    // Structural mutations
    ImportPaths {
        sources: Vec<std::path::PathBuf>,
        destination: Option<String>,
    },
    CreateFolder {
        title: String,
        parent: Option<String>,
    },
    MoveItems {
        paths: Vec<String>,
        destination: Option<String>,
    },
    DeleteItems {
        paths: Vec<String>,
        mode: DeleteMode,
    },
    ReorderItem {
        parent: Option<String>,
        source_index: usize,
        destination_index: usize,
    },
    SortContents {
        parent: Option<String>,
        kind: SortKind,
    },
    UpdateFolderKind {
        paths: Vec<String>,
        kind: crate::model::ItemKind,
    },
    MarkFinished {
        paths: Vec<String>,
        flag: bool,
    },
    /// Theme accent changed; regenerate default artwork from the new seed.
    SetAccent {
        accent: (u8, u8, u8),
    },
    ResetPosition {
        paths: Vec<String>,
    },

    // Playback bookkeeping
    RequestPlayback {
        relative_path: String,
    },
    PlayFolder {
        relative_path: String,
    },
    RecordProgress {
        relative_path: String,
        position: f64,
        duration: f64,
    },
    FinishBook {
        relative_path: String,
    },

    // Downloads
    StartDownload {
        relative_path: String,
    },
    AdoptDownloaded {
        relative_path: String,
    },

    // Media server
    ResolveServer {
        url: String,
    },
    SignIn {
        url: String,
        username: String,
        password: String,
        remember: bool,
        server_name: Option<String>,
    },
    SignOut,
    RestoreConnection,
    FetchRemoteViews,
    FetchRemoteChildren {
        parent_id: String,
        start_index: i64,
        reset: bool,
    },
    StartRemoteDownload {
        item: MediaItem,
        folder: String,
    },
}

/// Spawns a background thread to process application tasks.
///
/// This worker thread initializes its own database connection, credential
/// store and artwork cache, and enters a blocking loop listening for
/// incoming [`AppTask`]s.
///
/// # Arguments
///
/// * `config` - The application configuration.
/// * `task_rx` - The receiving end of the task channel.
/// * `event_tx` - The sending end of the channel for broadcasting results.
pub(crate) fn spawn_task_worker(
    config: &AppConfig,
    task_rx: Receiver<AppTask>,
    event_tx: Sender<AppEvent>,
) {
    let config = config.clone();

    thread::spawn(move || {
        let storage_root = config.storage_root();
        if let Err(e) = std::fs::create_dir_all(&storage_root) {
            let _ = event_tx.send(AppEvent::FatalError(format!(
                "Cannot create storage root {}: {e}",
                storage_root.display()
            )));
            return;
        }

        let mut conn = match db::init_db(&config.database_file()) {
            Ok(conn) => conn,
            Err(e) => {
                let _ = event_tx.send(AppEvent::FatalError(format!(
                    "Failed to initialise database: {e:#}"
                )));
                return;
            }
        };

        if let Ok(adopted) = db::adopt_orphans(&conn) {
            if adopted > 0 {
                tracing::warn!(adopted, "adopted orphaned items into the library root");
            }
        }

        let accent = config
            .accent_colour
            .as_deref()
            .and_then(crate::theme::parse_hex)
            .unwrap_or_else(|| crate::theme::Theme::default_theme().accent_rgb());

        let mut ctx = TaskContext {
            config: &config,
            event_tx: &event_tx,
            conn: &mut conn,
            artwork: ArtworkCache::new(config.artwork_dir(), accent),
            account: AccountStore::new(config.account_dir()),
            client: None,
        };

        while let Ok(task) = task_rx.recv() {
            if let Err(e) = handlers::handle_task(task, &mut ctx) {
                error!(error = %format!("{e:#}"), "task failed");
                let _ = event_tx.send(AppEvent::Error(e.to_string()));
            }
        }
    });
}

/// Bundles shared resources required by task handlers to simplify resource
/// passing when invoking those handler functions.
pub(super) struct TaskContext<'a> {
    pub(super) config: &'a AppConfig,
    pub(super) event_tx: &'a Sender<AppEvent>,
    pub(super) conn: &'a mut Connection,
    pub(super) artwork: ArtworkCache,
    pub(super) account: AccountStore,
    /// Signed-in media-server client; present between sign-in/restore and
    /// sign-out.
    pub(super) client: Option<JellyfinClient>,
}

pub(super) type TaskResult = Result<()>;
