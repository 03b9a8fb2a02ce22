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

//! Jellyfin integration: connection flow and remote library browsing state.
//!
//! The connection screen is a three-state machine. From `Disconnected` only
//! the server URL is editable; once the server's identity resolves, the form
//! moves to `FoundServer` and asks for credentials plus a remember-me flag;
//! successful sign-in lands in `Connected`, after which navigation pushes
//! the remote library browser.

pub(crate) mod client;
pub(crate) mod models;

use ratatui::widgets::ListState;
use tui_input::Input;

use crate::jellyfin::models::MediaItem;

/// Connection-screen state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ConnectionState {
    #[default]
    Disconnected,
    FoundServer,
    Connected,
}

/// Input focus within the connection form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectField {
    ServerUrl,
    Username,
    Password,
    RememberMe,
}

/// Form state for the connection screen.
pub(crate) struct ConnectionForm {
    pub(crate) state: ConnectionState,
    pub(crate) server_url: Input,
    pub(crate) username: Input,
    pub(crate) password: Input,
    pub(crate) remember_me: bool,
    pub(crate) server_name: Option<String>,
    pub(crate) focus: ConnectField,
    /// A sign-in request is in flight; inputs are frozen until it resolves.
    pub(crate) busy: bool,
}

impl ConnectionForm {
    pub(crate) fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            server_url: Input::default(),
            username: Input::default(),
            password: Input::default(),
            remember_me: false,
            server_name: None,
            focus: ConnectField::ServerUrl,
            busy: false,
        }
    }

    /// Records a resolved server identity; only meaningful while
    /// disconnected.
    pub(crate) fn server_found(&mut self, name: Option<String>) {
        if self.state != ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::FoundServer;
        self.server_name = name;
        self.focus = ConnectField::Username;
        self.busy = false;
    }

    /// Marks the flow connected; only meaningful after a server was found.
    pub(crate) fn signed_in(&mut self) {
        if self.state != ConnectionState::FoundServer {
            return;
        }
        self.state = ConnectionState::Connected;
        self.busy = false;
    }

    /// Drops back to the initial state, keeping the typed server URL.
    pub(crate) fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.username = Input::default();
        self.password = Input::default();
        self.remember_me = false;
        self.server_name = None;
        self.focus = ConnectField::ServerUrl;
        self.busy = false;
    }

    /// Moves focus to the next editable field for the current state.
    pub(crate) fn next_field(&mut self) {
        self.focus = match (self.state, self.focus) {
            (ConnectionState::Disconnected, _) => ConnectField::ServerUrl,
            (_, ConnectField::Username) => ConnectField::Password,
            (_, ConnectField::Password) => ConnectField::RememberMe,
            (_, ConnectField::RememberMe) => ConnectField::Username,
            (_, ConnectField::ServerUrl) => ConnectField::Username,
        };
    }

    pub(crate) fn focused_input(&mut self) -> Option<&mut Input> {
        match (self.state, self.focus) {
            (ConnectionState::Disconnected, _) => Some(&mut self.server_url),
            (ConnectionState::FoundServer, ConnectField::Username) => Some(&mut self.username),
            (ConnectionState::FoundServer, ConnectField::Password) => Some(&mut self.password),
            _ => None,
        }
    }
}

/// One level of the remote browsing stack.
pub(crate) struct RemoteLevel {
    pub(crate) parent_id: String,
    pub(crate) title: String,
}

/// State of the remote library browser.
///
/// The top of the stack is the folder currently on screen; an empty stack
/// means the user's top-level views are showing. Children are paged with
/// `StartIndex`/`Limit`, so the same bounds discipline as the local browser
/// applies: the fetched count never exceeds the reported total.
pub(crate) struct RemoteBrowser {
    pub(crate) library_name: String,
    pub(crate) levels: Vec<RemoteLevel>,
    pub(crate) items: Vec<MediaItem>,
    pub(crate) total: i64,
    pub(crate) list_state: ListState,
    pub(crate) loading: bool,
}

impl RemoteBrowser {
    pub(crate) fn new(library_name: String) -> Self {
        Self {
            library_name,
            levels: Vec::new(),
            items: Vec::new(),
            total: 0,
            list_state: ListState::default(),
            loading: false,
        }
    }

    pub(crate) fn current_parent(&self) -> Option<&RemoteLevel> {
        self.levels.last()
    }

    /// Descends into a remote folder, clearing the current page.
    pub(crate) fn enter(&mut self, folder: &MediaItem) {
        self.levels.push(RemoteLevel {
            parent_id: folder.id.clone(),
            title: folder.name.clone(),
        });
        self.items.clear();
        self.total = 0;
        self.list_state = ListState::default();
    }

    /// Pops one level; returns `false` when already at the top views.
    pub(crate) fn leave(&mut self) -> bool {
        if self.levels.pop().is_none() {
            return false;
        }
        self.items.clear();
        self.total = 0;
        self.list_state = ListState::default();
        true
    }

    /// The next `StartIndex` to request, or `None` once everything the
    /// server reported has been fetched.
    pub(crate) fn next_page_start(&self) -> Option<i64> {
        let fetched = self.items.len() as i64;
        if self.total > 0 && fetched >= self.total {
            return None;
        }
        Some(fetched)
    }

    pub(crate) fn apply_page(&mut self, items: Vec<MediaItem>, total: i64, reset: bool) {
        if reset {
            self.items = items;
        } else {
            self.items.extend(items);
        }
        self.total = total;
        if self.list_state.selected().is_none() && !self.items.is_empty() {
            self.list_state.select(Some(0));
        }
        self.loading = false;
    }

    pub(crate) fn selected_item(&self) -> Option<&MediaItem> {
        self.items.get(self.list_state.selected()?)
    }

    pub(crate) fn select_next(&mut self) {
        select_next(&mut self.list_state, self.items.len());
    }

    pub(crate) fn select_previous(&mut self) {
        select_previous(&mut self.list_state, self.items.len());
    }

    /// The relative-path prefix downloads from this server land under.
    pub(crate) fn download_folder(&self) -> String {
        if self.library_name.is_empty() {
            "Jellyfin".to_string()
        } else {
            format!("Jellyfin/{}", self.library_name)
        }
    }
}

fn select_next(state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) => {
            if i >= len - 1 {
                0
            } else {
                i + 1
            }
        }
        None => 0,
    };
    state.select(Some(i));
}

fn select_previous(state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let i = match state.selected() {
        Some(i) => {
            if i == 0 {
                len - 1
            } else {
                i - 1
            }
        }
        None => 0,
    };
    state.select(Some(i));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, name: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: name.to_string(),
            media_type: "Folder".to_string(),
            path: None,
            is_folder: true,
            run_time_ticks: None,
            container: None,
        }
    }

    #[test]
    fn connection_flow_walks_the_three_states() {
        let mut form = ConnectionForm::new();
        assert_eq!(form.state, ConnectionState::Disconnected);

        form.server_found(Some("Home Server".to_string()));
        assert_eq!(form.state, ConnectionState::FoundServer);
        assert_eq!(form.server_name.as_deref(), Some("Home Server"));

        form.signed_in();
        assert_eq!(form.state, ConnectionState::Connected);
    }

    #[test]
    fn out_of_order_transitions_are_ignored() {
        let mut form = ConnectionForm::new();

        // Cannot sign in before a server was found.
        form.signed_in();
        assert_eq!(form.state, ConnectionState::Disconnected);

        form.server_found(None);
        // A second resolution while already past Disconnected is a no-op.
        form.server_found(Some("Other".to_string()));
        assert_eq!(form.server_name, None);
    }

    #[test]
    fn reset_keeps_the_server_url_text() {
        let mut form = ConnectionForm::new();
        form.server_url = Input::new("http://host".to_string());
        form.server_found(Some("Home".to_string()));

        form.reset();
        assert_eq!(form.state, ConnectionState::Disconnected);
        assert_eq!(form.server_url.value(), "http://host");
        assert_eq!(form.server_name, None);
    }

    #[test]
    fn remote_paging_stops_at_the_reported_total() {
        let mut browser = RemoteBrowser::new("Audiobooks".to_string());
        browser.enter(&folder("f1", "Stories"));

        assert_eq!(browser.next_page_start(), Some(0));

        browser.apply_page(vec![folder("a", "A"), folder("b", "B")], 3, true);
        assert_eq!(browser.next_page_start(), Some(2));

        browser.apply_page(vec![folder("c", "C")], 3, false);
        assert_eq!(browser.next_page_start(), None);
        assert_eq!(browser.items.len(), 3);
    }

    #[test]
    fn leave_stops_at_the_top_views() {
        let mut browser = RemoteBrowser::new("Audiobooks".to_string());
        assert!(!browser.leave());

        browser.enter(&folder("f1", "Stories"));
        assert!(browser.leave());
        assert!(!browser.leave());
    }

    #[test]
    fn downloads_land_under_the_server_folder() {
        let browser = RemoteBrowser::new("Home Server".to_string());
        assert_eq!(browser.download_folder(), "Jellyfin/Home Server");
    }
}
