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

//! Render the library browser.
//!
//! One folder level at a time: a header strip with the most recently played
//! books, then the item table with per-row playback and download state.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::{
    App,
    model::{DownloadState, ItemKind, SimpleLibraryItem},
    render::icons::{
        ICON_BOOK, ICON_BOUND, ICON_DOWNLOADING, ICON_FINISHED, ICON_FOLDER, ICON_PLAY,
        ICON_REMOTE,
    },
    util,
};

pub(crate) fn draw_library(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    draw_recent_strip(f, chunks[0], app);
    draw_item_table(f, chunks[1], app);
}

/// The "last played" header, the terminal counterpart of the home-screen
/// widget.
fn draw_recent_strip(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " Last played: ",
        Style::default().fg(app.theme.table_duration_fg),
    )];

    if app.item_list.recent.is_empty() {
        spans.push(Span::raw("nothing yet"));
    } else {
        for (index, item) in app.item_list.recent.iter().enumerate() {
            if index > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(
                item.title.clone(),
                Style::default().fg(app.theme.accent_colour),
            ));
            spans.push(Span::styled(
                format!(" {}", util::format_percent(item.percent_completed)),
                Style::default().fg(app.theme.table_progress_fg),
            ));
        }
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_item_table(f: &mut Frame, area: Rect, app: &mut App) {
    let mut title = format!(
        " {} ({}/{}) ",
        app.item_list.title,
        app.item_list.items.len(),
        app.item_list.total
    );
    if !app.item_list.pending_downloads.is_empty() {
        title.push_str("… starting download ");
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border_colour))
        .title(title);

    if app.item_list.items.is_empty() {
        let empty = Paragraph::new("  Library is empty. Use :import <path> to add audiobooks.")
            .style(Style::default().fg(app.theme.table_duration_fg))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = app
        .item_list
        .items
        .iter()
        .map(|item| item_row(app, item))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(20),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(10),
        ],
    )
    .block(block)
    .row_highlight_style(
        Style::default()
            .bg(app.theme.gauge_track_colour)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    f.render_stateful_widget(table, area, &mut app.item_list.table_state);
}

fn item_row<'a>(app: &App, item: &'a SimpleLibraryItem) -> Row<'a> {
    let in_play = app.item_list.is_in_play(item);

    let state_icon = match item.kind {
        ItemKind::Folder => ICON_FOLDER,
        ItemKind::Bound => ICON_BOUND,
        ItemKind::Book => {
            if in_play {
                ICON_PLAY
            } else {
                match app.item_list.download_state(item, &app.storage_root) {
                    DownloadState::NotDownloaded => ICON_REMOTE,
                    DownloadState::Downloading(_) => ICON_DOWNLOADING,
                    DownloadState::Downloaded => ICON_BOOK,
                }
            }
        }
    };

    let title_style = if in_play {
        Style::default()
            .fg(app.theme.playing_fg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(app.theme.table_title_fg)
    };

    let kind = match item.kind {
        ItemKind::Folder => "folder",
        ItemKind::Bound => "bound",
        ItemKind::Book => "book",
    };

    let progress = match app.item_list.download_state(item, &app.storage_root) {
        DownloadState::Downloading(fraction) => format!("{:>3.0}%{}", fraction * 100.0, ICON_DOWNLOADING),
        _ if item.is_finished => ICON_FINISHED.to_string(),
        _ => util::format_percent(item.percent_completed),
    };

    Row::new(vec![
        Cell::from(state_icon),
        Cell::from(Span::styled(item.title.as_str(), title_style)),
        Cell::from(Span::styled(
            kind,
            Style::default().fg(app.theme.table_kind_fg),
        )),
        Cell::from(Span::styled(
            progress,
            Style::default().fg(app.theme.table_progress_fg),
        )),
        Cell::from(Span::styled(
            util::format_time(item.duration.max(0.0) as u64),
            Style::default().fg(app.theme.table_duration_fg),
        )),
    ])
}
