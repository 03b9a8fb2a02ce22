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

//! Render the remote library browser.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::{
    App,
    render::icons::{ICON_BOOK, ICON_FOLDER},
    util,
};

pub(crate) fn draw_remote(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(remote) = app.remote.as_mut() else {
        let hint = Paragraph::new("  Not connected. Use :connect <server-url>.")
            .style(Style::default().fg(app.theme.table_duration_fg));
        f.render_widget(hint, area);
        return;
    };

    let mut title = format!(" Remote: {}", remote.library_name);
    for level in &remote.levels {
        title.push_str(" / ");
        title.push_str(&level.title);
    }
    if remote.loading {
        title.push_str(" (loading…)");
    } else if remote.total > 0 {
        title.push_str(&format!(" ({}/{})", remote.items.len(), remote.total));
    }
    title.push(' ');

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border_colour))
        .title(title);

    let items: Vec<ListItem> = remote
        .items
        .iter()
        .map(|item| {
            let icon = if item.is_folder { ICON_FOLDER } else { ICON_BOOK };
            let mut label = format!("{icon} {}", item.name);
            if !item.is_folder {
                let seconds = item.duration_seconds();
                if seconds > 0.0 {
                    label.push_str(&format!("  ({})", util::format_time(seconds as u64)));
                }
            }
            ListItem::new(label)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(app.theme.gauge_track_colour)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut remote.list_state);
}
