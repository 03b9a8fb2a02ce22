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

//! Render the media-server connection form.
//!
//! The visible fields follow the connection state machine: only the server
//! URL while disconnected, the resolved server plus credentials once the
//! server was found, and a confirmation line when connected.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
};

use crate::{
    App,
    jellyfin::{ConnectField, ConnectionState},
};

pub(crate) fn draw_connect(f: &mut Frame, area: Rect, app: &mut App) {
    let width = area.width.saturating_sub(8).min(64).max(30);
    let height = 14.min(area.height);
    let form_area = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.accent_colour))
        .title(" Connect to Jellyfin ")
        .padding(Padding::uniform(1));

    let inner = block.inner(form_area);
    f.render_widget(block, form_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // server name / placeholder
            Constraint::Length(1), // server url
            Constraint::Length(1),
            Constraint::Length(1), // username
            Constraint::Length(1), // password
            Constraint::Length(1), // remember me
            Constraint::Length(1),
            Constraint::Min(0), // hints
        ])
        .split(inner);

    let form = &app.connect_form;
    let label_style = Style::default().fg(app.theme.table_duration_fg);
    let focus_style = Style::default()
        .fg(app.theme.accent_colour)
        .add_modifier(Modifier::BOLD);

    match form.state {
        ConnectionState::Disconnected => {
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "Enter the server URL to get started.",
                    label_style,
                ))),
                rows[0],
            );

            let url_line = Line::from(vec![
                Span::styled("Server URL: ", label_style),
                Span::raw(form.server_url.value()),
            ]);
            f.render_widget(Paragraph::new(url_line), rows[1]);

            if !form.busy {
                let cursor_x = rows[1].x + 12 + form.server_url.cursor() as u16;
                f.set_cursor_position((cursor_x, rows[1].y));
            }
        }

        ConnectionState::FoundServer => {
            let name = form.server_name.as_deref().unwrap_or("(unnamed server)");
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled("Server: ", label_style),
                    Span::styled(name, focus_style),
                ])),
                rows[0],
            );
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled("URL:    ", label_style),
                    Span::raw(form.server_url.value()),
                ])),
                rows[1],
            );

            let username_style = if form.focus == ConnectField::Username {
                focus_style
            } else {
                label_style
            };
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled("Username: ", username_style),
                    Span::raw(form.username.value()),
                ])),
                rows[3],
            );

            let password_style = if form.focus == ConnectField::Password {
                focus_style
            } else {
                label_style
            };
            let masked = "*".repeat(form.password.value().chars().count());
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled("Password: ", password_style),
                    Span::raw(masked),
                ])),
                rows[4],
            );

            let remember_style = if form.focus == ConnectField::RememberMe {
                focus_style
            } else {
                label_style
            };
            let checkbox = if form.remember_me { "[x]" } else { "[ ]" };
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!("{checkbox} Remember me"),
                    remember_style,
                ))),
                rows[5],
            );

            if !form.busy {
                match form.focus {
                    ConnectField::Username => {
                        let cursor_x = rows[3].x + 10 + form.username.cursor() as u16;
                        f.set_cursor_position((cursor_x, rows[3].y));
                    }
                    ConnectField::Password => {
                        let cursor_x = rows[4].x + 10 + form.password.cursor() as u16;
                        f.set_cursor_position((cursor_x, rows[4].y));
                    }
                    _ => {}
                }
            }
        }

        ConnectionState::Connected => {
            f.render_widget(
                Paragraph::new(Line::from(Span::styled("Connected.", focus_style))),
                rows[0],
            );
        }
    }

    let hint = if form.busy {
        "Working…"
    } else {
        match form.state {
            ConnectionState::Disconnected => "Enter: find server   Esc: cancel",
            ConnectionState::FoundServer => "Enter: sign in   Tab: next field   Esc: cancel",
            ConnectionState::Connected => "Opening remote library…",
        }
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(hint, label_style))),
        rows[7],
    );
}
