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

//! User interface rendering logic.
//!
//! This module handles the translation of the [`App`] state into visual
//! widgets using the `ratatui` framework. It is responsible for layout
//! management, widget styling, and terminal frame composition.
//!
//! # Rendering Pipeline
//!
//! The primary entry point is the [`draw`] function, which is called after
//! every processed event to provide a reactive user interface. Alerts and
//! confirmation prompts render last, as centered overlays above whichever
//! screen owns the main area.

mod commander;
mod connect;
mod icons;
mod library;
mod player;
mod remote;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap},
};

use crate::{
    App, MainView,
    render::{commander::draw_commander, player::draw_player},
};

/// Renders the user interface to the terminal frame.
///
/// The screen splits into the main view (library, remote library, or the
/// connection form), the player bar, and the command line.
pub(crate) fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // Outer layout: main, player, commander
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(7),
            Constraint::Length(1),
        ])
        .split(area);

    match app.main_view {
        MainView::Library => library::draw_library(f, outer[0], app),
        MainView::Remote => remote::draw_remote(f, outer[0], app),
        MainView::Connect => connect::draw_connect(f, outer[0], app),
    };

    draw_player(f, outer[1], app);

    draw_commander(f, outer[2], app);

    if let Some(prompt) = &app.prompt {
        let message = format!("{}\n\n[y]es   [n]o", prompt.message);
        draw_overlay(f, area, " Confirm ", &message, app.theme.accent_colour);
    }

    if let Some(alert) = &app.alert {
        draw_overlay(f, area, " Error ", alert, app.theme.alert_fg);
    }
}

/// Draws a centered modal box above everything else.
fn draw_overlay(
    f: &mut Frame,
    area: Rect,
    title: &str,
    message: &str,
    accent: ratatui::style::Color,
) {
    let width = (area.width.saturating_sub(8)).min(60).max(20);
    let height = 5 + message.lines().count() as u16;

    let overlay = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height: height.min(area.height),
    };

    f.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .title(title)
        .padding(Padding::uniform(1));

    let lines: Vec<Line> = message.lines().map(Line::from).collect();
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });

    f.render_widget(paragraph, overlay);
}
