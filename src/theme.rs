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

//! Visual styling and color configuration for the TUI.
//!
//! This module defines the application's color palette and provides
//! utilities for converting colors between Ratatui's internal representation
//! and external formats (such as hexadecimal strings) used for terminal
//! emulator styling and default artwork generation.

use ratatui::style::Color;

#[derive(Clone, Copy)]
pub(crate) struct Theme {
    pub(crate) background_colour: Color,
    pub(crate) accent_colour: Color,
    pub(crate) border_colour: Color,
    pub(crate) gauge_track_colour: Color,

    pub(crate) table_title_fg: Color,
    pub(crate) table_kind_fg: Color,
    pub(crate) table_duration_fg: Color,
    pub(crate) table_progress_fg: Color,
    pub(crate) playing_fg: Color,
    pub(crate) alert_fg: Color,
}

impl Default for Theme {
    // Returns the standard application theme.
    fn default() -> Self {
        Self::default_theme()
    }
}

impl Theme {
    // Constructs the default theme.
    pub(crate) const fn default_theme() -> Self {
        Self {
            background_colour: Color::Rgb(28, 24, 38),
            accent_colour: Color::Rgb(250, 189, 47),
            border_colour: Color::Rgb(102, 102, 102),
            gauge_track_colour: Color::Rgb(44, 38, 58),

            table_title_fg: Color::Rgb(255, 255, 255),
            table_kind_fg: Color::Rgb(179, 157, 219),
            table_duration_fg: Color::Rgb(162, 161, 166),
            table_progress_fg: Color::Rgb(162, 161, 166),
            playing_fg: Color::Rgb(250, 189, 47),
            alert_fg: Color::Rgb(255, 110, 110),
        }
    }

    /// Replaces the accent with a configured color.
    pub(crate) fn with_accent(mut self, accent: (u8, u8, u8)) -> Self {
        self.accent_colour = Color::Rgb(accent.0, accent.1, accent.2);
        self.playing_fg = self.accent_colour;
        self
    }

    /// The accent as an RGB triple, the seed for default artwork.
    pub(crate) fn accent_rgb(&self) -> (u8, u8, u8) {
        match self.accent_colour {
            Color::Rgb(r, g, b) => (r, g, b),
            _ => (250, 189, 47),
        }
    }

    /// Converts a [`ratatui::style::Color`] into a CSS-style hexadecimal
    /// string, used to set the terminal emulator's background color.
    pub(crate) fn to_hex(colour: Color) -> String {
        match colour {
            Color::Rgb(r, g, b) => format!("#{r:02x}{g:02x}{b:02x}"),
            _ => "#000000".to_string(),
        }
    }
}

/// Parses a `#RRGGBB` string into an RGB triple.
pub(crate) fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(parse_hex("#fabd2f"), Some((250, 189, 47)));
        assert_eq!(parse_hex("fabd2f"), Some((250, 189, 47)));
        assert_eq!(parse_hex("#zzzzzz"), None);
        assert_eq!(parse_hex("#fff"), None);

        assert_eq!(Theme::to_hex(Color::Rgb(250, 189, 47)), "#fabd2f");
    }

    #[test]
    fn accent_override_feeds_the_playing_style() {
        let theme = Theme::default_theme().with_accent((10, 20, 30));
        assert_eq!(theme.accent_rgb(), (10, 20, 30));
        assert_eq!(theme.playing_fg, Color::Rgb(10, 20, 30));
    }
}
