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

//! Formatting helpers and terminal environment utilities.

use std::io::{self, Write};

/// Formats a duration in seconds into a human-readable string.
///
/// Audiobooks routinely run for many hours, so durations of an hour or more
/// render as `H:MM:SS` while shorter ones keep the compact `MM:SS` form.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_time(65), "01:05");
/// assert_eq!(format_time(3725), "1:02:05");
/// ```
pub(crate) fn format_time(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

/// Formats a completion percentage for list rows.
pub(crate) fn format_percent(percent: f64) -> String {
    format!("{:>3.0}%", percent.clamp(0.0, 100.0))
}

/// Sets the terminal background color using an OSC 11 escape sequence.
///
/// Most modern terminal emulators (XTerm, iTerm2, Alacritty, Kitty) support
/// this sequence; unsupported ones ignore it.
///
/// # Arguments
///
/// * `hex_color` - A string slice representing the color (e.g., `"#1e1e1e"`).
pub(crate) fn set_terminal_bg(hex_color: &str) {
    print!("\x1b]11;{}\x07", hex_color);
    let _ = io::stdout().flush();
}

/// Resets the terminal background to its default color via OSC 111.
///
/// Called during application cleanup to restore the user's terminal state.
pub(crate) fn reset_terminal_bg() {
    print!("\x1b]111\x07");
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_durations_stay_compact() {
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(0), "00:00");
    }

    #[test]
    fn long_durations_gain_an_hours_field() {
        assert_eq!(format_time(3725), "1:02:05");
        assert_eq!(format_time(36000), "10:00:00");
    }

    #[test]
    fn percent_is_clamped_and_padded() {
        assert_eq!(format_percent(25.4), " 25%");
        assert_eq!(format_percent(120.0), "100%");
        assert_eq!(format_percent(-3.0), "  0%");
    }
}
