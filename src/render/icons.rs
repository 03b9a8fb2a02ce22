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

//! Unicode symbols for the TUI.
//!
//! This module contains standardized icons used across the interface to
//! represent media controls, item kinds, and download states. These are
//! selected for compatibility with most modern terminal emulators and
//! fonts.

// Standard Media Controls (Unicode)
pub(crate) const ICON_PLAY: &str = "\u{25B6}";
pub(crate) const ICON_PAUSE: &str = "\u{23F8}";
pub(crate) const ICON_STOP: &str = "\u{23F9}";

// Library item kinds
pub(crate) const ICON_FOLDER: &str = "\u{25B8}";
pub(crate) const ICON_BOOK: &str = "\u{2022}";
pub(crate) const ICON_BOUND: &str = "\u{25A3}";

// Download states (text-style variation selector keeps them monochrome)
pub(crate) const ICON_REMOTE: &str = "\u{2601}\u{FE0E}";
pub(crate) const ICON_DOWNLOADING: &str = "\u{2193}";

// Completion marker
pub(crate) const ICON_FINISHED: &str = "\u{2713}";
