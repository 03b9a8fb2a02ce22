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

//! Command-line input logic and state management.
//!
//! This module implements a `:`-prefixed command line. It owns a text input
//! component while active and, on submit, parses the buffer into a typed
//! [`UserCommand`] for the event loop to execute. The commander itself
//! never touches application state.

use std::path::PathBuf;

use crossterm::event::{Event, KeyCode};
use tui_input::{Input, backend::crossterm::EventHandler};

use crate::model::SortKind;

/// Result of offering an input event to the commander.
#[derive(Debug)]
pub(crate) enum CommanderOutcome {
    /// The commander is inactive and did not consume the event.
    NotHandled,
    /// Consumed by the command line (typing, cancel, bad command).
    Handled,
    /// A complete command was submitted.
    Submitted(UserCommand),
}

/// A parsed `:` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UserCommand {
    Quit,
    Import(PathBuf),
    MakeFolder(String),
    Sort(SortKind),
    Find(String),
    LoadAll,
    Root,
    Move(Option<String>),
    Bind,
    Unbind,
    Connect(Option<String>),
    SignOut,
    Accent(String),
}

pub(crate) struct Commander {
    active: bool,
    pub(crate) input: Input,
    /// Feedback for an unparseable command, shown until the next keystroke.
    pub(crate) error: Option<String>,
}

impl Commander {
    pub(crate) fn new() -> Self {
        Self {
            active: false,
            input: Input::default(),
            error: None,
        }
    }

    pub(crate) fn active(&self) -> bool {
        self.active
    }

    pub(crate) fn handle_event(&mut self, event: Event) -> CommanderOutcome {
        if self.active {
            match event {
                Event::Key(key_event) => match key_event.code {
                    KeyCode::Esc => {
                        self.active = false;
                        self.input.reset();
                        CommanderOutcome::Handled
                    }

                    KeyCode::Enter => {
                        let buffer = self.input.value().trim().to_string();
                        self.input.reset();
                        self.active = false;

                        if buffer.is_empty() {
                            return CommanderOutcome::Handled;
                        }

                        match parse_command(&buffer) {
                            Some(command) => CommanderOutcome::Submitted(command),
                            None => {
                                self.error = Some(format!("Unknown command: {buffer}"));
                                CommanderOutcome::Handled
                            }
                        }
                    }

                    _ => {
                        self.error = None;
                        self.input.handle_event(&event);
                        CommanderOutcome::Handled
                    }
                },

                _ => CommanderOutcome::NotHandled,
            }
        } else {
            match event {
                Event::Key(key_event) => match key_event.code {
                    KeyCode::Char(':') => {
                        self.active = true;
                        self.error = None;
                        CommanderOutcome::Handled
                    }

                    _ => CommanderOutcome::NotHandled,
                },

                _ => CommanderOutcome::NotHandled,
            }
        }
    }
}

fn parse_command(buffer: &str) -> Option<UserCommand> {
    let parts: Vec<&str> = buffer.split_whitespace().collect();

    match parts.as_slice() {
        ["q"] | ["quit"] => Some(UserCommand::Quit),

        ["import", path_parts @ ..] if !path_parts.is_empty() => {
            Some(UserCommand::Import(PathBuf::from(path_parts.join(" "))))
        }

        ["mkdir", title_parts @ ..] if !title_parts.is_empty() => {
            Some(UserCommand::MakeFolder(title_parts.join(" ")))
        }

        ["sort", kind] => SortKind::parse(kind).map(UserCommand::Sort),

        ["find", text_parts @ ..] if !text_parts.is_empty() => {
            Some(UserCommand::Find(text_parts.join(" ")))
        }

        ["all"] => Some(UserCommand::LoadAll),
        ["root"] => Some(UserCommand::Root),

        // `:mv /` moves the selected item to the library root.
        ["mv", "/"] => Some(UserCommand::Move(None)),
        ["mv", dest_parts @ ..] if !dest_parts.is_empty() => {
            Some(UserCommand::Move(Some(dest_parts.join(" "))))
        }

        ["bind"] => Some(UserCommand::Bind),
        ["unbind"] => Some(UserCommand::Unbind),

        ["connect"] => Some(UserCommand::Connect(None)),
        ["connect", url] => Some(UserCommand::Connect(Some(url.to_string()))),
        ["signout"] => Some(UserCommand::SignOut),

        ["accent", hex] => Some(UserCommand::Accent(hex.to_string())),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_command(commander: &mut Commander, text: &str) -> CommanderOutcome {
        commander.handle_event(key(KeyCode::Char(':')));
        for c in text.chars() {
            commander.handle_event(key(KeyCode::Char(c)));
        }
        commander.handle_event(key(KeyCode::Enter))
    }

    #[test]
    fn colon_activates_and_escape_cancels() {
        let mut commander = Commander::new();
        assert!(matches!(
            commander.handle_event(key(KeyCode::Char('j'))),
            CommanderOutcome::NotHandled
        ));

        commander.handle_event(key(KeyCode::Char(':')));
        assert!(commander.active());

        commander.handle_event(key(KeyCode::Esc));
        assert!(!commander.active());
    }

    #[test]
    fn commands_parse_into_typed_values() {
        let mut commander = Commander::new();

        assert!(matches!(
            type_command(&mut commander, "q"),
            CommanderOutcome::Submitted(UserCommand::Quit)
        ));

        match type_command(&mut commander, "mkdir Short Stories") {
            CommanderOutcome::Submitted(UserCommand::MakeFolder(title)) => {
                assert_eq!(title, "Short Stories");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert!(matches!(
            type_command(&mut commander, "sort title"),
            CommanderOutcome::Submitted(UserCommand::Sort(SortKind::Title))
        ));

        assert!(matches!(
            type_command(&mut commander, "mv /"),
            CommanderOutcome::Submitted(UserCommand::Move(None))
        ));

        assert!(matches!(
            type_command(&mut commander, "connect"),
            CommanderOutcome::Submitted(UserCommand::Connect(None))
        ));
    }

    #[test]
    fn unknown_commands_set_an_error() {
        let mut commander = Commander::new();
        assert!(matches!(
            type_command(&mut commander, "frobnicate"),
            CommanderOutcome::Handled
        ));
        assert!(commander.error.is_some());
    }
}
