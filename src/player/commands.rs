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

//! MPV-backed audiobook playback engine and event processing.
//!
//! This module provides the core playback logic, leveraging `libmpv` for
//! audio decoding and playback control. It manages a background worker
//! thread that bridges the gap between the application's command-based
//! interface and the low-level MPV property observation system.
//!
//! Spoken-word listening drives two departures from a plain music engine:
//! books are loaded with a start offset so they resume where the listener
//! left off, and the playback speed is adjustable and observed like any
//! other property.

use anyhow::{Context, Result};
use mpv::Format;
use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use crate::{
    events::AppEvent,
    player::{AudioPlayer, PlayerState},
};

const MIN_SPEED: f64 = 0.5;
const MAX_SPEED: f64 = 3.0;

/// Properties observed as doubles; each change is folded into an
/// [`AppEvent`] by [`map_property_change`].
const OBSERVED_DOUBLES: &[&str] = &["duration", "time-pos", "volume", "speed"];

#[derive(Debug)]
pub(crate) enum AudioPlayerCommand {
    PlayBook { filename: String, start_at: f64 },
    TogglePause,
    Seek(i32),
    Stop,
    AdjustVolume(i32),
    ToggleMute,
    AdjustSpeed(f64),
    ResetSpeed,
}

/// Spawns the audio worker thread to process playback commands.
///
/// If the internal worker returns an error, it is caught here and broadcast
/// as a fatal application event.
pub(crate) fn spawn_player_worker(
    command_rx: Receiver<AudioPlayerCommand>,
    event_tx: Sender<AppEvent>,
) {
    let error_tx = event_tx.clone();

    thread::spawn(move || {
        if let Err(e) = audio_player_worker(command_rx, event_tx) {
            let _ = error_tx.send(AppEvent::FatalError(format!("MPV worker failure: {:?}", e)));
        }
    });
}

/// The primary execution loop for the audio player backend.
///
/// Initializes a local `libmpv` context, registers property observers, and
/// alternates between draining pending commands and polling MPV events.
///
/// # Errors
///
/// Returns an error if the MPV context fails to initialize or if the
/// command/event loops encounter an unrecoverable failure.
fn audio_player_worker(
    command_rx: Receiver<AudioPlayerCommand>,
    event_tx: Sender<AppEvent>,
) -> Result<()> {
    let mut handler = build_handler()?;

    for property in OBSERVED_DOUBLES {
        handler
            .observe_property::<f64>(property, 0)
            .with_context(|| format!("Failed to observe {property}"))?;
    }
    handler
        .observe_property::<bool>("pause", 0)
        .context("Failed to observe pause")?;
    handler
        .observe_property::<bool>("idle-active", 0)
        .context("Failed to observe idle-active")?;

    let mut flags = EngineFlags {
        is_paused: false,
        is_idle: true,
    };
    let mut player_state = PlayerState::Stopped;

    loop {
        process_commands(&mut handler, &command_rx)?;
        process_mpv_events(&mut handler, &mut flags, &mut player_state, &event_tx)?;
    }
}

fn build_handler() -> Result<mpv::MpvHandler> {
    let mut builder = mpv::MpvHandlerBuilder::new().context("Failed to create MPV builder")?;
    builder
        .set_option("vo", "null")
        .context("Failed to set no video output")?;
    builder.build().context("Failed to build MPV handler")
}

/// Pause/idle flags mirrored from the engine, combined into the simplified
/// [`PlayerState`].
struct EngineFlags {
    is_paused: bool,
    is_idle: bool,
}

/// Drains and executes all pending commands from the application channel.
fn process_commands(
    handler: &mut mpv::MpvHandler,
    command_rx: &mpsc::Receiver<AudioPlayerCommand>,
) -> Result<()> {
    while let Ok(command) = command_rx.try_recv() {
        match command {
            AudioPlayerCommand::PlayBook { filename, start_at } => {
                // Resume from the stored position; a fresh book starts at 0.
                let start_option = format!("start={:.1}", start_at.max(0.0));
                handler
                    .command(&["loadfile", &filename, "replace", &start_option])
                    .context(format!("Failed to load book: {}", &filename))?;
                handler.set_property("pause", false)?;
            }
            AudioPlayerCommand::TogglePause => {
                handler.command(&["cycle", "pause"])?;
            }
            AudioPlayerCommand::Seek(delta) => {
                handler.command(&["seek", &delta.to_string(), "relative"])?;
            }
            AudioPlayerCommand::Stop => {
                handler.command(&["stop"])?;
            }
            AudioPlayerCommand::AdjustVolume(delta) => {
                handler.command(&["add", "volume", &delta.to_string()])?;
            }
            AudioPlayerCommand::ToggleMute => {
                handler.command(&["cycle", "mute"])?;
            }
            AudioPlayerCommand::AdjustSpeed(delta) => {
                let current: f64 = handler.get_property("speed").unwrap_or(1.0);
                let speed = (current + delta).clamp(MIN_SPEED, MAX_SPEED);
                handler.set_property("speed", speed)?;
            }
            AudioPlayerCommand::ResetSpeed => {
                handler.set_property("speed", 1.0)?;
            }
        }
    }

    Ok(())
}

/// Polls for MPV events and synchronizes the application state.
///
/// Waits up to 50ms for an event from the MPV context; property changes and
/// end-of-file are folded into [`AppEvent`]s, and the combined pause/idle
/// flags are diffed into [`AppEvent::PlayerStateChanged`] transitions.
fn process_mpv_events(
    handler: &mut mpv::MpvHandler,
    flags: &mut EngineFlags,
    current_state: &mut PlayerState,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<()> {
    let Some(mpv_event) = handler.wait_event(0.05) else {
        return Ok(());
    };

    let app_event = match mpv_event {
        mpv::Event::PropertyChange { name, change, .. } => {
            map_property_change(name, change, flags)
        }
        mpv::Event::EndFile(Ok(mpv::EndFileReason::MPV_END_FILE_REASON_EOF)) => {
            Some(AppEvent::BookFinished)
        }
        _ => None,
    };

    let new_player_state = AudioPlayer::player_state(flags.is_paused, flags.is_idle);
    if new_player_state != *current_state {
        *current_state = new_player_state;
        event_tx
            .send(AppEvent::PlayerStateChanged(new_player_state))
            .context("Failed to send player state event")?;
    }

    if let Some(event) = app_event {
        event_tx.send(event).context("Failed to send event")?;
    }

    Ok(())
}

fn map_property_change(name: &str, change: Format, flags: &mut EngineFlags) -> Option<AppEvent> {
    match (name, change) {
        ("duration", Format::Double(duration)) => Some(AppEvent::DurationChanged(duration)),
        ("time-pos", Format::Double(seconds)) if seconds >= 0.0 => {
            Some(AppEvent::TimeChanged(seconds))
        }
        ("volume", Format::Double(volume)) => Some(AppEvent::VolumeChanged(volume.round() as u32)),
        ("speed", Format::Double(speed)) => Some(AppEvent::SpeedChanged(speed)),
        ("pause", Format::Flag(pause)) => {
            flags.is_paused = pause;
            None
        }
        ("idle-active", Format::Flag(idle_active)) => {
            flags.is_idle = idle_active;
            None
        }
        _ => None,
    }
}
