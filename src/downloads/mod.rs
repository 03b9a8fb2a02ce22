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

//! Background file transfers.
//!
//! One worker thread per transfer streams the response body into a `.part`
//! file next to the final location, reporting fractional progress back to
//! the event loop and honouring a shared cancel flag between chunks. The
//! active-transfer map itself lives in UI state; nothing about in-flight
//! transfers survives a restart.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use url::Url;

use crate::events::AppEvent;

const CHUNK_SIZE: usize = 64 * 1024;
/// Progress events are only emitted when the fraction advances this much.
const PROGRESS_GRANULARITY: f64 = 0.01;

/// Cancellable handle to one in-flight transfer.
#[derive(Clone, Debug)]
pub(crate) struct DownloadHandle {
    cancelled: Arc<AtomicBool>,
}

impl DownloadHandle {
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Starts a transfer worker and returns its handle.
///
/// The worker reports [`AppEvent::DownloadProgress`] while streaming,
/// finishing with either [`AppEvent::DownloadCompleted`] or
/// [`AppEvent::DownloadFailed`]. A cancelled transfer cleans up its partial
/// file and reports nothing; the caller already dropped its tracking entry.
pub(crate) fn spawn_download(
    url: Url,
    destination: PathBuf,
    relative_path: String,
    event_tx: Sender<AppEvent>,
) -> DownloadHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let handle = DownloadHandle {
        cancelled: Arc::clone(&cancelled),
    };

    thread::spawn(move || {
        debug!(path = %relative_path, url = %url, "download starting");

        match run_download(&url, &destination, &cancelled, |fraction| {
            let _ = event_tx.send(AppEvent::DownloadProgress {
                relative_path: relative_path.clone(),
                fraction,
            });
        }) {
            Ok(DownloadOutcome::Completed) => {
                let _ = event_tx.send(AppEvent::DownloadCompleted {
                    relative_path: relative_path.clone(),
                });
            }
            Ok(DownloadOutcome::Cancelled) => {
                debug!(path = %relative_path, "download cancelled");
            }
            Err(e) => {
                warn!(path = %relative_path, error = %format!("{e:#}"), "download failed");
                let _ = event_tx.send(AppEvent::DownloadFailed {
                    relative_path: relative_path.clone(),
                    message: format!("{e:#}"),
                });
            }
        }
    });

    handle
}

enum DownloadOutcome {
    Completed,
    Cancelled,
}

fn run_download(
    url: &Url,
    destination: &Path,
    cancelled: &AtomicBool,
    report: impl FnMut(f64),
) -> Result<DownloadOutcome> {
    let response = reqwest::blocking::get(url.clone()).context("Transfer failed")?;

    let status = response.status().as_u16();
    if status >= 300 {
        anyhow::bail!("Code {status}");
    }

    let total = response.content_length();

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let part_path = destination.with_extension("part");
    let part_file = File::create(&part_path)
        .with_context(|| format!("Failed to create {}", part_path.display()))?;

    let outcome = copy_with_progress(response, part_file, total, cancelled, report);

    match outcome {
        Ok(DownloadOutcome::Completed) => {
            fs::rename(&part_path, destination)
                .with_context(|| format!("Failed to finish {}", destination.display()))?;
            Ok(DownloadOutcome::Completed)
        }
        Ok(DownloadOutcome::Cancelled) => {
            let _ = fs::remove_file(&part_path);
            Ok(DownloadOutcome::Cancelled)
        }
        Err(e) => {
            let _ = fs::remove_file(&part_path);
            Err(e)
        }
    }
}

/// Streams `reader` into `writer` in chunks, reporting fractional progress
/// and checking the cancel flag between chunks.
fn copy_with_progress(
    mut reader: impl Read,
    mut writer: impl Write,
    total: Option<u64>,
    cancelled: &AtomicBool,
    mut report: impl FnMut(f64),
) -> Result<DownloadOutcome> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written: u64 = 0;
    let mut last_reported = 0.0_f64;

    loop {
        if cancelled.load(Ordering::Relaxed) {
            return Ok(DownloadOutcome::Cancelled);
        }

        let read = reader.read(&mut buffer).context("Transfer failed")?;
        if read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..read])
            .context("Failed to write download chunk")?;
        written += read as u64;

        if let Some(total) = total.filter(|total| *total > 0) {
            let fraction = (written as f64 / total as f64).min(1.0);
            if fraction - last_reported >= PROGRESS_GRANULARITY || fraction >= 1.0 {
                last_reported = fraction;
                report(fraction);
            }
        }
    }

    writer.flush().context("Failed to flush download")?;
    report(1.0);

    Ok(DownloadOutcome::Completed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// A handle not wired to any worker, for exercising tracking state.
    pub(crate) fn inert_handle() -> DownloadHandle {
        DownloadHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn copy_reports_monotonic_progress_up_to_one() {
        let payload = vec![7u8; CHUNK_SIZE * 3];
        let mut sink = Vec::new();
        let cancelled = AtomicBool::new(false);
        let mut fractions = Vec::new();

        let outcome = copy_with_progress(
            Cursor::new(payload.clone()),
            &mut sink,
            Some(payload.len() as u64),
            &cancelled,
            |fraction| fractions.push(fraction),
        )
        .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Completed));
        assert_eq!(sink, payload);
        assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*fractions.last().unwrap(), 1.0);
    }

    #[test]
    fn cancelled_flag_stops_the_copy_before_any_read() {
        let payload = vec![7u8; CHUNK_SIZE];
        let mut sink = Vec::new();
        let cancelled = AtomicBool::new(true);

        let outcome = copy_with_progress(
            Cursor::new(payload),
            &mut sink,
            None,
            &cancelled,
            |_| panic!("no progress after cancellation"),
        )
        .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Cancelled));
        assert!(sink.is_empty());
    }

    #[test]
    fn unknown_length_still_completes_with_final_report() {
        let payload = b"just a few bytes".to_vec();
        let mut sink = Vec::new();
        let cancelled = AtomicBool::new(false);
        let mut fractions = Vec::new();

        copy_with_progress(
            Cursor::new(payload.clone()),
            &mut sink,
            None,
            &cancelled,
            |fraction| fractions.push(fraction),
        )
        .unwrap();

        assert_eq!(sink, payload);
        assert_eq!(fractions, vec![1.0]);
    }
}
