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

//! Artwork caching and default artwork generation.
//!
//! Cover art lives outside the database as PNG files in a cache directory,
//! keyed by a hash of the item's relative path. Books without embedded
//! artwork share a generated default image derived deterministically from
//! the theme accent color; changing the accent regenerates it.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageBuffer, ImageFormat, Rgba};
use xxhash_rust::xxh3::xxh3_64;

const DEFAULT_ARTWORK_SIZE: u32 = 256;

/// File-backed artwork cache plus the in-memory default artwork bytes.
pub(crate) struct ArtworkCache {
    directory: PathBuf,
    accent: (u8, u8, u8),
    default_artwork: Option<Vec<u8>>,
}

impl ArtworkCache {
    pub(crate) fn new(directory: PathBuf, accent: (u8, u8, u8)) -> Self {
        Self {
            directory,
            accent,
            default_artwork: None,
        }
    }

    /// The generated default artwork, encoded as PNG bytes.
    ///
    /// Generated lazily and kept until the accent changes.
    pub(crate) fn default_artwork(&mut self) -> &[u8] {
        if self.default_artwork.is_none() {
            self.default_artwork = Some(generate_default_artwork(self.accent));
        }
        self.default_artwork.as_deref().unwrap_or_default()
    }

    /// Replaces the accent color and drops the cached default artwork.
    pub(crate) fn set_accent(&mut self, accent: (u8, u8, u8)) {
        if self.accent != accent {
            self.accent = accent;
            self.default_artwork = None;
        }
    }

    /// Persists artwork bytes for an item and returns the cache file path.
    pub(crate) fn store(&self, relative_path: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("Failed to create {}", self.directory.display()))?;

        let target = self.cache_path(relative_path);
        fs::write(&target, bytes)
            .with_context(|| format!("Failed to write artwork {}", target.display()))?;

        Ok(target)
    }

    pub(crate) fn load(&self, relative_path: &str) -> Option<Vec<u8>> {
        fs::read(self.cache_path(relative_path)).ok()
    }

    /// Drops any cached artwork for an item; missing entries are fine.
    pub(crate) fn remove(&self, relative_path: &str) {
        let _ = fs::remove_file(self.cache_path(relative_path));
    }

    fn cache_path(&self, relative_path: &str) -> PathBuf {
        let key = xxh3_64(relative_path.as_bytes());
        self.directory.join(format!("{key:016x}.png"))
    }
}

/// Renders the default artwork from an accent color.
///
/// A vertical gradient from the accent down to a darkened variant; the same
/// accent always produces the same bytes.
fn generate_default_artwork(accent: (u8, u8, u8)) -> Vec<u8> {
    let (r, g, b) = accent;
    let size = DEFAULT_ARTWORK_SIZE;

    let image = ImageBuffer::from_fn(size, size, |_, y| {
        let factor = 1.0 - (y as f32 / size as f32) * 0.65;
        Rgba([
            (r as f32 * factor) as u8,
            (g as f32 * factor) as u8,
            (b as f32 * factor) as u8,
            255,
        ])
    });

    let mut bytes = Cursor::new(Vec::new());
    // Encoding an in-memory RGBA buffer as PNG cannot fail.
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("PNG encoding of a generated buffer failed");

    bytes.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_artwork_is_deterministic_per_accent() {
        let mut cache = ArtworkCache::new(PathBuf::from("unused"), (250, 189, 47));
        let first = cache.default_artwork().to_vec();
        let second = cache.default_artwork().to_vec();
        assert_eq!(first, second);

        let mut other = ArtworkCache::new(PathBuf::from("unused"), (250, 189, 47));
        assert_eq!(first, other.default_artwork());
    }

    #[test]
    fn changing_the_accent_regenerates_the_default() {
        let mut cache = ArtworkCache::new(PathBuf::from("unused"), (250, 189, 47));
        let before = cache.default_artwork().to_vec();

        cache.set_accent((40, 20, 50));
        let after = cache.default_artwork().to_vec();
        assert_ne!(before, after);

        // Setting the same accent again keeps the cached bytes.
        cache.set_accent((40, 20, 50));
        assert_eq!(after, cache.default_artwork());
    }

    #[test]
    fn store_load_remove_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = ArtworkCache::new(dir.path().join("artwork"), (0, 0, 0));

        cache.store("A/book.mp3", b"png-bytes").unwrap();
        assert_eq!(cache.load("A/book.mp3").unwrap(), b"png-bytes");

        cache.remove("A/book.mp3");
        assert!(cache.load("A/book.mp3").is_none());

        // Removing again is not an error.
        cache.remove("A/book.mp3");
    }
}
