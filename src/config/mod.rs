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

//! Application configuration.
//!
//! This module manages the application configuration file and the derived
//! filesystem locations: the managed storage root the library lives under,
//! the database file, and the artwork cache.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CONFIG_NAME: &str = "talebook";

const DATABASE_FILE: &str = "library.db";
const ARTWORK_DIR: &str = ".artwork";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub version: u32,
    /// Managed storage root; `None` picks a default below the user's audio
    /// directory.
    pub storage_dir: Option<String>,
    /// Items fetched per page in the library browser.
    pub page_size: i64,
    /// Accent color as `#RRGGBB`; `None` keeps the built-in accent.
    pub accent_colour: Option<String>,
    /// Device name reported to the media server.
    pub device_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            storage_dir: None,
            page_size: crate::browser::DEFAULT_PAGE_SIZE,
            accent_colour: None,
            device_name: "talebook-terminal".to_string(),
        }
    }
}

impl AppConfig {
    /// The directory audiobook files and the database live under.
    pub fn storage_root(&self) -> PathBuf {
        if let Some(dir) = &self.storage_dir {
            return PathBuf::from(dir);
        }

        dirs::audio_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("talebook")
    }

    pub fn database_file(&self) -> PathBuf {
        self.storage_root().join(DATABASE_FILE)
    }

    pub fn artwork_dir(&self) -> PathBuf {
        self.storage_root().join(ARTWORK_DIR)
    }

    /// Directory holding the persisted media-server credential record.
    pub fn account_dir(&self) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_NAME)
    }
}

pub fn load_config() -> AppConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_default()
}

pub fn save_config(cfg: &AppConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}
