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

//! Persisted media-server credentials.
//!
//! At most one connection record exists, keyed by a fixed service label. The
//! record lives in a mode-0600 JSON file under the configuration directory;
//! reads and writes surface the raw OS status code on failure so callers can
//! decide whether to continue unauthenticated.
//!
//! The auxiliary fields (server display name, username) are packed into a
//! single opaque JSON-encoded attribute and decoded defensively: a record
//! whose attribute is malformed or missing loads with empty strings rather
//! than failing.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SERVICE_LABEL: &str = "jellyfin-connection";

/// A remote media-server session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnectionData {
    pub(crate) server_url: String,
    pub(crate) server_name: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) access_token: String,
}

/// Credential-store failure carrying the underlying OS status code.
#[derive(Error, Debug)]
pub(crate) enum AccountError {
    #[error("credential store failure (status {code}): {source}")]
    Store { code: i32, source: io::Error },
}

impl From<io::Error> for AccountError {
    fn from(source: io::Error) -> Self {
        let code = source.raw_os_error().unwrap_or(-1);
        AccountError::Store { code, source }
    }
}

/// On-disk shape of the single connection record.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    server_url: String,
    #[serde(rename = "userID")]
    user_id: String,
    access_token: String,
    /// JSON-packed auxiliary fields; see [`Extras`].
    #[serde(default)]
    extras: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Extras {
    server_name: String,
    user_name: String,
}

/// File-backed store holding the single persisted connection.
pub(crate) struct AccountStore {
    directory: PathBuf,
}

impl AccountStore {
    pub(crate) fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    /// Returns the persisted connection record, or `None` when no record
    /// exists or the record's primary fields cannot be read back.
    pub(crate) fn find_saved_connection(&self) -> Result<Option<ConnectionData>, AccountError> {
        let raw = match fs::read_to_string(self.record_path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Ok(record) = serde_json::from_str::<StoredRecord>(&raw) else {
            return Ok(None);
        };

        let extras = decode_extras(&record.extras);

        Ok(Some(ConnectionData {
            server_url: record.server_url,
            server_name: extras.server_name,
            user_id: record.user_id,
            username: extras.user_name,
            access_token: record.access_token,
        }))
    }

    /// Upserts the connection record: an existing record is overwritten in
    /// place, otherwise a fresh restricted-permission file is created.
    pub(crate) fn save_connection(&self, data: &ConnectionData) -> Result<(), AccountError> {
        fs::create_dir_all(&self.directory)?;

        let record = StoredRecord {
            server_url: data.server_url.clone(),
            user_id: data.user_id.clone(),
            access_token: data.access_token.clone(),
            extras: encode_extras(data),
        };
        let payload =
            serde_json::to_vec_pretty(&record).map_err(|e| AccountError::from(io::Error::other(e)))?;

        let path = self.record_path();
        let mut file = match OpenOptions::new().write(true).truncate(true).open(&path) {
            Ok(existing) => existing,
            Err(e) if e.kind() == ErrorKind::NotFound => create_restricted(&path)?,
            Err(e) => return Err(e.into()),
        };

        file.write_all(&payload)?;

        Ok(())
    }

    /// Deletes the persisted record; a missing record counts as success.
    pub(crate) fn remove_saved_connection(&self) -> Result<(), AccountError> {
        match fs::remove_file(self.record_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn record_path(&self) -> PathBuf {
        self.directory.join(format!("{SERVICE_LABEL}.json"))
    }
}

#[cfg(unix)]
fn create_restricted(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_restricted(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn encode_extras(data: &ConnectionData) -> String {
    serde_json::to_string(&Extras {
        server_name: data.server_name.clone(),
        user_name: data.username.clone(),
    })
    .unwrap_or_default()
}

/// Decode failure yields empty strings rather than an error.
fn decode_extras(raw: &str) -> Extras {
    serde_json::from_str(raw).unwrap_or(Extras {
        server_name: String::new(),
        user_name: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ConnectionData {
        ConnectionData {
            server_url: "https://jellyfin.example.com:8096".to_string(),
            server_name: "Home Server".to_string(),
            user_id: "user-1234".to_string(),
            username: "gianni".to_string(),
            access_token: "token-abcdef".to_string(),
        }
    }

    #[test]
    fn save_then_find_round_trips_every_field() {
        let dir = TempDir::new().unwrap();
        let store = AccountStore::new(dir.path().to_path_buf());

        store.save_connection(&sample()).unwrap();
        let found = store.find_saved_connection().unwrap().unwrap();

        assert_eq!(found, sample());
    }

    #[test]
    fn save_twice_upserts_the_single_record() {
        let dir = TempDir::new().unwrap();
        let store = AccountStore::new(dir.path().to_path_buf());

        store.save_connection(&sample()).unwrap();

        let mut updated = sample();
        updated.access_token = "token-rotated".to_string();
        store.save_connection(&updated).unwrap();

        let found = store.find_saved_connection().unwrap().unwrap();
        assert_eq!(found.access_token, "token-rotated");
    }

    #[test]
    fn remove_then_find_reports_absence() {
        let dir = TempDir::new().unwrap();
        let store = AccountStore::new(dir.path().to_path_buf());

        store.save_connection(&sample()).unwrap();
        store.remove_saved_connection().unwrap();

        assert!(store.find_saved_connection().unwrap().is_none());
    }

    #[test]
    fn removing_a_nonexistent_record_is_success() {
        let dir = TempDir::new().unwrap();
        let store = AccountStore::new(dir.path().to_path_buf());

        store.remove_saved_connection().unwrap();
    }

    #[test]
    fn malformed_extras_decode_to_empty_strings() {
        let dir = TempDir::new().unwrap();
        let store = AccountStore::new(dir.path().to_path_buf());

        let raw = r#"{
            "serverUrl": "https://jellyfin.example.com",
            "userID": "user-1",
            "accessToken": "tok",
            "extras": "not-json"
        }"#;
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join("jellyfin-connection.json"), raw).unwrap();

        let found = store.find_saved_connection().unwrap().unwrap();
        assert_eq!(found.server_name, "");
        assert_eq!(found.username, "");
        assert_eq!(found.access_token, "tok");
    }

    #[test]
    fn legacy_flat_record_loads_primary_fields_only() {
        let dir = TempDir::new().unwrap();
        let store = AccountStore::new(dir.path().to_path_buf());

        let raw = r#"{
            "serverUrl": "https://jellyfin.example.com",
            "userID": "user-1",
            "accessToken": "tok",
            "serverName": "Flat Server",
            "userName": "flat"
        }"#;
        fs::write(dir.path().join("jellyfin-connection.json"), raw).unwrap();

        let found = store.find_saved_connection().unwrap().unwrap();
        assert_eq!(found.server_url, "https://jellyfin.example.com");
        assert_eq!(found.server_name, "");
        assert_eq!(found.username, "");
    }

    #[test]
    fn unreadable_primary_fields_report_absence() {
        let dir = TempDir::new().unwrap();
        let store = AccountStore::new(dir.path().to_path_buf());

        fs::write(dir.path().join("jellyfin-connection.json"), b"{broken").unwrap();
        assert!(store.find_saved_connection().unwrap().is_none());
    }
}
