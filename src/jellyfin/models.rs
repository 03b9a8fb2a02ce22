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

//! Data models for Jellyfin API responses.

use serde::{Deserialize, Serialize};

/// Server identity as reported by the unauthenticated info endpoint.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub(crate) struct PublicSystemInfo {
    #[serde(rename = "ServerName", default)]
    pub(crate) server_name: Option<String>,
    #[serde(rename = "Version", default)]
    pub(crate) version: Option<String>,
    #[serde(rename = "Id", default)]
    pub(crate) id: Option<String>,
}

/// Represents a media item in a Jellyfin library.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub(crate) struct MediaItem {
    #[serde(rename = "Id")]
    pub(crate) id: String,
    #[serde(rename = "Name")]
    pub(crate) name: String,
    #[serde(rename = "Type")]
    pub(crate) media_type: String,
    #[serde(rename = "Path", default)]
    pub(crate) path: Option<String>,
    #[serde(rename = "IsFolder", default)]
    pub(crate) is_folder: bool,
    #[serde(rename = "RunTimeTicks", default)]
    pub(crate) run_time_ticks: Option<i64>, // Duration in 100-nanosecond units
    #[serde(rename = "Container", default)]
    pub(crate) container: Option<String>,
}

impl MediaItem {
    /// Duration in seconds, converted from the server's tick unit.
    pub(crate) fn duration_seconds(&self) -> f64 {
        self.run_time_ticks
            .map(|ticks| ticks as f64 / 10_000_000.0)
            .unwrap_or(0.0)
    }
}

/// Represents a collection of media items with additional metadata.
#[derive(Deserialize, Serialize, Debug, Default)]
pub(crate) struct ItemsResponse {
    #[serde(rename = "Items", default)]
    pub(crate) items: Vec<MediaItem>,
    #[serde(rename = "TotalRecordCount", default)]
    pub(crate) total_record_count: i64,
}

/// Represents an authentication request for Jellyfin.
#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct AuthRequest {
    #[serde(rename = "Username")]
    pub(crate) username: String,
    #[serde(rename = "Pw")]
    pub(crate) pw: String,
}

/// Represents an authentication response from Jellyfin.
#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct AuthResponse {
    #[serde(rename = "User")]
    pub(crate) user: User,
    #[serde(rename = "AccessToken")]
    pub(crate) access_token: String,
    #[serde(rename = "ServerId", default)]
    pub(crate) server_id: Option<String>,
}

/// Represents a user in Jellyfin.
#[derive(Deserialize, Serialize, Debug)]
pub(crate) struct User {
    #[serde(rename = "Id", alias = "id")]
    pub(crate) id: String,
    #[serde(rename = "Name", alias = "name")]
    pub(crate) name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_response_decodes_server_payload() {
        let payload = r#"{
            "Items": [
                {"Id": "abc", "Name": "Stories", "Type": "Folder", "IsFolder": true},
                {"Id": "def", "Name": "Chapter 1", "Type": "Audio",
                 "IsFolder": false, "RunTimeTicks": 600000000, "Container": "mp3"}
            ],
            "TotalRecordCount": 2
        }"#;

        let response: ItemsResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.total_record_count, 2);
        assert!(response.items[0].is_folder);
        assert!((response.items[1].duration_seconds() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn auth_response_decodes_user_and_token() {
        let payload = r#"{
            "User": {"Id": "user-1", "Name": "gianni"},
            "AccessToken": "tok",
            "ServerId": "srv"
        }"#;

        let response: AuthResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.user.id, "user-1");
        assert_eq!(response.access_token, "tok");
    }

    #[test]
    fn public_info_tolerates_missing_fields() {
        let info: PublicSystemInfo = serde_json::from_str("{}").unwrap();
        assert!(info.server_name.is_none());
    }
}
