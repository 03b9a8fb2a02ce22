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

//! Blocking HTTP client for the Jellyfin API.
//!
//! The application only consumes three server operations (resolve server
//! identity, authenticate by name, and list library items) plus the
//! download URL for fetching files. Calls run on worker threads; nothing
//! here touches UI state.

use reqwest::blocking::{Client, Response};
use thiserror::Error;
use url::Url;

use crate::account::ConnectionData;
use crate::jellyfin::models::{AuthRequest, AuthResponse, ItemsResponse, PublicSystemInfo};

const CLIENT_NAME: &str = "talebook";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Failure talking to the media server.
///
/// An HTTP status of 300 or above is an application-level error, kept
/// distinct from transport failures.
#[derive(Error, Debug)]
pub(crate) enum JellyfinError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Code {0}")]
    Status(u16),
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("not signed in")]
    NotAuthenticated,
}

/// A configured client for one Jellyfin server.
pub(crate) struct JellyfinClient {
    base_url: Url,
    device_name: String,
    access_token: Option<String>,
    user_id: Option<String>,
    http: Client,
}

impl JellyfinClient {
    /// Creates an unauthenticated client for the given server URL.
    ///
    /// A bare host is accepted and normalized to `http://`.
    pub(crate) fn new(server_url: &str, device_name: &str) -> Result<Self, JellyfinError> {
        let base_url = normalize_server_url(server_url)?;

        Ok(Self {
            base_url,
            device_name: device_name.to_string(),
            access_token: None,
            user_id: None,
            http: Client::new(),
        })
    }

    /// Rebuilds a signed-in client from a persisted or in-memory connection.
    pub(crate) fn from_connection(
        data: &ConnectionData,
        device_name: &str,
    ) -> Result<Self, JellyfinError> {
        let mut client = Self::new(&data.server_url, device_name)?;
        client.access_token = Some(data.access_token.clone());
        client.user_id = Some(data.user_id.clone());
        Ok(client)
    }

    pub(crate) fn server_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves the server identity from the unauthenticated info endpoint.
    pub(crate) fn resolve_server(&self) -> Result<PublicSystemInfo, JellyfinError> {
        let url = self.endpoint(&["System", "Info", "Public"])?;
        let response = self.http.get(url).send()?;

        Ok(check_status(response)?.json()?)
    }

    /// Authenticates with username and password; on success the client
    /// carries the returned token and user id for subsequent calls.
    pub(crate) fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse, JellyfinError> {
        let url = self.endpoint(&["Users", "AuthenticateByName"])?;
        let body = AuthRequest {
            username: username.to_string(),
            pw: password.to_string(),
        };

        let response = self
            .http
            .post(url)
            .header("X-Emby-Authorization", self.authorization_header())
            .json(&body)
            .send()?;

        let auth: AuthResponse = check_status(response)?.json()?;

        self.access_token = Some(auth.access_token.clone());
        self.user_id = Some(auth.user.id.clone());

        Ok(auth)
    }

    /// The signed-in user's top-level library views.
    pub(crate) fn user_views(&self) -> Result<ItemsResponse, JellyfinError> {
        let user_id = self.user_id.clone().ok_or(JellyfinError::NotAuthenticated)?;
        let url = self.endpoint(&["Users", &user_id, "Views"])?;

        let response = self
            .http
            .get(url)
            .header("X-Emby-Token", self.token()?)
            .send()?;

        Ok(check_status(response)?.json()?)
    }

    /// One page of children of a remote folder, sorted by name.
    pub(crate) fn children(
        &self,
        parent_id: &str,
        start_index: i64,
        limit: i64,
    ) -> Result<ItemsResponse, JellyfinError> {
        let user_id = self.user_id.clone().ok_or(JellyfinError::NotAuthenticated)?;
        let mut url = self.endpoint(&["Users", &user_id, "Items"])?;
        url.query_pairs_mut()
            .append_pair("ParentId", parent_id)
            .append_pair("SortBy", "SortName")
            .append_pair("StartIndex", &start_index.to_string())
            .append_pair("Limit", &limit.to_string())
            .append_pair("Fields", "Path");

        let response = self
            .http
            .get(url)
            .header("X-Emby-Token", self.token()?)
            .send()?;

        Ok(check_status(response)?.json()?)
    }

    /// The direct-download URL for a remote item.
    pub(crate) fn download_url(&self, item_id: &str) -> Result<Url, JellyfinError> {
        let mut url = self.endpoint(&["Items", item_id, "Download"])?;
        url.query_pairs_mut().append_pair("api_key", self.token()?);

        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, JellyfinError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| JellyfinError::InvalidUrl(url::ParseError::EmptyHost))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn token(&self) -> Result<&str, JellyfinError> {
        self.access_token
            .as_deref()
            .ok_or(JellyfinError::NotAuthenticated)
    }

    fn authorization_header(&self) -> String {
        format!(
            "MediaBrowser Client=\"{CLIENT_NAME}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{CLIENT_VERSION}\"",
            self.device_name, self.device_name
        )
    }
}

/// Maps HTTP statuses of 300 and above to [`JellyfinError::Status`].
fn check_status(response: Response) -> Result<Response, JellyfinError> {
    let status = response.status().as_u16();
    if status >= 300 {
        return Err(JellyfinError::Status(status));
    }
    Ok(response)
}

/// Accepts `host`, `host:8096` or a full URL and yields a parsed base URL.
fn normalize_server_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hosts_are_normalized_to_http() {
        let client = JellyfinClient::new("jellyfin.local:8096", "term").unwrap();
        assert_eq!(client.server_url().as_str(), "http://jellyfin.local:8096/");

        let https = JellyfinClient::new("https://media.example.com", "term").unwrap();
        assert_eq!(https.server_url().scheme(), "https");
    }

    #[test]
    fn endpoints_extend_a_prefixed_base_path() {
        let client = JellyfinClient::new("http://host/jellyfin", "term").unwrap();
        let url = client.endpoint(&["System", "Info", "Public"]).unwrap();
        assert_eq!(url.as_str(), "http://host/jellyfin/System/Info/Public");
    }

    #[test]
    fn unauthenticated_calls_are_rejected_locally() {
        let client = JellyfinClient::new("http://host", "term").unwrap();
        assert!(matches!(
            client.user_views(),
            Err(JellyfinError::NotAuthenticated)
        ));
        assert!(matches!(
            client.download_url("abc"),
            Err(JellyfinError::NotAuthenticated)
        ));
    }

    #[test]
    fn rebuilding_from_a_connection_carries_the_token() {
        let data = ConnectionData {
            server_url: "http://host".to_string(),
            server_name: "Home".to_string(),
            user_id: "user-1".to_string(),
            username: "gianni".to_string(),
            access_token: "tok".to_string(),
        };

        let client = JellyfinClient::from_connection(&data, "term").unwrap();
        let url = client.download_url("abc").unwrap();
        assert!(url.query().unwrap().contains("api_key=tok"));
    }
}
