// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use reqwest::Url;

use crate::error::CalDavError;

/// `CalDAV` authentication method.
///
/// Credentials are opaque strings sent with every request; `Debug` output
/// never contains them.
#[derive(Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password).
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// `CalDAV` server configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CalDavConfig {
    /// Base URL of the `CalDAV` server.
    pub base_url: String,
    /// Calendar home path (e.g., /dav/calendars/user/), used when the server
    /// does not advertise one.
    #[serde(default)]
    pub calendar_home: String,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Treat collections holding only tasks (`VTODO`) as supported.
    #[serde(default)]
    pub include_tasks: bool,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("calbridge-caldav/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for CalDavConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            calendar_home: String::new(),
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            include_tasks: false,
        }
    }
}

impl CalDavConfig {
    /// Creates a configuration using basic authentication.
    #[must_use]
    pub fn basic(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthMethod::Basic {
                username: username.into(),
                password: password.into(),
            },
            ..Self::default()
        }
    }

    /// Parses the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Config`] if the URL is not an absolute
    /// `http(s)` URL.
    pub fn parsed_base_url(&self) -> Result<Url, CalDavError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| CalDavError::Config(format!("invalid base URL '{}': {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(CalDavError::Config(format!(
                "unsupported URL scheme '{scheme}' in base URL"
            ))),
        }
    }

    /// Path component of the base URL, where principal discovery starts.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Config`] if the base URL is invalid.
    pub fn base_path(&self) -> Result<String, CalDavError> {
        self.parsed_base_url().map(|url| url.path().to_string())
    }
}
