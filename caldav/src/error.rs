// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// `CalDAV` client errors.
///
/// Every fallible operation returns one of these kinds, carrying the href
/// and entity tags needed to decide between retrying, re-syncing and
/// reporting to the user.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalDavError {
    /// Connectivity failure, timeout or server-side (5xx) error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials were rejected.
    #[error("authorization failed with status {status} for {href}")]
    Authorization {
        /// HTTP status returned by the server
        status: u16,
        /// Requested href
        href: String,
    },

    /// The server sent an XML body that cannot be understood.
    #[error("malformed protocol response: {0}")]
    MalformedProtocolResponse(String),

    /// The server sent a calendar object that cannot be parsed.
    #[error("malformed calendar object at {href}: {reason}")]
    MalformedObjectBody {
        /// Href of the object
        href: String,
        /// Parser message
        reason: String,
    },

    /// The entity tag sent with the request is stale.
    #[error(
        "precondition failed for {href}: expected {expected}, server has {}",
        observed.as_deref().unwrap_or("an unknown version")
    )]
    PreconditionFailed {
        /// Href of the object
        href: String,
        /// Entity tag the caller expected
        expected: String,
        /// Entity tag reported by the server, if any
        observed: Option<String>,
    },

    /// An object already exists at the href chosen for a new object.
    #[error("conflict: {href} already exists")]
    Conflict {
        /// Href of the existing object
        href: String,
    },

    /// The object or collection does not exist.
    #[error("not found: {href}")]
    NotFound {
        /// Requested href
        href: String,
    },

    /// A status the operation does not expect.
    #[error("unexpected status {status} for {href}")]
    UnexpectedStatus {
        /// HTTP status returned by the server
        status: u16,
        /// Requested href
        href: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CalDavError {
    /// Maps a non-success status to an error kind.
    ///
    /// 412 is reported as [`CalDavError::PreconditionFailed`] without
    /// entity tags; operations sending a precondition build their own error.
    pub(crate) fn from_status(status: u16, href: &str) -> Self {
        let href = href.to_string();
        match status {
            401 | 403 => Self::Authorization { status, href },
            404 | 410 => Self::NotFound { href },
            409 => Self::Conflict { href },
            412 => Self::PreconditionFailed {
                href,
                expected: String::new(),
                observed: None,
            },
            500..=599 => Self::Transport(format!("server error {status} for {href}")),
            _ => Self::UnexpectedStatus { status, href },
        }
    }

    /// Wraps any displayable error as a malformed protocol response.
    pub(crate) fn malformed(err: impl fmt::Display) -> Self {
        Self::MalformedProtocolResponse(err.to_string())
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Only transport failures qualify. Stale entity tags, conflicts and
    /// malformed data need the caller to act first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for CalDavError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<quick_xml::Error> for CalDavError {
    fn from(err: quick_xml::Error) -> Self {
        Self::malformed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_to_kinds() {
        assert!(matches!(
            CalDavError::from_status(401, "/a"),
            CalDavError::Authorization { status: 401, .. }
        ));
        assert_eq!(
            CalDavError::from_status(404, "/a"),
            CalDavError::NotFound {
                href: "/a".to_string()
            }
        );
        assert_eq!(
            CalDavError::from_status(409, "/a"),
            CalDavError::Conflict {
                href: "/a".to_string()
            }
        );
        assert!(CalDavError::from_status(503, "/a").is_retryable());
        assert_eq!(
            CalDavError::from_status(418, "/a"),
            CalDavError::UnexpectedStatus {
                status: 418,
                href: "/a".to_string()
            }
        );
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(CalDavError::Transport("timeout".to_string()).is_retryable());
        assert!(
            !CalDavError::PreconditionFailed {
                href: "/a".to_string(),
                expected: "\"1\"".to_string(),
                observed: Some("\"2\"".to_string()),
            }
            .is_retryable()
        );
        assert!(!CalDavError::MalformedProtocolResponse("x".to_string()).is_retryable());
    }

    #[test]
    fn precondition_message_names_both_tags() {
        let err = CalDavError::PreconditionFailed {
            href: "/cal/a.ics".to_string(),
            expected: "\"1\"".to_string(),
            observed: Some("\"2\"".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "precondition failed for /cal/a.ics: expected \"1\", server has \"2\""
        );
    }
}
