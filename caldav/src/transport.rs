// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The seam between the protocol engine and the network.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};

use crate::config::{AuthMethod, CalDavConfig};
use crate::error::CalDavError;
use crate::types::ETag;

/// Content type of XML request bodies.
pub const CONTENT_TYPE_XML: &str = "application/xml; charset=utf-8";

/// Content type of calendar object bodies.
pub const CONTENT_TYPE_CALENDAR: &str = "text/calendar; charset=utf-8";

/// HTTP and `WebDAV` methods used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    /// `GET`
    Get,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PROPFIND` (RFC 4918)
    Propfind,
    /// `PROPPATCH` (RFC 4918)
    Proppatch,
    /// `REPORT` (RFC 3253)
    Report,
    /// `MKCALENDAR` (RFC 4791)
    Mkcalendar,
}

impl DavMethod {
    /// Method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Propfind => "PROPFIND",
            Self::Proppatch => "PROPPATCH",
            Self::Report => "REPORT",
            Self::Mkcalendar => "MKCALENDAR",
        }
    }
}

impl fmt::Display for DavMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavRequest {
    /// Request method.
    pub method: DavMethod,
    /// Server path (or absolute URL) of the target resource.
    pub path: String,
    /// Extra headers; authentication is added by the transport.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<String>,
}

impl DavRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: DavMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Sets the `Depth` header.
    #[must_use]
    pub fn depth(self, depth: u8) -> Self {
        self.header("Depth", depth.to_string())
    }

    /// Sets an XML body.
    #[must_use]
    pub fn xml(self, body: String) -> Self {
        let mut req = self.header("Content-Type", CONTENT_TYPE_XML);
        req.body = Some(body);
        req
    }

    /// Sets a calendar object body.
    #[must_use]
    pub fn calendar(self, body: String) -> Self {
        let mut req = self.header("Content-Type", CONTENT_TYPE_CALENDAR);
        req.body = Some(body);
        req
    }

    /// Looks up a header, ignoring case.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response returned by a [`Transport`], whatever its status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl DavResponse {
    /// Creates a response without headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Looks up a header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The `ETag` header, if present and non-empty.
    #[must_use]
    pub fn etag(&self) -> Option<ETag> {
        self.header("ETag")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ETag::from)
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The body as text.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::MalformedProtocolResponse`] if the body is not
    /// UTF-8.
    pub fn text(&self) -> Result<&str, CalDavError> {
        std::str::from_utf8(&self.body).map_err(CalDavError::malformed)
    }

    /// Whether the body mentions a `WebDAV` precondition element, e.g.
    /// `valid-sync-token`.
    #[must_use]
    pub fn has_precondition(&self, name: &str) -> bool {
        self.text().is_ok_and(|body| body.contains(name))
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Sends requests to a `CalDAV` server.
///
/// Implementations return every HTTP response, including error statuses;
/// only failures to obtain a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Performs one request/response exchange.
    async fn send(&self, request: DavRequest) -> Result<DavResponse, CalDavError>;
}

/// Sends a request and logs its outcome, without headers or bodies.
pub(crate) async fn exchange(
    transport: &dyn Transport,
    request: DavRequest,
) -> Result<DavResponse, CalDavError> {
    let method = request.method;
    let path = request.path.clone();
    match transport.send(request).await {
        Ok(resp) => {
            tracing::debug!(%method, %path, status = resp.status, "caldav exchange");
            Ok(resp)
        }
        Err(err) => {
            tracing::debug!(%method, %path, %err, "caldav exchange failed");
            Err(err)
        }
    }
}

/// Passes the response through if its status is accepted, otherwise maps
/// the status to an error.
pub(crate) fn expect_status(
    resp: DavResponse,
    href: &str,
    accepted: &[u16],
) -> Result<DavResponse, CalDavError> {
    if accepted.contains(&resp.status) {
        Ok(resp)
    } else {
        Err(CalDavError::from_status(resp.status, href))
    }
}

/// HTTP transport backed by `reqwest`, with authentication.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    auth: AuthMethod,
}

impl HttpTransport {
    /// Creates a new HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or HTTP client creation
    /// fails.
    pub fn new(config: &CalDavConfig) -> Result<Self, CalDavError> {
        let base_url = config.parsed_base_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            auth: config.auth.clone(),
        })
    }

    /// Resolves a server path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Config`] if the path cannot be joined.
    pub fn url_for(&self, path: &str) -> Result<Url, CalDavError> {
        self.base_url
            .join(path)
            .map_err(|e| CalDavError::Config(format!("invalid path '{path}': {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, CalDavError> {
        let url = self.url_for(&request.path)?;
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| CalDavError::Config(format!("invalid method: {e}")))?;

        let mut req = self.client.request(method, url);
        match &self.auth {
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok(DavResponse {
            status,
            headers,
            body,
        })
    }
}
