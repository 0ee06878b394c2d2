// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for WebDAV/CalDAV operations.

use crate::error::CalDavError;
use crate::types::{CalendarCollection, ETag, Href};
use crate::xml::{XmlElement, parse_document};

/// `WebDAV` multistatus response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiStatusResponse {
    /// The response items.
    pub responses: Vec<ResponseItem>,
    /// Top-level `sync-token` of a `sync-collection` report.
    pub sync_token: Option<String>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseItem {
    /// Href the response is about.
    pub href: Href,
    /// Status of the whole resource, used for removed objects and
    /// truncated listings.
    pub status: Option<u16>,
    /// Property groups by status.
    pub prop_stats: Vec<PropStat>,
}

/// Property stat with status and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropStat {
    /// Properties sharing the status.
    pub props: PropertyBag,
    /// HTTP status code of the group.
    pub status: u16,
}

/// Open bag of `WebDAV` properties.
///
/// Every property the server sent is kept, recognized or not; accessors
/// return `None` for properties that are missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag(pub Vec<XmlElement>);

impl PropertyBag {
    /// Raw property element by local name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&XmlElement> {
        self.0.iter().find(|p| p.is(name))
    }

    /// Whether the property is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Trimmed text of a property, `None` if missing or empty.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name)
            .map(|p| p.text.trim())
            .filter(|text| !text.is_empty())
    }

    /// Untrimmed text of a property, for payloads such as calendar data.
    #[must_use]
    pub fn raw_text(&self, name: &str) -> Option<&str> {
        self.get(name).map(|p| p.text.as_str())
    }

    /// First `href` child of a property such as `calendar-home-set`.
    #[must_use]
    pub fn href(&self, name: &str) -> Option<Href> {
        self.get(name)?
            .child_text("href")
            .filter(|href| !href.is_empty())
            .map(Href::from_server)
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.text("displayname")
    }

    /// Entity tag.
    #[must_use]
    pub fn etag(&self) -> Option<ETag> {
        self.text("getetag").map(ETag::from)
    }

    /// Whether `resourcetype` marks a calendar collection.
    #[must_use]
    pub fn is_calendar(&self) -> bool {
        self.get("resourcetype")
            .is_some_and(|rt| rt.child("calendar").is_some())
    }

    /// Whether `resourcetype` marks any collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.get("resourcetype")
            .is_some_and(|rt| rt.child("collection").is_some() || rt.child("calendar").is_some())
    }

    /// Component names of `supported-calendar-component-set`.
    #[must_use]
    pub fn supported_components(&self) -> Option<Vec<String>> {
        let set = self.get("supported-calendar-component-set")?;
        Some(
            set.children_named("comp")
                .filter_map(|comp| comp.attribute("name"))
                .map(str::to_ascii_uppercase)
                .collect(),
        )
    }

    /// Copies the metadata this bag carries onto a collection.
    ///
    /// Properties absent from the bag leave the collection unchanged.
    pub fn apply_metadata(&self, collection: &mut CalendarCollection) {
        if let Some(name) = self.display_name() {
            collection.display_name = Some(name.to_string());
        }
        if let Some(desc) = self.text("calendar-description") {
            collection.description = Some(desc.to_string());
        }
        if let Some(color) = self.text("calendar-color") {
            collection.color = Some(color.to_string());
        }
        if let Some(ctag) = self.text("getctag") {
            collection.ctag = Some(ctag.to_string());
        }
        if let Some(token) = self.text("sync-token") {
            collection.sync_token = Some(token.to_string());
        }
        if let Some(components) = self.supported_components() {
            collection.supported_components = components;
        }
    }
}

impl ResponseItem {
    /// Properties of all propstats with a 2xx status, merged.
    #[must_use]
    pub fn found_props(&self) -> PropertyBag {
        PropertyBag(
            self.prop_stats
                .iter()
                .filter(|ps| (200..300).contains(&ps.status))
                .flat_map(|ps| ps.props.0.iter().cloned())
                .collect(),
        )
    }

    fn from_element(element: &XmlElement) -> Result<Self, CalDavError> {
        let href = element
            .child_text("href")
            .ok_or_else(|| CalDavError::malformed("response without href"))?;
        let status = element.child_text("status").and_then(parse_status_line);
        let prop_stats = element
            .children_named("propstat")
            .map(|ps| PropStat {
                props: PropertyBag(
                    ps.child("prop")
                        .map(|p| p.children.clone())
                        .unwrap_or_default(),
                ),
                // A propstat without a readable status is treated as found
                status: ps.child_text("status").and_then(parse_status_line).unwrap_or(200),
            })
            .collect();

        Ok(Self {
            href: Href::from_server(href),
            status,
            prop_stats,
        })
    }
}

impl MultiStatusResponse {
    /// Parses multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::MalformedProtocolResponse`] if the document is
    /// not well-formed or its root is not `multistatus`.
    pub fn from_xml(xml: &str) -> Result<Self, CalDavError> {
        let root = parse_document(xml)?;
        if !root.is("multistatus") {
            return Err(CalDavError::malformed(format!(
                "expected multistatus, found {}",
                root.qualified_name
            )));
        }

        let responses = root
            .children_named("response")
            .map(ResponseItem::from_element)
            .collect::<Result<_, _>>()?;
        let sync_token = root
            .child_text("sync-token")
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            responses,
            sync_token,
        })
    }

    /// Parses a multistatus body given as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::MalformedProtocolResponse`] if the body is not
    /// UTF-8 or not a multistatus document.
    pub fn from_bytes(body: &[u8]) -> Result<Self, CalDavError> {
        let xml = std::str::from_utf8(body).map_err(CalDavError::malformed)?;
        Self::from_xml(xml)
    }
}

/// Parses `HTTP/1.1 200 OK` into `200`.
fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}
