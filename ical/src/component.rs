// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Generic iCalendar component: a named, ordered property bag with children.

use crate::property::Property;

/// An iCalendar component such as `VCALENDAR`, `VEVENT` or `VALARM`.
///
/// Properties and children keep their source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Component name, original casing preserved
    pub name: String,
    /// Properties in source order
    pub properties: Vec<Property>,
    /// Nested components in source order
    pub children: Vec<Component>,
}

impl Component {
    /// Creates an empty component.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Whether this component has the given name (case-insensitive).
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// First property with the given name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.is(name))
    }

    /// Mutable access to the first property with the given name.
    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.is(name))
    }

    /// All properties with the given name.
    pub fn properties_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> {
        self.properties.iter().filter(move |p| p.is(name))
    }

    /// Replaces the first property with the same name, dropping any
    /// duplicates, or appends it when absent.
    pub fn set_property(&mut self, property: Property) {
        match self.properties.iter().position(|p| p.is(&property.name)) {
            Some(index) => {
                let name = property.name.clone();
                let mut i = 0;
                self.properties.retain(|p| {
                    let keep = i <= index || !p.is(&name);
                    i += 1;
                    keep
                });
                if let Some(slot) = self.properties.get_mut(index) {
                    *slot = property;
                }
            }
            None => self.properties.push(property),
        }
    }

    /// Appends a property, keeping existing ones with the same name.
    pub fn push_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Removes every property with the given name.
    pub fn remove_property(&mut self, name: &str) {
        self.properties.retain(|p| !p.is(name));
    }

    /// Child components with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Component> {
        self.children.iter().filter(move |c| c.is(name))
    }
}
