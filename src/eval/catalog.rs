// Anvil - A declarative infrastructure compiler producing conflict-free catalogs
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Resource declarations and the compiled catalog.
//!
//! A resource declaration names one manageable unit by its `(kind,
//! title)` identity plus an attribute map. The catalog is the ordered,
//! duplicate-free collection of declarations one compilation produces.

use crate::ast::Value;
use crate::error::Span;
use crate::scope::ScopeId;
use std::collections::{BTreeMap, HashMap};

/// The identity of a resource declaration: kind plus title.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// The resource kind (type name).
    pub kind: String,
    /// The instance title.
    pub title: String,
}

impl ResourceId {
    /// Create a new identity.
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.kind, self.title)
    }
}

/// A resource declaration.
#[derive(Debug, Clone)]
pub struct Resource {
    /// The resource kind.
    pub kind: String,
    /// The instance title.
    pub title: String,
    /// The attribute map, sorted by name for stable output.
    pub attributes: BTreeMap<String, Value>,
    /// Whether this declaration is flagged for export/collection.
    pub collectable: bool,
    /// The scope the declaration was made in. Only meaningful within
    /// the run that produced it; used by conflict resolution.
    pub origin: ScopeId,
    /// The source span of the declaring statement.
    pub span: Span,
}

impl Resource {
    /// Create a declaration without attributes.
    pub fn new(kind: impl Into<String>, title: impl Into<String>, origin: ScopeId, span: Span) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            attributes: BTreeMap::new(),
            collectable: false,
            origin,
            span,
        }
    }

    /// The identity of this declaration.
    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.kind.clone(), self.title.clone())
    }

    /// Get an attribute value.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Set an attribute value, replacing any previous one.
    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.attributes.insert(attribute.into(), value);
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}] {{", self.kind, self.title)?;
        for (i, (name, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {} => {}", name, value)?;
        }
        write!(f, " }}")
    }
}

/// The compiled catalog: declarations in insertion order, unique by
/// identity.
#[derive(Debug, Default)]
pub struct Catalog {
    resources: Vec<Resource>,
    index: HashMap<ResourceId, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of declarations.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the catalog holds no declarations.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate declarations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Look up a declaration by identity.
    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    /// The insertion position of an identity, if declared.
    pub fn position(&self, id: &ResourceId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// A declaration by insertion position.
    pub fn at(&self, position: usize) -> &Resource {
        &self.resources[position]
    }

    /// Mutable access to a declaration by insertion position.
    pub fn at_mut(&mut self, position: usize) -> &mut Resource {
        &mut self.resources[position]
    }

    /// Append a declaration. The caller guarantees the identity is not
    /// yet present; the conflict resolver owns that check.
    pub fn push(&mut self, resource: Resource) -> usize {
        let position = self.resources.len();
        debug_assert!(!self.index.contains_key(&resource.id()));
        self.index.insert(resource.id(), position);
        self.resources.push(resource);
        position
    }
}

impl IntoIterator for Catalog {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}
