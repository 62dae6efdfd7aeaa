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

//! Export bookkeeping and the external store interface.
//!
//! Declarations flagged collectable are tracked here during a run and
//! handed to a [`Store`] collaborator when evaluation finishes. The
//! store owns persistence and cross-host collection; this module only
//! keeps the in-run records and the query surface.

use super::catalog::{Catalog, Resource, ResourceId};

/// The external store collaborator for exported resources.
///
/// `query` returns declarations stored by previous runs, not the
/// current one; the evaluator hands the current run's collectable
/// declarations to `store` only after evaluation succeeds.
pub trait Store {
    /// Persist an exported declaration.
    fn store(&mut self, resource: &Resource);

    /// Fetch previously stored declarations of a kind.
    fn query(&self, kind: &str) -> Vec<Resource>;
}

/// In-run registry of collectable declarations.
#[derive(Debug, Default)]
pub struct ExportRegistry {
    ids: Vec<ResourceId>,
}

impl ExportRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an identity as collectable.
    pub fn mark(&mut self, id: ResourceId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Whether an identity has been marked.
    pub fn is_marked(&self, id: &ResourceId) -> bool {
        self.ids.contains(id)
    }

    /// The number of marked identities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing has been marked.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The marked declarations of a kind, resolved against a catalog,
    /// in the order they were marked.
    pub fn exported_of_type<'a>(&self, kind: &str, catalog: &'a Catalog) -> Vec<&'a Resource> {
        self.ids
            .iter()
            .filter(|id| id.kind == kind)
            .filter_map(|id| catalog.get(id))
            .collect()
    }
}

/// An in-memory store, for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    previous: Vec<Resource>,
    current: Vec<Resource>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run: everything stored so far becomes queryable.
    pub fn begin_run(&mut self) {
        self.previous.append(&mut self.current);
    }

    /// All declarations ever stored.
    pub fn stored(&self) -> impl Iterator<Item = &Resource> {
        self.previous.iter().chain(self.current.iter())
    }
}

impl Store for MemoryStore {
    fn store(&mut self, resource: &Resource) {
        self.current.push(resource.clone());
    }

    fn query(&self, kind: &str) -> Vec<Resource> {
        self.previous
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }
}

// A shared handle works as a store too, letting callers keep access to
// the records after handing the store to an evaluator.
impl Store for std::rc::Rc<std::cell::RefCell<MemoryStore>> {
    fn store(&mut self, resource: &Resource) {
        self.borrow_mut().store(resource);
    }

    fn query(&self, kind: &str) -> Vec<Resource> {
        self.borrow().query(kind)
    }
}
