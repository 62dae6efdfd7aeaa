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

//! Scope management for the evaluator.
//!
//! A scope is a lexical container for variables and per-kind attribute
//! defaults, linked to a parent scope. Scopes form a tree built fresh for
//! each compilation run and owned by a [`ScopeTree`], which also carries
//! the run-global state: the tag set, the node table, and the context
//! stack.
//!
//! Two distinct relations run over the same scopes: the lexical `parent`
//! chain (variable and default lookup) and the `base` chain (class
//! inheritance, consulted only by conflict resolution). A definition
//! invoked from inside a class is lexically nested in it but has no
//! `base` link, so it earns no override rights.

mod interp;

pub use interp::interpolate;

use crate::ast::{NodeDecl, Value};
use crate::error::{CompilationError, ErrorCode, Result, Span};
use std::collections::{HashMap, HashSet};

/// Identifies a scope within its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Behavior flags for the root scope of a run.
#[derive(Debug, Clone, Copy)]
pub struct ScopeOptions {
    /// Write-once-per-scope variable discipline.
    pub declarative: bool,
    /// Strict scope: a second statement about an already-declared
    /// resource identity within this scope is always a conflict.
    pub top: bool,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            declarative: true,
            top: false,
        }
    }
}

/// A single scope record.
#[derive(Debug)]
struct Scope {
    /// The enclosing lexical scope.
    parent: Option<ScopeId>,
    /// The class-lineage parent, set only for scopes of classes that
    /// inherit from another class.
    base: Option<ScopeId>,
    /// Write-once variable discipline, fixed at creation.
    declarative: bool,
    /// Strict duplicate-identity handling, fixed at creation.
    top: bool,
    /// Variables local to this scope.
    variables: HashMap<String, Value>,
    /// Attribute defaults local to this scope, keyed by resource kind.
    defaults: HashMap<String, HashMap<String, Value>>,
    /// The class this scope was created for, if any.
    class_name: Option<String>,
}

impl Scope {
    fn new(parent: Option<ScopeId>, declarative: bool, top: bool) -> Self {
        Self {
            parent,
            base: None,
            declarative,
            top,
            variables: HashMap::new(),
            defaults: HashMap::new(),
            class_name: None,
        }
    }
}

/// The scope tree for one compilation run.
///
/// Owns every scope created during evaluation plus the run-global tag
/// set, node table, and context stack. A fresh tree must be used per
/// run; nothing is shared across compilations.
#[derive(Debug)]
pub struct ScopeTree {
    /// All scopes, root first.
    scopes: Vec<Scope>,
    /// Run-global tag set (class names and explicit tags).
    tags: HashSet<String>,
    /// Run-global node table; names are unique tree-wide.
    nodes: HashMap<String, NodeDecl>,
    /// The context stack ("currently inside X").
    context: Vec<Value>,
}

/// The truth predicate of the manifest language: a value is false only
/// if it is the boolean `false` or the empty string.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Str(s) => !s.is_empty(),
        Value::List(_) => true,
    }
}

/// Check whether a name is valid as a class, definition, or tag name:
/// an ASCII lowercase letter followed by alphanumerics, `_` or `-`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl ScopeTree {
    /// Create a tree containing only the root scope.
    pub fn new(options: ScopeOptions) -> Self {
        Self {
            scopes: vec![Scope::new(None, options.declarative, options.top)],
            tags: HashSet::new(),
            nodes: HashMap::new(),
            context: Vec::new(),
        }
    }

    /// The root scope of the tree.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// The number of scopes in the tree.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether the tree holds only the root scope.
    pub fn is_empty(&self) -> bool {
        self.scopes.len() <= 1
    }

    /// Create a child scope, inheriting the parent's declarative mode.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        let declarative = self.get(parent).declarative;
        self.push_scope(Scope::new(Some(parent), declarative, false))
    }

    /// Create a child scope with explicit flags. A `declarative` of
    /// `None` inherits the parent's mode.
    pub fn child_with(&mut self, parent: ScopeId, declarative: Option<bool>, top: bool) -> ScopeId {
        let declarative = declarative.unwrap_or(self.get(parent).declarative);
        self.push_scope(Scope::new(Some(parent), declarative, top))
    }

    /// Create the scope for a class body: a child of `parent` whose
    /// `base` link points at the scope of the inherited class, if any.
    pub fn child_for_class(
        &mut self,
        parent: ScopeId,
        base: Option<ScopeId>,
        class_name: &str,
    ) -> ScopeId {
        let id = self.child(parent);
        let scope = self.get_mut(id);
        scope.base = base;
        scope.class_name = Some(class_name.to_string());
        id
    }

    fn push_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(scope);
        id
    }

    fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// The lexical parent of a scope.
    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    /// The class-lineage parent of a scope.
    pub fn base(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).base
    }

    /// Whether a scope is strict.
    pub fn is_top(&self, id: ScopeId) -> bool {
        self.get(id).top
    }

    /// Whether a scope enforces write-once variables.
    pub fn is_declarative(&self, id: ScopeId) -> bool {
        self.get(id).declarative
    }

    /// The class a scope was created for.
    pub fn class_name(&self, id: ScopeId) -> Option<&str> {
        self.get(id).class_name.as_deref()
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Set a variable in a scope.
    ///
    /// In declarative mode, assigning a name already present in this
    /// scope's own mapping fails; a child scope may freely shadow a
    /// parent's variable.
    pub fn set_variable(
        &mut self,
        id: ScopeId,
        name: &str,
        value: Value,
        span: &Span,
    ) -> Result<()> {
        let scope = self.get_mut(id);
        if scope.declarative && scope.variables.contains_key(name) {
            return Err(CompilationError::new(
                ErrorCode::DuplicateAssignment,
                format!("Cannot reassign variable '{}' in this scope", name),
                span.clone(),
            )
            .with_hint("Variables are assign-once within a scope"));
        }
        scope.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Look up a variable, walking the parent chain.
    ///
    /// The innermost scope that holds the name wins; an undefined
    /// variable yields the empty string, never an error.
    pub fn lookup_variable(&self, id: ScopeId, name: &str) -> Value {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = self.get(scope_id);
            if let Some(value) = scope.variables.get(name) {
                return value.clone();
            }
            current = scope.parent;
        }
        Value::empty()
    }

    // ------------------------------------------------------------------
    // Defaults
    // ------------------------------------------------------------------

    /// Set an attribute default for a resource kind in a scope.
    ///
    /// Each `(kind, attribute)` pair may be set at most once per scope;
    /// batches of attributes are checked key by key.
    pub fn set_default(
        &mut self,
        id: ScopeId,
        kind: &str,
        attribute: &str,
        value: Value,
        span: &Span,
    ) -> Result<()> {
        let scope = self.get_mut(id);
        let entries = scope.defaults.entry(kind.to_string()).or_default();
        if entries.contains_key(attribute) {
            return Err(CompilationError::new(
                ErrorCode::DuplicateDefault,
                format!("Default for {}['{}'] is already set in this scope", kind, attribute),
                span.clone(),
            ));
        }
        entries.insert(attribute.to_string(), value);
        Ok(())
    }

    /// Collect the defaults for a resource kind visible from a scope.
    ///
    /// The result is the union of every ancestor's and this scope's own
    /// defaults for the kind, with nearer scopes winning on collision.
    pub fn lookup_defaults(&self, id: ScopeId, kind: &str) -> HashMap<String, Value> {
        let mut merged = match self.get(id).parent {
            Some(parent) => self.lookup_defaults(parent, kind),
            None => HashMap::new(),
        };
        if let Some(own) = self.get(id).defaults.get(kind) {
            for (attribute, value) in own {
                merged.insert(attribute.clone(), value.clone());
            }
        }
        merged
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Register a node definition in the run-global node table.
    ///
    /// Node names are unique across the whole tree, not per scope.
    pub fn set_node(&mut self, decl: NodeDecl) -> Result<()> {
        if self.nodes.contains_key(&decl.name) {
            let existing = &self.nodes[&decl.name];
            return Err(CompilationError::new(
                ErrorCode::DuplicateNode,
                format!("Node '{}' is already defined", decl.name),
                decl.span.clone(),
            )
            .with_related(existing.span.clone()));
        }
        self.nodes.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Look up a node definition by name.
    pub fn lookup_node(&self, name: &str) -> Option<&NodeDecl> {
        self.nodes.get(name)
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Add a tag to the run-global tag set.
    pub fn tag(&mut self, name: &str, span: &Span) -> Result<()> {
        if !is_valid_name(name) {
            return Err(CompilationError::new(
                ErrorCode::InvalidName,
                format!("Invalid tag name '{}'", name),
                span.clone(),
            )
            .with_hint("Names start with a lowercase letter followed by letters, digits, '_' or '-'"));
        }
        self.tags.insert(name.to_string());
        Ok(())
    }

    /// Check whether a tag has been set anywhere in the run.
    pub fn is_tagged(&self, name: &str) -> bool {
        self.tags.contains(name)
    }

    /// The tags set so far, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Context stack
    // ------------------------------------------------------------------

    /// Run `body` with `value` pushed onto the context stack.
    ///
    /// The stack is restored to its prior depth on every exit path,
    /// including when `body` fails or panics.
    pub fn with_context<T>(
        &mut self,
        value: Value,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        struct Restore<'a> {
            tree: &'a mut ScopeTree,
            depth: usize,
        }
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.tree.context.truncate(self.depth);
            }
        }

        let depth = self.context_depth();
        self.push_context(value);
        let mut guard = Restore { tree: self, depth };
        body(&mut *guard.tree)
    }

    // Low-level context access for guards that close over more than the
    // tree; the evaluator pairs these the same way `with_context` does.
    pub(crate) fn context_depth(&self) -> usize {
        self.context.len()
    }

    pub(crate) fn push_context(&mut self, value: Value) {
        self.context.push(value);
    }

    pub(crate) fn restore_context(&mut self, depth: usize) {
        self.context.truncate(depth);
    }

    /// The top of the context stack, if any.
    pub fn current_context(&self) -> Option<&Value> {
        self.context.last()
    }

    // ------------------------------------------------------------------
    // Lineage
    // ------------------------------------------------------------------

    /// Whether `descendant` reaches `ancestor` by following `base` links.
    pub fn inherits_from(&self, descendant: ScopeId, ancestor: ScopeId) -> bool {
        let mut current = self.get(descendant).base;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).base;
        }
        false
    }

    /// Whether two scopes are connected by class lineage in either
    /// direction.
    pub fn in_lineage(&self, a: ScopeId, b: ScopeId) -> bool {
        self.inherits_from(a, b) || self.inherits_from(b, a)
    }

    /// Interpolate variable references in a template string using this
    /// scope for lookups.
    pub fn interpolate(&self, id: ScopeId, template: &str) -> String {
        interp::interpolate(self, id, template)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new(ScopeOptions::default())
    }
}
