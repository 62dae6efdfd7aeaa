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

//! The evaluator: walks a manifest's syntax tree and produces a catalog.
//!
//! Evaluation is single-threaded, depth-first, and fail-fast: the first
//! [`CompilationError`] aborts the run. Classes and definitions are
//! registered when their definitions are met and evaluated only when
//! instantiated, each instantiation spawning a child scope. Duplicate
//! statements about one resource identity go through the conflict policy
//! in [`conflict`].

mod catalog;
mod conflict;
mod exports;
mod functions;

pub use catalog::{Catalog, Resource, ResourceId};
pub use conflict::{resolve, MergeOrder, Resolution};
pub use exports::{ExportRegistry, MemoryStore, Store};
pub use functions::{FunctionHandler, FunctionRegistry};

use crate::ast::{ClassDef, DefineDef, Manifest, Node, NodeKind, Value};
use crate::ast::{Expr, ExprKind};
use crate::error::{CompilationError, ErrorCode, Result, Span};
use crate::scope::{is_valid_name, ScopeId, ScopeOptions, ScopeTree};
use std::collections::HashMap;

/// Resource kinds known to the enforcement layer; `defined()` treats
/// them as always defined.
pub const BUILTIN_KINDS: &[&str] = &[
    "file", "user", "group", "host", "package", "service", "exec", "cron", "mount",
];

/// A registered class and, once instantiated, its scope.
struct ClassEntry {
    def: ClassDef,
    scope: Option<ScopeId>,
}

/// The evaluator for one compilation run.
///
/// Owns the scope tree, the class/definition registries, the function
/// registry, the export bookkeeping, and the catalog being built. Not
/// reusable across runs; build a fresh one per compilation.
pub struct Evaluator {
    scopes: ScopeTree,
    classes: HashMap<String, ClassEntry>,
    defines: HashMap<String, DefineDef>,
    catalog: Catalog,
    exports: ExportRegistry,
    functions: FunctionRegistry,
    store: Option<Box<dyn Store>>,
    /// Depth of enclosing exported definition instantiations; while
    /// positive, every declaration produced is collectable.
    exporting: usize,
    /// Class and definition names currently being instantiated; meeting
    /// one again means an instantiation cycle.
    active: Vec<String>,
}

impl Evaluator {
    /// Create an evaluator with a fresh root scope.
    pub fn new(options: ScopeOptions) -> Self {
        Self {
            scopes: ScopeTree::new(options),
            classes: HashMap::new(),
            defines: HashMap::new(),
            catalog: Catalog::new(),
            exports: ExportRegistry::new(),
            functions: FunctionRegistry::with_builtins(),
            store: None,
            exporting: 0,
            active: Vec::new(),
        }
    }

    /// Attach an external store for exported resources.
    pub fn with_store(mut self, store: Box<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// The scope tree of this run.
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Mutable access to the scope tree.
    pub fn scopes_mut(&mut self) -> &mut ScopeTree {
        &mut self.scopes
    }

    /// The catalog built so far.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Consume the evaluator, yielding the catalog.
    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    /// The export bookkeeping of this run.
    pub fn exports(&self) -> &ExportRegistry {
        &self.exports
    }

    /// The exported declarations of a kind produced by this run.
    pub fn exported(&self, kind: &str) -> Vec<&Resource> {
        self.exports.exported_of_type(kind, &self.catalog)
    }

    /// The function registry, for external registration.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Evaluate a manifest against the root scope.
    ///
    /// On success the catalog is complete and every collectable
    /// declaration has been handed to the store, if one is attached.
    pub fn evaluate(&mut self, manifest: &Manifest) -> Result<()> {
        let root = self.scopes.root();
        for statement in &manifest.statements {
            self.eval_node(root, statement)?;
        }
        self.flush_exports();
        Ok(())
    }

    /// Evaluate one statement node in a scope.
    pub fn eval_node(&mut self, scope: ScopeId, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Sequence(children) => {
                for child in children {
                    self.eval_node(scope, child)?;
                }
                Ok(())
            }

            NodeKind::VarAssign { name, value } => {
                let value = self.eval_expr(scope, value)?;
                self.scopes.set_variable(scope, name, value, &node.span)
            }

            NodeKind::ClassDef(def) => self.register_class(def),

            NodeKind::DefineDef(def) => self.register_define(def),

            NodeKind::NodeDef(decl) => self.scopes.set_node(decl.clone()),

            NodeKind::Defaults { kind, attrs } => {
                for attr in attrs {
                    let value = self.eval_expr(scope, &attr.value)?;
                    self.scopes
                        .set_default(scope, kind, &attr.name, value, &attr.span)?;
                }
                Ok(())
            }

            NodeKind::Resource(decl) => {
                let title = self.eval_expr(scope, &decl.title)?;
                let titles: Vec<String> = match title {
                    Value::List(items) => items.iter().map(|v| v.to_string()).collect(),
                    other => vec![other.to_string()],
                };

                let mut attrs = Vec::with_capacity(decl.attrs.len());
                for attr in &decl.attrs {
                    let value = self.eval_expr(scope, &attr.value)?;
                    attrs.push((attr.name.clone(), value, attr.span.clone()));
                }

                for title in titles {
                    if self.defines.contains_key(&decl.kind) {
                        self.instantiate_definition(
                            scope,
                            &decl.kind,
                            &title,
                            attrs.clone(),
                            decl.exported,
                            &decl.span,
                        )?;
                    } else if self.classes.contains_key(&decl.kind) {
                        // Classes take no parameters; attributes or an
                        // export flag here would vanish silently.
                        if let Some((name, _, attr_span)) = attrs.first() {
                            return Err(CompilationError::new(
                                ErrorCode::InvalidArgument,
                                format!(
                                    "Class '{}' takes no attributes, got '{}'",
                                    decl.kind, name
                                ),
                                attr_span.clone(),
                            ));
                        }
                        if decl.exported {
                            return Err(CompilationError::new(
                                ErrorCode::InvalidArgument,
                                format!("Class '{}' cannot be exported", decl.kind),
                                decl.span.clone(),
                            ));
                        }
                        self.instantiate_class(scope, &decl.kind, &decl.span)?;
                    } else {
                        self.declare_resource(
                            scope,
                            &decl.kind,
                            title,
                            attrs.clone(),
                            decl.exported,
                            &decl.span,
                        )?;
                    }
                }
                Ok(())
            }

            NodeKind::Collect { kind } => self.collect(scope, kind, &node.span),

            NodeKind::FunctionCall { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(scope, arg)?);
                }
                self.call_function(scope, name, &values, &node.span)?;
                Ok(())
            }
        }
    }

    /// Evaluate an expression in a scope.
    pub fn eval_expr(&self, scope: ScopeId, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Str(template) => Ok(Value::Str(self.scopes.interpolate(scope, template))),
            ExprKind::Variable(name) => Ok(self.scopes.lookup_variable(scope, name)),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(scope, item)?);
                }
                Ok(Value::List(values))
            }
        }
    }

    /// Dispatch a function call by name.
    pub fn call_function(
        &mut self,
        scope: ScopeId,
        name: &str,
        args: &[Value],
        span: &Span,
    ) -> Result<Value> {
        let handler = self.functions.get(name).ok_or_else(|| {
            CompilationError::new(
                ErrorCode::UnknownFunction,
                format!("Unknown function '{}'", name),
                span.clone(),
            )
        })?;
        handler(self, scope, args, span)
    }

    /// Whether any of the names denotes a registered class or
    /// definition, or a built-in resource kind.
    pub fn is_defined(&self, names: &[&str]) -> bool {
        names.iter().any(|name| {
            self.classes.contains_key(*name)
                || self.defines.contains_key(*name)
                || BUILTIN_KINDS.contains(name)
        })
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    fn register_class(&mut self, def: &ClassDef) -> Result<()> {
        self.check_registration_name(&def.name, &def.span, ErrorCode::DuplicateClass)?;
        if def.base.as_deref() == Some(def.name.as_str()) {
            return Err(CompilationError::new(
                ErrorCode::SelfInheritance,
                format!("Class '{}' cannot inherit from itself", def.name),
                def.span.clone(),
            ));
        }
        self.classes.insert(
            def.name.clone(),
            ClassEntry {
                def: def.clone(),
                scope: None,
            },
        );
        Ok(())
    }

    fn register_define(&mut self, def: &DefineDef) -> Result<()> {
        self.check_registration_name(&def.name, &def.span, ErrorCode::DuplicateDefinition)?;
        self.defines.insert(def.name.clone(), def.clone());
        Ok(())
    }

    /// Classes and definitions share one namespace; a duplicate name is
    /// a conflict at registration time, whether or not it is ever
    /// instantiated.
    fn check_registration_name(&self, name: &str, span: &Span, code: ErrorCode) -> Result<()> {
        if !is_valid_name(name) {
            return Err(CompilationError::new(
                ErrorCode::InvalidName,
                format!("Invalid class or definition name '{}'", name),
                span.clone(),
            ));
        }
        let existing = self
            .classes
            .get(name)
            .map(|entry| entry.def.span.clone())
            .or_else(|| self.defines.get(name).map(|def| def.span.clone()));
        if let Some(existing_span) = existing {
            return Err(CompilationError::new(
                code,
                format!("'{}' is already defined", name),
                span.clone(),
            )
            .with_related(existing_span));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Instantiation
    // ------------------------------------------------------------------

    /// Instantiate a class, creating its scope on first use and reusing
    /// it afterwards. Inherited classes are instantiated first and their
    /// scopes linked through the lineage chain.
    pub fn instantiate_class(
        &mut self,
        call_scope: ScopeId,
        name: &str,
        span: &Span,
    ) -> Result<ScopeId> {
        let entry = self.classes.get(name).ok_or_else(|| {
            CompilationError::new(
                ErrorCode::UnknownClass,
                format!("Unknown class '{}'", name),
                span.clone(),
            )
        })?;
        if let Some(id) = entry.scope {
            return Ok(id);
        }
        let def = entry.def.clone();

        // The scope is recorded only after the base chain resolves, so
        // a cycle must be caught here rather than by the reuse check.
        if self.active.iter().any(|active| active == name) {
            return Err(CompilationError::new(
                ErrorCode::InstantiationCycle,
                format!("Inheritance cycle detected while instantiating class '{}'", name),
                span.clone(),
            ));
        }

        self.active.push(def.name.clone());
        let result = self.instantiate_class_body(call_scope, &def, span);
        self.active.pop();
        result
    }

    fn instantiate_class_body(
        &mut self,
        call_scope: ScopeId,
        def: &ClassDef,
        span: &Span,
    ) -> Result<ScopeId> {
        let base = match &def.base {
            Some(parent) => Some(self.instantiate_class(call_scope, parent, span)?),
            None => None,
        };

        let id = self.scopes.child_for_class(call_scope, base, &def.name);
        if let Some(entry) = self.classes.get_mut(&def.name) {
            entry.scope = Some(id);
        }
        self.scopes.tag(&def.name, span)?;

        self.with_context(Value::Str(format!("class {}", def.name)), |evaluator| {
            evaluator.eval_node(id, &def.body)
        })?;
        Ok(id)
    }

    /// Instantiate a parameterized definition: fresh scope without a
    /// lineage link, parameters bound from the given attributes over the
    /// scope defaults over the declared parameter defaults.
    fn instantiate_definition(
        &mut self,
        call_scope: ScopeId,
        kind: &str,
        title: &str,
        attrs: Vec<(String, Value, Span)>,
        exported: bool,
        span: &Span,
    ) -> Result<()> {
        let def = self
            .defines
            .get(kind)
            .cloned()
            .expect("caller checked the definition exists");

        // A definition whose body reaches its own kind again, directly
        // or through another definition, would never terminate.
        if self.active.iter().any(|active| active == kind) {
            return Err(CompilationError::new(
                ErrorCode::InstantiationCycle,
                format!(
                    "Definition '{}' instantiates itself, via {}[{}]",
                    kind, kind, title
                ),
                span.clone(),
            ));
        }

        self.active.push(kind.to_string());
        let result = self.instantiate_definition_body(call_scope, &def, title, attrs, exported, span);
        self.active.pop();
        result
    }

    fn instantiate_definition_body(
        &mut self,
        call_scope: ScopeId,
        def: &DefineDef,
        title: &str,
        attrs: Vec<(String, Value, Span)>,
        exported: bool,
        span: &Span,
    ) -> Result<()> {
        let kind = def.name.as_str();
        let scope = self.scopes.child(call_scope);
        let defaults = self.scopes.lookup_defaults(scope, kind);

        let mut given: HashMap<String, Value> = HashMap::new();
        for (name, value, attr_span) in attrs {
            if !def.params.iter().any(|param| param.name == name) {
                return Err(CompilationError::new(
                    ErrorCode::InvalidArgument,
                    format!("Invalid parameter '{}' for {}[{}]", name, kind, title),
                    attr_span,
                ));
            }
            given.insert(name, value);
        }

        for param in &def.params {
            let value = match given.remove(&param.name) {
                Some(value) => value,
                None => match defaults.get(&param.name) {
                    Some(value) => value.clone(),
                    None => match &param.default {
                        Some(default) => self.eval_expr(scope, default)?,
                        None => {
                            return Err(CompilationError::new(
                                ErrorCode::InvalidArgument,
                                format!(
                                    "Missing required parameter '{}' for {}[{}]",
                                    param.name, kind, title
                                ),
                                span.clone(),
                            ));
                        }
                    },
                },
            };
            self.scopes.set_variable(scope, &param.name, value, span)?;
        }

        if !def.params.iter().any(|param| param.name == "name") {
            self.scopes
                .set_variable(scope, "name", Value::from(title), span)?;
        }

        // Collectable status propagates into everything declared inside
        // an exported instantiation.
        if exported {
            self.exporting += 1;
        }
        let result = self.with_context(Value::Str(format!("{}[{}]", kind, title)), |evaluator| {
            evaluator.eval_node(scope, &def.body)
        });
        if exported {
            self.exporting -= 1;
        }
        result
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn declare_resource(
        &mut self,
        scope: ScopeId,
        kind: &str,
        title: String,
        attrs: Vec<(String, Value, Span)>,
        exported: bool,
        span: &Span,
    ) -> Result<()> {
        let mut resource = Resource::new(kind, title, scope, span.clone());
        resource.collectable = exported || self.exporting > 0;
        for (name, value, _) in attrs {
            resource.set(name, value);
        }
        // Defaults fill in only attributes not explicitly given.
        for (name, value) in self.scopes.lookup_defaults(scope, kind) {
            resource.attributes.entry(name).or_insert(value);
        }
        self.record(resource)
    }

    /// Record a candidate declaration, merging with an existing one of
    /// the same identity per the conflict policy.
    fn record(&mut self, candidate: Resource) -> Result<()> {
        let id = candidate.id();
        match self.catalog.position(&id) {
            Some(position) => {
                let resolution = conflict::resolve(&self.scopes, self.catalog.at(position), &candidate)?;
                let existing = self.catalog.at_mut(position);
                match resolution.order {
                    MergeOrder::CandidateWins => {
                        existing.origin = candidate.origin;
                        existing.span = candidate.span;
                        for (name, value) in candidate.attributes {
                            existing.attributes.insert(name, value);
                        }
                    }
                    MergeOrder::ExistingWins => {
                        for (name, value) in candidate.attributes {
                            existing.attributes.entry(name).or_insert(value);
                        }
                    }
                }
                existing.collectable = resolution.collectable;
                if resolution.collectable {
                    self.exports.mark(id);
                }
            }
            None => {
                let collectable = candidate.collectable;
                self.catalog.push(candidate);
                if collectable {
                    self.exports.mark(id);
                }
            }
        }
        Ok(())
    }

    /// Splice previously exported declarations of a kind into the
    /// catalog, through the same conflict policy as local statements.
    fn collect(&mut self, scope: ScopeId, kind: &str, span: &Span) -> Result<()> {
        let stored = match &self.store {
            Some(store) => store.query(kind),
            None => Vec::new(),
        };
        for mut resource in stored {
            // Foreign origins are meaningless in this run's tree.
            resource.origin = scope;
            resource.span = span.clone();
            resource.collectable = true;
            self.record(resource)?;
        }
        Ok(())
    }

    /// Hand every collectable declaration to the store.
    fn flush_exports(&mut self) {
        if let Some(store) = &mut self.store {
            for resource in self.catalog.iter().filter(|r| r.collectable) {
                store.store(resource);
            }
        }
    }

    /// Context guard over the whole evaluator; restores the stack the
    /// way [`ScopeTree::with_context`] does, on unwind included.
    fn with_context<T>(
        &mut self,
        value: Value,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        struct Restore<'a> {
            evaluator: &'a mut Evaluator,
            depth: usize,
        }
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.evaluator.scopes.restore_context(self.depth);
            }
        }

        let depth = self.scopes.context_depth();
        self.scopes.push_context(value);
        let mut guard = Restore {
            evaluator: self,
            depth,
        };
        body(&mut *guard.evaluator)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(ScopeOptions::default())
    }
}
