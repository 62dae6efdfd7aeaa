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

//! Name-keyed function dispatch.
//!
//! Manifest function calls resolve through a registry populated with the
//! built-in statement functions and extended by external callers. A
//! handler receives the evaluator, the calling scope, the evaluated
//! arguments, and the call site span.

use crate::ast::Value;
use crate::error::{CompilationError, ErrorCode, Result, Span};
use crate::scope::ScopeId;

use super::Evaluator;

/// A manifest function handler.
pub type FunctionHandler = fn(&mut Evaluator, ScopeId, &[Value], &Span) -> Result<Value>;

/// The function registry.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    handlers: std::collections::HashMap<String, FunctionHandler>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("tag", builtin_tag);
        registry.register("include", builtin_include);
        registry.register("tagged", builtin_tagged);
        registry.register("defined", builtin_defined);
        registry
    }

    /// Register a handler, replacing any previous one of the same name.
    pub fn register(&mut self, name: &str, handler: FunctionHandler) {
        self.handlers.insert(name.to_string(), handler);
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<FunctionHandler> {
        self.handlers.get(name).copied()
    }

    /// Whether a function of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

/// Flatten argument values into a list of names; lists recurse.
fn names(args: &[Value], out: &mut Vec<String>) {
    for arg in args {
        match arg {
            Value::List(items) => names(items, out),
            other => out.push(other.to_string()),
        }
    }
}

fn require_args(function: &str, args: &[Value], span: &Span) -> Result<Vec<String>> {
    let mut flat = Vec::new();
    names(args, &mut flat);
    if flat.is_empty() {
        return Err(CompilationError::new(
            ErrorCode::WrongNumberOfArguments,
            format!("{}() requires at least one argument", function),
            span.clone(),
        ));
    }
    Ok(flat)
}

/// `tag(names..)`: add each name to the run-global tag set.
fn builtin_tag(
    evaluator: &mut Evaluator,
    _scope: ScopeId,
    args: &[Value],
    span: &Span,
) -> Result<Value> {
    for name in require_args("tag", args, span)? {
        evaluator.scopes_mut().tag(&name, span)?;
    }
    Ok(Value::Bool(true))
}

/// `include(classes..)`: instantiate each named class in the calling
/// scope.
fn builtin_include(
    evaluator: &mut Evaluator,
    scope: ScopeId,
    args: &[Value],
    span: &Span,
) -> Result<Value> {
    for name in require_args("include", args, span)? {
        evaluator.instantiate_class(scope, &name, span)?;
    }
    Ok(Value::Bool(true))
}

/// `tagged(names..)`: whether every name is in the tag set.
fn builtin_tagged(
    evaluator: &mut Evaluator,
    _scope: ScopeId,
    args: &[Value],
    span: &Span,
) -> Result<Value> {
    let tagged = require_args("tagged", args, span)?
        .iter()
        .all(|name| evaluator.scopes().is_tagged(name));
    Ok(Value::Bool(tagged))
}

/// `defined(names..)`: whether any name denotes a registered class or
/// definition, or a built-in resource kind.
fn builtin_defined(
    evaluator: &mut Evaluator,
    _scope: ScopeId,
    args: &[Value],
    span: &Span,
) -> Result<Value> {
    let flat = require_args("defined", args, span)?;
    let refs: Vec<&str> = flat.iter().map(String::as_str).collect();
    Ok(Value::Bool(evaluator.is_defined(&refs)))
}
