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

//! Abstract Syntax Tree (AST) definitions for the Anvil compiler core.
//!
//! This module defines the statement tree the evaluator walks. The tree is
//! produced by an external parser; Anvil only defines its shape and carries
//! each node's source span through to error reporting.

mod expr;
mod value;

pub use expr::*;
pub use value::*;

use crate::error::Span;

/// A complete parsed manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Top-level statements, in source order.
    pub statements: Vec<Node>,
}

impl Manifest {
    /// Create a new empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level statement.
    pub fn push(&mut self, node: Node) {
        self.statements.push(node);
    }
}

impl From<Vec<Node>> for Manifest {
    fn from(statements: Vec<Node>) -> Self {
        Self { statements }
    }
}

/// A statement node in a manifest.
#[derive(Debug, Clone)]
pub struct Node {
    /// The kind of statement.
    pub kind: NodeKind,
    /// The source span of this statement.
    pub span: Span,
}

impl Node {
    /// Create a new node.
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// A node with a synthetic span, for programmatic construction.
    pub fn synthetic(kind: NodeKind) -> Self {
        Self::new(kind, Span::synthetic())
    }
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An ordered list of statements, evaluated in the current scope.
    Sequence(Vec<Node>),

    /// A variable assignment (`$name = value`).
    VarAssign {
        /// The variable name, without the leading `$`.
        name: String,
        /// The assigned value.
        value: Expr,
    },

    /// A class definition. Registered, not evaluated, at definition time.
    ClassDef(ClassDef),

    /// A parameterized definition. Registered, not evaluated.
    DefineDef(DefineDef),

    /// A node (host) definition, registered in the shared node table.
    NodeDef(NodeDecl),

    /// Attribute defaults for a resource kind in the current scope.
    Defaults {
        /// The resource kind the defaults apply to.
        kind: String,
        /// The defaulted attributes.
        attrs: Vec<Attribute>,
    },

    /// A resource statement. Instantiates a definition if `kind` names
    /// one, otherwise declares a resource in the catalog.
    Resource(ResourceDecl),

    /// Collect exported resources of a kind into the catalog.
    Collect {
        /// The resource kind to collect.
        kind: String,
    },

    /// A statement-position function call, dispatched by name.
    FunctionCall {
        /// The function name.
        name: String,
        /// The argument expressions.
        args: Vec<Expr>,
    },
}

/// A single attribute (name => value) inside a resource or defaults
/// statement.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,
    /// The attribute value expression.
    pub value: Expr,
    /// The source span of this attribute.
    pub span: Span,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>, value: Expr, span: Span) -> Self {
        Self {
            name: name.into(),
            value,
            span,
        }
    }

    /// An attribute with a synthetic span.
    pub fn synthetic(name: impl Into<String>, value: Expr) -> Self {
        Self::new(name, value, Span::synthetic())
    }
}

/// A class definition.
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// The class name.
    pub name: String,
    /// The parent class this class extends, if any.
    pub base: Option<String>,
    /// The class body.
    pub body: Box<Node>,
    /// The source span of the definition.
    pub span: Span,
}

/// A parameterized (non-class) definition.
#[derive(Debug, Clone)]
pub struct DefineDef {
    /// The definition name, usable as a resource kind.
    pub name: String,
    /// The declared parameters.
    pub params: Vec<Param>,
    /// The definition body.
    pub body: Box<Node>,
    /// The source span of the definition.
    pub span: Span,
}

/// A declared parameter of a definition.
#[derive(Debug, Clone)]
pub struct Param {
    /// The parameter name.
    pub name: String,
    /// The default value, used when neither the caller nor a scope
    /// default supplies one.
    pub default: Option<Expr>,
}

impl Param {
    /// A parameter without a default.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter with a default value.
    pub fn with_default(name: impl Into<String>, default: Expr) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// A node (host) definition.
#[derive(Debug, Clone)]
pub struct NodeDecl {
    /// The node name, globally unique per run.
    pub name: String,
    /// The node body.
    pub body: Box<Node>,
    /// The source span of the definition.
    pub span: Span,
}

/// A resource statement.
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    /// The resource kind (type name).
    pub kind: String,
    /// The resource title (instance name).
    pub title: Expr,
    /// The explicitly given attributes.
    pub attrs: Vec<Attribute>,
    /// Whether this declaration is exported for collection.
    pub exported: bool,
    /// The source span of the statement.
    pub span: Span,
}

impl ResourceDecl {
    /// Create a resource statement with a synthetic span.
    pub fn synthetic(kind: impl Into<String>, title: Expr, attrs: Vec<Attribute>) -> Self {
        Self {
            kind: kind.into(),
            title,
            attrs,
            exported: false,
            span: Span::synthetic(),
        }
    }

    /// Mark this statement as exported.
    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            NodeKind::Sequence(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
            NodeKind::VarAssign { name, value } => write!(f, "${} = {}", name, value),
            NodeKind::ClassDef(class) => match &class.base {
                Some(base) => write!(f, "class {} inherits {} {{ .. }}", class.name, base),
                None => write!(f, "class {} {{ .. }}", class.name),
            },
            NodeKind::DefineDef(define) => write!(f, "define {} {{ .. }}", define.name),
            NodeKind::NodeDef(node) => write!(f, "node {} {{ .. }}", node.name),
            NodeKind::Defaults { kind, .. } => write!(f, "{} defaults", kind),
            NodeKind::Resource(resource) => {
                if resource.exported {
                    write!(f, "@{} {{ {}: .. }}", resource.kind, resource.title)
                } else {
                    write!(f, "{} {{ {}: .. }}", resource.kind, resource.title)
                }
            }
            NodeKind::Collect { kind } => write!(f, "{} <||>", kind),
            NodeKind::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
