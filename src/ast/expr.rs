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

//! Expression AST nodes.
//!
//! Expressions are the value-producing side of a manifest: literals,
//! interpolated strings, variable references, and arrays. Evaluation
//! happens in the evaluator against a scope.

use crate::error::Span;

use super::Value;

/// An expression in a manifest.
#[derive(Debug, Clone)]
pub struct Expr {
    /// The kind of expression.
    pub kind: ExprKind,
    /// The source span of this expression.
    pub span: Span,
}

impl Expr {
    /// Create a new expression.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// A literal value with a synthetic span, for programmatic construction.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(ExprKind::Literal(value.into()), Span::synthetic())
    }

    /// An interpolated string with a synthetic span.
    pub fn string(template: impl Into<String>) -> Self {
        Self::new(ExprKind::Str(template.into()), Span::synthetic())
    }

    /// A variable reference with a synthetic span.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Variable(name.into()), Span::synthetic())
    }

    /// An array expression with a synthetic span.
    pub fn array(items: Vec<Expr>) -> Self {
        Self::new(ExprKind::Array(items), Span::synthetic())
    }
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A literal value, emitted as-is.
    Literal(Value),

    /// A double-quoted string, subject to variable interpolation.
    Str(String),

    /// A variable reference (`$name`).
    Variable(String),

    /// An array of expressions.
    Array(Vec<Expr>),
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write!(f, "{}", value),
            ExprKind::Str(template) => write!(f, "\"{}\"", template),
            ExprKind::Variable(name) => write!(f, "${}", name),
            ExprKind::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}
