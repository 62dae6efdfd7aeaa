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

//! Anvil Compiler Core
//!
//! This library compiles a declarative infrastructure manifest, consumed
//! as a typed syntax tree produced by an external parser, into a flat,
//! conflict-free catalog of resource declarations ready for enforcement.
//!
//! # Modules
//!
//! - [`error`] - Error types and plain error formatting
//! - [`report`] - Styled diagnostic rendering
//! - [`ast`] - Syntax tree and value definitions
//! - [`scope`] - The scope tree: variables, defaults, tags, interpolation
//! - [`eval`] - The evaluator, conflict policy, catalog, and exports
//!
//! # Example
//!
//! ```
//! use anvil::ast::{Attribute, Expr, Manifest, Node, NodeKind, ResourceDecl};
//! use anvil::scope::ScopeOptions;
//!
//! let manifest = Manifest::from(vec![Node::synthetic(NodeKind::Resource(
//!     ResourceDecl::synthetic(
//!         "file",
//!         Expr::literal("/etc/motd"),
//!         vec![Attribute::synthetic("owner", Expr::literal("root"))],
//!     ),
//! ))]);
//!
//! let catalog = anvil::compile(&manifest, ScopeOptions::default()).unwrap();
//! assert_eq!(catalog.len(), 1);
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod report;
pub mod scope;

// Re-export commonly used types
pub use ast::{Manifest, Value};
pub use error::{format_error, CompilationError, ErrorCode, Result, SourceLocation, Span};
pub use eval::{Catalog, Evaluator, Resource, ResourceId};
pub use scope::{ScopeId, ScopeOptions, ScopeTree};

/// The version of the Anvil compiler core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the compiler.
pub const NAME: &str = "Anvil";

/// Compile a manifest into a catalog.
///
/// This is the main entry point: it builds a fresh evaluator with a root
/// scope configured by `options`, evaluates the whole manifest, and
/// returns the resulting catalog. A [`CompilationError`] aborts the run;
/// no partial catalog is returned.
pub fn compile(manifest: &Manifest, options: ScopeOptions) -> Result<Catalog> {
    let mut evaluator = Evaluator::new(options);
    evaluator.evaluate(manifest)?;
    Ok(evaluator.into_catalog())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "Anvil");
    }

    #[test]
    fn test_compile_empty_manifest() {
        let catalog = compile(&Manifest::new(), ScopeOptions::default()).unwrap();
        assert!(catalog.is_empty());
    }
}
