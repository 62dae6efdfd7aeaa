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

//! The identity conflict policy.
//!
//! When a second statement names an already-declared `(kind, title)`
//! identity, this module decides whether the statements merge, which
//! side's attributes win, or whether compilation must abort:
//!
//! 1. Same owning scope and that scope is strict: always a conflict.
//! 2. Owning scopes connected by class lineage: a legal override, the
//!    lineage-descendant's attributes winning. A disagreement on the
//!    collectable flag is a conflict despite lineage.
//! 3. Unrelated scopes (or the same non-strict scope): the statements
//!    merge, the later one's attributes winning; the merged declaration
//!    is collectable if either side was.

use crate::error::{CompilationError, ErrorCode, Result};
use crate::scope::ScopeTree;

use super::catalog::Resource;

/// Whose attributes win when two declarations combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOrder {
    /// The new statement's attributes overwrite the existing ones.
    CandidateWins,
    /// The existing declaration's attributes are kept; the candidate
    /// only fills in attributes it alone mentions.
    ExistingWins,
}

/// The outcome of a legal duplicate statement.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    /// Whose attributes win.
    pub order: MergeOrder,
    /// The collectable flag of the combined declaration.
    pub collectable: bool,
}

/// Decide how a candidate declaration combines with an existing one of
/// the same identity, or fail with the conflict error.
pub fn resolve(tree: &ScopeTree, existing: &Resource, candidate: &Resource) -> Result<Resolution> {
    // Case 1: strict scopes forbid any restatement within themselves.
    if existing.origin == candidate.origin && tree.is_top(candidate.origin) {
        return Err(CompilationError::new(
            ErrorCode::DuplicateResource,
            format!("Duplicate declaration of {}", candidate.id()),
            candidate.span.clone(),
        )
        .with_related(existing.span.clone())
        .with_hint("A strict scope allows only one statement per resource identity"));
    }

    // Case 2: class lineage grants override rights.
    if tree.in_lineage(existing.origin, candidate.origin) {
        if existing.collectable != candidate.collectable {
            return Err(CompilationError::new(
                ErrorCode::ExportFlagMismatch,
                format!(
                    "Cannot override {}: declarations disagree on export",
                    candidate.id()
                ),
                candidate.span.clone(),
            )
            .with_related(existing.span.clone()));
        }
        let order = if tree.inherits_from(candidate.origin, existing.origin) {
            MergeOrder::CandidateWins
        } else {
            MergeOrder::ExistingWins
        };
        return Ok(Resolution {
            order,
            collectable: existing.collectable,
        });
    }

    // Case 3: unrelated statements merge, later one winning.
    Ok(Resolution {
        order: MergeOrder::CandidateWins,
        collectable: existing.collectable || candidate.collectable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Span;
    use crate::scope::{ScopeId, ScopeOptions};

    fn resource(origin: ScopeId) -> Resource {
        Resource::new("file", "/etc/motd", origin, Span::synthetic())
    }

    #[test]
    fn test_same_strict_scope_conflicts() {
        let tree = ScopeTree::new(ScopeOptions {
            declarative: true,
            top: true,
        });
        let root = tree.root();

        let err = resolve(&tree, &resource(root), &resource(root)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateResource);
        assert!(err.related.is_some());
    }

    #[test]
    fn test_same_lenient_scope_merges() {
        let tree = ScopeTree::default();
        let root = tree.root();

        let resolution = resolve(&tree, &resource(root), &resource(root)).unwrap();
        assert_eq!(resolution.order, MergeOrder::CandidateWins);
    }

    #[test]
    fn test_lineage_child_wins() {
        let mut tree = ScopeTree::default();
        let top = tree.root();
        let parent = tree.child_for_class(top, None, "parent");
        let child = tree.child_for_class(top, Some(parent), "child");

        // Parent declared first, child restates: child wins.
        let resolution = resolve(&tree, &resource(parent), &resource(child)).unwrap();
        assert_eq!(resolution.order, MergeOrder::CandidateWins);

        // Statement order reversed: the descendant still wins.
        let resolution = resolve(&tree, &resource(child), &resource(parent)).unwrap();
        assert_eq!(resolution.order, MergeOrder::ExistingWins);
    }

    #[test]
    fn test_lineage_transitive() {
        let mut tree = ScopeTree::default();
        let top = tree.root();
        let a = tree.child_for_class(top, None, "a");
        let b = tree.child_for_class(top, Some(a), "b");
        let c = tree.child_for_class(top, Some(b), "c");

        let resolution = resolve(&tree, &resource(a), &resource(c)).unwrap();
        assert_eq!(resolution.order, MergeOrder::CandidateWins);
    }

    #[test]
    fn test_lineage_export_mismatch_conflicts() {
        let mut tree = ScopeTree::default();
        let top = tree.root();
        let parent = tree.child_for_class(top, None, "parent");
        let child = tree.child_for_class(top, Some(parent), "child");

        let mut exported = resource(parent);
        exported.collectable = true;

        let err = resolve(&tree, &exported, &resource(child)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExportFlagMismatch);
    }

    #[test]
    fn test_unrelated_scopes_merge() {
        let mut tree = ScopeTree::default();
        let top = tree.root();
        let one = tree.child_for_class(top, None, "one");
        let two = tree.child_for_class(top, None, "two");

        let resolution = resolve(&tree, &resource(one), &resource(two)).unwrap();
        assert_eq!(resolution.order, MergeOrder::CandidateWins);
        assert!(!resolution.collectable);
    }

    #[test]
    fn test_unrelated_merge_keeps_export_flag() {
        let mut tree = ScopeTree::default();
        let top = tree.root();
        let one = tree.child_for_class(top, None, "one");
        let two = tree.child_for_class(top, None, "two");

        let mut exported = resource(one);
        exported.collectable = true;

        let resolution = resolve(&tree, &exported, &resource(two)).unwrap();
        assert!(resolution.collectable);
    }
}
