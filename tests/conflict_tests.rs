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

//! Conflict policy tests through whole-manifest evaluation.
//!
//! Exercises each branch of the identity conflict policy with the
//! statements arranged the way real manifests arrange them.

use anvil::ast::{Attribute, ClassDef, Expr, Manifest, Node, NodeKind, ResourceDecl, Value};
use anvil::error::{ErrorCode, Span};
use anvil::eval::{Evaluator, ResourceId};
use anvil::scope::ScopeOptions;
use pretty_assertions::assert_eq;

fn file(title: &str, attrs: &[(&str, &str)]) -> Node {
    Node::synthetic(NodeKind::Resource(ResourceDecl::synthetic(
        "file",
        Expr::literal(title),
        attrs
            .iter()
            .map(|(name, value)| Attribute::synthetic(*name, Expr::literal(*value)))
            .collect(),
    )))
}

fn exported_file(title: &str, attrs: &[(&str, &str)]) -> Node {
    Node::synthetic(NodeKind::Resource(
        ResourceDecl::synthetic(
            "file",
            Expr::literal(title),
            attrs
                .iter()
                .map(|(name, value)| Attribute::synthetic(*name, Expr::literal(*value)))
                .collect(),
        )
        .exported(),
    ))
}

fn class(name: &str, base: Option<&str>, body: Vec<Node>) -> Node {
    Node::synthetic(NodeKind::ClassDef(ClassDef {
        name: name.to_string(),
        base: base.map(str::to_string),
        body: Box::new(Node::synthetic(NodeKind::Sequence(body))),
        span: Span::synthetic(),
    }))
}

fn include(name: &str) -> Node {
    Node::synthetic(NodeKind::FunctionCall {
        name: "include".to_string(),
        args: vec![Expr::literal(name)],
    })
}

fn strict() -> ScopeOptions {
    ScopeOptions {
        declarative: true,
        top: true,
    }
}

#[test]
fn strict_top_scope_rejects_restatement() {
    let mut evaluator = Evaluator::new(strict());
    let err = evaluator
        .evaluate(&Manifest::from(vec![
            file("/etc/motd", &[("owner", "root")]),
            file("/etc/motd", &[("mode", "644")]),
        ]))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateResource);
    assert!(err.related.is_some());
}

#[test]
fn lenient_top_scope_merges_restatement() {
    let mut evaluator = Evaluator::default();
    evaluator
        .evaluate(&Manifest::from(vec![
            file("/etc/motd", &[("owner", "root")]),
            file("/etc/motd", &[("owner", "bin"), ("mode", "644")]),
        ]))
        .unwrap();

    let catalog = evaluator.catalog();
    assert_eq!(catalog.len(), 1);
    let merged = catalog.get(&ResourceId::new("file", "/etc/motd")).unwrap();
    assert_eq!(merged.get("owner"), Some(&Value::from("bin")));
    assert_eq!(merged.get("mode"), Some(&Value::from("644")));
}

#[test]
fn strict_top_scope_does_not_restrict_class_scopes() {
    // Only the top scope itself is strict; classes underneath it still
    // get lineage overrides.
    let mut evaluator = Evaluator::new(strict());
    evaluator
        .evaluate(&Manifest::from(vec![
            class("parent", None, vec![file("/tmp/sub", &[("owner", "root")])]),
            class("child", Some("parent"), vec![file("/tmp/sub", &[("owner", "bin")])]),
            include("child"),
        ]))
        .unwrap();
    assert_eq!(evaluator.catalog().len(), 1);
}

#[test]
fn subclass_override_wins_and_fills_nothing_twice() {
    let mut evaluator = Evaluator::default();
    evaluator
        .evaluate(&Manifest::from(vec![
            class(
                "parent",
                None,
                vec![file("/tmp/over", &[("owner", "root"), ("group", "wheel")])],
            ),
            class("child", Some("parent"), vec![file("/tmp/over", &[("owner", "bin")])]),
            include("child"),
        ]))
        .unwrap();

    let catalog = evaluator.catalog();
    assert_eq!(catalog.len(), 1);
    let merged = catalog.get(&ResourceId::new("file", "/tmp/over")).unwrap();
    assert_eq!(merged.get("owner"), Some(&Value::from("bin")));
    // Attributes the child does not restate survive from the parent.
    assert_eq!(merged.get("group"), Some(&Value::from("wheel")));
}

#[test]
fn ancestor_statement_cannot_override_descendant() {
    // The child declares first; a later statement evaluated in the
    // parent's scope may fill gaps but not overwrite.
    let mut evaluator = Evaluator::default();
    evaluator
        .evaluate(&Manifest::from(vec![
            class("parent", None, vec![]),
            class("child", Some("parent"), vec![file("/tmp/asc", &[("owner", "bin")])]),
            include("child"),
        ]))
        .unwrap();

    let span = Span::synthetic();
    let root = evaluator.scopes().root();
    let parent_scope = evaluator.instantiate_class(root, "parent", &span).unwrap();
    evaluator
        .eval_node(
            parent_scope,
            &file("/tmp/asc", &[("owner", "root"), ("mode", "644")]),
        )
        .unwrap();

    let merged = evaluator
        .catalog()
        .get(&ResourceId::new("file", "/tmp/asc"))
        .unwrap();
    assert_eq!(merged.get("owner"), Some(&Value::from("bin")));
    assert_eq!(merged.get("mode"), Some(&Value::from("644")));
}

#[test]
fn lineage_export_disagreement_is_a_conflict() {
    let mut evaluator = Evaluator::default();
    let err = evaluator
        .evaluate(&Manifest::from(vec![
            class("parent", None, vec![file("/tmp/exp", &[("owner", "root")])]),
            class(
                "child",
                Some("parent"),
                vec![exported_file("/tmp/exp", &[("owner", "bin")])],
            ),
            include("child"),
        ]))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExportFlagMismatch);
}

#[test]
fn unrelated_export_disagreement_merges_as_collectable() {
    let mut evaluator = Evaluator::default();
    evaluator
        .evaluate(&Manifest::from(vec![
            class("one", None, vec![exported_file("/tmp/mix", &[("owner", "root")])]),
            class("two", None, vec![file("/tmp/mix", &[("mode", "644")])]),
            include("one"),
            include("two"),
        ]))
        .unwrap();

    let merged = evaluator
        .catalog()
        .get(&ResourceId::new("file", "/tmp/mix"))
        .unwrap();
    assert!(merged.collectable);
    assert_eq!(evaluator.exported("file").len(), 1);
}

#[test]
fn duplicate_class_names_conflict_without_instantiation() {
    let mut evaluator = Evaluator::default();
    let err = evaluator
        .evaluate(&Manifest::from(vec![
            class("camp", None, vec![file("/tmp/a", &[])]),
            class("camp", None, vec![file("/tmp/b", &[])]),
        ]))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateClass);
    assert!(err.related.is_some());
    // Neither body ran.
    assert!(evaluator.catalog().is_empty());
}
