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

//! Scope tree integration tests.
//!
//! These exercise the public scope API the way the evaluator uses it:
//! deep chains, shadowing, defaults accumulation, the shared node and
//! tag registries, and the context stack discipline.

use anvil::ast::{Node, NodeDecl, NodeKind, Value};
use anvil::error::{CompilationError, ErrorCode, Span};
use anvil::scope::{ScopeOptions, ScopeTree};
use pretty_assertions::assert_eq;

fn span() -> Span {
    Span::synthetic()
}

fn lenient() -> ScopeTree {
    ScopeTree::new(ScopeOptions {
        declarative: false,
        top: false,
    })
}

#[test]
fn variables_recurse_up_the_tree() {
    let mut tree = lenient();
    let mut scope = tree.root();
    let mut scopes = vec![scope];
    let mut overrides = Vec::new();

    // Build a ten-deep chain, each level defining its own variable and
    // overriding a shared one.
    for index in 0..10 {
        scope = tree.child(scope);
        scopes.push(scope);

        tree.set_variable(scope, &format!("var{}", index), Value::from(format!("v{}", index)), &span())
            .unwrap();

        let over = format!("over{}", index);
        tree.set_variable(scope, "over", Value::from(over.clone()), &span())
            .unwrap();
        overrides.push(over);
    }

    for index in 0..10 {
        let name = format!("var{}", index);
        let defining = scopes[index + 1];

        // Visible from the bottom of the chain.
        assert_eq!(
            tree.lookup_variable(scope, &name),
            Value::from(format!("v{}", index))
        );

        // The deepest override wins from the bottom.
        assert_eq!(
            tree.lookup_variable(scope, "over"),
            Value::from(overrides.last().unwrap().clone())
        );

        // Invisible above the defining scope.
        let parent = tree.parent(defining).unwrap();
        assert_eq!(tree.lookup_variable(parent, &name), Value::empty());

        // Each scope sees its own override.
        assert_eq!(
            tree.lookup_variable(defining, "over"),
            Value::from(overrides[index].clone())
        );
    }
}

#[test]
fn undefined_variable_is_the_empty_string() {
    let tree = ScopeTree::default();
    assert_eq!(tree.lookup_variable(tree.root(), "missing"), Value::empty());
}

#[test]
fn defaults_accumulate_without_disturbing_parents() {
    let mut tree = ScopeTree::default();
    let top = tree.root();
    let mid = tree.child(top);
    let leaf = tree.child(mid);

    tree.set_default(top, "file", "group", Value::from("wheel"), &span()).unwrap();
    tree.set_default(mid, "file", "owner", Value::from("root"), &span()).unwrap();
    tree.set_default(leaf, "file", "owner", Value::from("bin"), &span()).unwrap();
    tree.set_default(leaf, "file", "mode", Value::from("644"), &span()).unwrap();

    let leaf_view = tree.lookup_defaults(leaf, "file");
    assert_eq!(leaf_view.get("group"), Some(&Value::from("wheel")));
    assert_eq!(leaf_view.get("owner"), Some(&Value::from("bin")));
    assert_eq!(leaf_view.get("mode"), Some(&Value::from("644")));

    // The parent's view is unchanged by the leaf's additions.
    let mid_view = tree.lookup_defaults(mid, "file");
    assert_eq!(mid_view.get("owner"), Some(&Value::from("root")));
    assert_eq!(mid_view.get("mode"), None);

    // Other kinds are untouched.
    assert!(tree.lookup_defaults(leaf, "user").is_empty());
}

#[test]
fn node_registry_is_shared_across_deep_branches() {
    let mut tree = ScopeTree::default();
    let top = tree.root();

    // Two independent deep branches.
    let mut left = top;
    let mut right = top;
    for _ in 0..4 {
        left = tree.child(left);
        right = tree.child(right);
    }

    let decl = |name: &str| NodeDecl {
        name: name.to_string(),
        body: Box::new(Node::synthetic(NodeKind::Sequence(Vec::new()))),
        span: span(),
    };

    tree.set_node(decl("testing")).unwrap();

    let err = tree.set_node(decl("testing")).unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateNode);

    // Visible from everywhere, including the root.
    assert!(tree.lookup_node("testing").is_some());
}

#[test]
fn tags_are_global_to_the_run() {
    let mut tree = ScopeTree::default();
    tree.tag("yayness", &span()).unwrap();
    tree.tag("booness", &span()).unwrap();

    assert!(tree.is_tagged("yayness"));
    assert!(tree.is_tagged("booness"));
    assert!(!tree.is_tagged("funtest"));

    let mut tags: Vec<&str> = tree.tags().collect();
    tags.sort_unstable();
    assert_eq!(tags, vec!["booness", "yayness"]);
}

#[test]
fn context_reverts_after_body_and_after_failure() {
    let mut tree = ScopeTree::default();

    tree.with_context(Value::from("one"), |tree| {
        assert_eq!(tree.current_context(), Some(&Value::from("one")));

        // A failing inner body must restore the outer context.
        let inner: anvil::Result<()> = tree.with_context(Value::from("two"), |_| {
            Err(CompilationError::new(
                ErrorCode::InvalidArgument,
                "a failure",
                Span::synthetic(),
            ))
        });
        assert!(inner.is_err());
        assert_eq!(tree.current_context(), Some(&Value::from("one")));
        Ok(())
    })
    .unwrap();

    assert_eq!(tree.current_context(), None);
}

#[test]
fn interpolation_uses_the_invoking_scope() {
    let mut tree = ScopeTree::default();
    let root = tree.root();
    tree.set_variable(root, "domain", Value::from("example.com"), &span())
        .unwrap();

    let sub = tree.child(root);
    tree.set_variable(sub, "host", Value::from("web01"), &span())
        .unwrap();

    assert_eq!(tree.interpolate(sub, "${host}.${domain}"), "web01.example.com");
    // The parent cannot see the child's variable.
    assert_eq!(tree.interpolate(root, "${host}.${domain}"), ".example.com");
}
