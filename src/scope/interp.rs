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

//! String interpolation.
//!
//! Replaces unescaped `$name` and `${name}` references in a template with
//! the stringified result of a variable lookup against a scope. A
//! backslash before `$` escapes it, emitting a literal `$`. Interpolation
//! never mutates the scope and an undefined variable interpolates as the
//! empty string.

use super::{ScopeId, ScopeTree};

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Interpolate variable references in `template` using `scope` for
/// lookups.
pub fn interpolate(tree: &ScopeTree, scope: ScopeId, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                // Escaped dollar: literal '$', backslash consumed.
                Some('$') => {
                    chars.next();
                    out.push('$');
                }
                // Escaped backslash.
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            '$' => match chars.peek() {
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if closed {
                        out.push_str(&tree.lookup_variable(scope, &name).to_string());
                    } else {
                        // Unterminated reference is left verbatim.
                        out.push_str("${");
                        out.push_str(&name);
                    }
                }
                Some(c) if is_name_char(*c) => {
                    let mut name = String::new();
                    while let Some(c) = chars.peek() {
                        if is_name_char(*c) {
                            name.push(*c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push_str(&tree.lookup_variable(scope, &name).to_string());
                }
                // A bare '$' with nothing to reference.
                _ => out.push('$'),
            },
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Value;
    use crate::error::Span;

    fn scope_with(vars: &[(&str, &str)]) -> ScopeTree {
        let mut tree = ScopeTree::default();
        let root = tree.root();
        for (name, value) in vars {
            tree.set_variable(root, name, Value::from(*value), &Span::synthetic())
                .unwrap();
        }
        tree
    }

    #[test]
    fn test_braced_reference() {
        let tree = scope_with(&[("test", "value")]);
        assert_eq!(tree.interpolate(tree.root(), "string ${test}"), "string value");
    }

    #[test]
    fn test_multiple_references() {
        let tree = scope_with(&[("test", "value")]);
        assert_eq!(
            tree.interpolate(tree.root(), "string ${test} ${test} ${test}"),
            "string value value value"
        );
        assert_eq!(
            tree.interpolate(tree.root(), "string $test ${test} $test"),
            "string value value value"
        );
    }

    #[test]
    fn test_mixed_forms() {
        let tree = scope_with(&[("x", "v")]);
        assert_eq!(tree.interpolate(tree.root(), "a ${x} b $x c"), "a v b v c");
    }

    #[test]
    fn test_escaped_dollar() {
        let tree = scope_with(&[("test", "value")]);
        assert_eq!(tree.interpolate(tree.root(), "string \\$test"), "string $test");
        assert_eq!(tree.interpolate(tree.root(), "\\$test string"), "$test string");
    }

    #[test]
    fn test_escaped_backslash() {
        let tree = scope_with(&[("x", "v")]);
        assert_eq!(tree.interpolate(tree.root(), "a \\\\$x"), "a \\v");
    }

    #[test]
    fn test_undefined_is_empty() {
        let tree = scope_with(&[]);
        assert_eq!(tree.interpolate(tree.root(), "a ${missing} b"), "a  b");
        assert_eq!(tree.interpolate(tree.root(), "$missing"), "");
    }

    #[test]
    fn test_bare_dollar() {
        let tree = scope_with(&[]);
        assert_eq!(tree.interpolate(tree.root(), "cost: $ 5"), "cost: $ 5");
        assert_eq!(tree.interpolate(tree.root(), "end$"), "end$");
    }

    #[test]
    fn test_unterminated_brace_left_verbatim() {
        let tree = scope_with(&[("x", "v")]);
        assert_eq!(tree.interpolate(tree.root(), "a ${x"), "a ${x");
    }

    #[test]
    fn test_name_boundary() {
        let tree = scope_with(&[("var", "1")]);
        assert_eq!(tree.interpolate(tree.root(), "$var-suffix"), "1-suffix");
        assert_eq!(tree.interpolate(tree.root(), "${var}able"), "1able");
    }

    #[test]
    fn test_parent_scope_lookup() {
        let mut tree = ScopeTree::default();
        let root = tree.root();
        tree.set_variable(root, "outer", Value::from("o"), &Span::synthetic())
            .unwrap();
        let sub = tree.child(root);
        assert_eq!(tree.interpolate(sub, "${outer}"), "o");
    }
}
