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

//! Error types for the Anvil compiler core.
//!
//! This module defines the single error taxonomy used throughout the
//! evaluator: every failure mode (duplicate assignments, duplicate
//! registrations, identity conflicts, bad function calls) surfaces as a
//! [`CompilationError`] and aborts the run.

use std::ops::Range;
use thiserror::Error;

/// A source span representing a range in the manifest source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a span from a range.
    pub fn from_range(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }

    /// A zero-width span for nodes synthesized without source text.
    pub fn synthetic() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Get the length of this span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::from_range(range)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// Error codes for the compiler core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Scope errors (E001-E010)
    DuplicateAssignment,
    DuplicateDefault,
    DuplicateNode,
    InvalidName,

    // Registration errors (E100-E101)
    DuplicateClass,
    DuplicateDefinition,

    // Identity conflicts (E200-E202)
    DuplicateResource,
    ExportFlagMismatch,
    SelfInheritance,

    // Evaluation errors (E300-E304)
    UnknownFunction,
    UnknownClass,
    WrongNumberOfArguments,
    InvalidArgument,
    InstantiationCycle,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            // Scope errors
            ErrorCode::DuplicateAssignment => "E001",
            ErrorCode::DuplicateDefault => "E002",
            ErrorCode::DuplicateNode => "E003",
            ErrorCode::InvalidName => "E004",

            // Registration errors
            ErrorCode::DuplicateClass => "E100",
            ErrorCode::DuplicateDefinition => "E101",

            // Identity conflicts
            ErrorCode::DuplicateResource => "E200",
            ErrorCode::ExportFlagMismatch => "E201",
            ErrorCode::SelfInheritance => "E202",

            // Evaluation errors
            ErrorCode::UnknownFunction => "E300",
            ErrorCode::UnknownClass => "E301",
            ErrorCode::WrongNumberOfArguments => "E302",
            ErrorCode::InvalidArgument => "E303",
            ErrorCode::InstantiationCycle => "E304",
        }
    }
}

/// A compilation error with source location.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct CompilationError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// The source span where the error occurred.
    pub span: Span,
    /// The span of the competing statement, for conflicts.
    pub related: Option<Span>,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl CompilationError {
    /// Create a new compilation error.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            related: None,
            hint: None,
        }
    }

    /// Attach the span of the competing statement.
    pub fn with_related(mut self, span: Span) -> Self {
        self.related = Some(span);
        self
    }

    /// Add a hint to this error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Get the error code string.
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, CompilationError>;

/// Source location with line and column information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// The content of the line.
    pub line_content: String,
}

impl SourceLocation {
    /// Calculate line and column from a byte offset in source code.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];

        let line = before.chars().filter(|&c| c == '\n').count() + 1;

        let last_newline = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[last_newline..].chars().count() + 1;

        // Extract the line content
        let line_start = last_newline;
        let line_end = source[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or(source.len());
        let line_content = source[line_start..line_end].to_string();

        Self {
            line,
            column,
            line_content,
        }
    }
}

/// Format an error with source context.
pub fn format_error(error: &CompilationError, source: &str, filename: Option<&str>) -> String {
    let loc = SourceLocation::from_offset(source, error.span.start);
    let filename = filename.unwrap_or("<manifest>");

    let mut output = String::new();

    // Error header
    output.push_str(&format!("error[{}]: {}\n", error.code_str(), error.message));

    // Location
    output.push_str(&format!("  --> {}:{}:{}\n", filename, loc.line, loc.column));

    // Source context
    let line_num_width = loc.line.to_string().len();
    output.push_str(&format!("{:>width$} |\n", "", width = line_num_width));
    output.push_str(&format!(
        "{:>width$} | {}\n",
        loc.line,
        loc.line_content,
        width = line_num_width
    ));

    // Underline the error span
    let underline_start = loc.column - 1;
    let underline_len = (error.span.end - error.span.start)
        .max(1)
        .min(loc.line_content.len().saturating_sub(underline_start))
        .max(1);
    output.push_str(&format!(
        "{:>width$} | {:>start$}{}\n",
        "",
        "",
        "^".repeat(underline_len),
        width = line_num_width,
        start = underline_start
    ));

    // Hint if available
    if let Some(hint) = &error.hint {
        output.push_str(&format!(
            "{:>width$} = hint: {}\n",
            "",
            hint,
            width = line_num_width
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let span = Span::new(10, 20);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
    }

    #[test]
    fn test_span_merge() {
        let span1 = Span::new(5, 10);
        let span2 = Span::new(15, 20);
        let merged = span1.merge(&span2);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 20);
    }

    #[test]
    fn test_error_code() {
        assert_eq!(ErrorCode::DuplicateAssignment.code(), "E001");
        assert_eq!(ErrorCode::DuplicateClass.code(), "E100");
        assert_eq!(ErrorCode::DuplicateResource.code(), "E200");
        assert_eq!(ErrorCode::UnknownFunction.code(), "E300");
        assert_eq!(ErrorCode::InstantiationCycle.code(), "E304");
    }

    #[test]
    fn test_compilation_error() {
        let error = CompilationError::new(
            ErrorCode::DuplicateResource,
            "Duplicate declaration of file[/etc/motd]",
            Span::new(0, 3),
        )
        .with_related(Span::new(10, 13))
        .with_hint("Remove one of the statements or move it into a subclass");

        assert_eq!(error.code_str(), "E200");
        assert!(error.related.is_some());
        assert!(error.hint.is_some());
    }

    #[test]
    fn test_format_error_renders_context() {
        let source = "class base {\n  $owner = \"root\"\n}\n";
        let error = CompilationError::new(
            ErrorCode::DuplicateAssignment,
            "Cannot reassign variable 'owner' in this scope",
            Span::new(15, 21),
        )
        .with_hint("Variables are assign-once within a scope");

        let rendered = format_error(&error, source, Some("site.anv"));
        assert!(rendered.contains("error[E001]: Cannot reassign variable 'owner' in this scope"));
        assert!(rendered.contains("--> site.anv:2:3"));
        assert!(rendered.contains("  $owner = \"root\""));
        assert!(rendered.contains("^^^^^^"));
        assert!(rendered.contains("hint: Variables are assign-once within a scope"));
    }

    #[test]
    fn test_format_error_default_filename() {
        let error =
            CompilationError::new(ErrorCode::UnknownFunction, "Unknown function 'f'", Span::new(0, 1));
        let rendered = format_error(&error, "f()\n", None);
        assert!(rendered.contains("--> <manifest>:1:1"));
    }

    #[test]
    fn test_source_location() {
        let source = "class base {\n  $owner = \"root\"\n}\n";
        let loc = SourceLocation::from_offset(source, 15);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 3);
        assert_eq!(loc.line_content, "  $owner = \"root\"");
    }
}
