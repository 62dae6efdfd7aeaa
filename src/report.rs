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

//! Rich diagnostic rendering for compilation errors.
//!
//! Builds an [`ariadne`] report from a [`CompilationError`], labeling the
//! offending span and, for conflicts, the competing statement. The plain
//! [`crate::error::format_error`] remains available where no styled
//! output is wanted.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::error::CompilationError;

fn clamp(range: std::ops::Range<usize>, len: usize) -> std::ops::Range<usize> {
    let start = range.start.min(len);
    let end = range.end.clamp(start, len);
    start..end
}

fn build<'a>(
    error: &CompilationError,
    source: &str,
    filename: &'a str,
    color: bool,
) -> Report<'a, (&'a str, std::ops::Range<usize>)> {
    let span = clamp(error.span.clone().into(), source.len());
    let mut builder = Report::build(ReportKind::Error, filename, span.start)
        .with_config(Config::default().with_color(color))
        .with_code(error.code_str())
        .with_message(&error.message);

    if !source.is_empty() {
        builder = builder.with_label(
            Label::new((filename, span))
                .with_message("declared here")
                .with_color(Color::Red),
        );
        if let Some(related) = &error.related {
            builder = builder.with_label(
                Label::new((filename, clamp(related.clone().into(), source.len())))
                    .with_message("competing statement")
                    .with_color(Color::Yellow),
            );
        }
    }

    if let Some(hint) = &error.hint {
        builder = builder.with_note(hint);
    }

    builder.finish()
}

/// Render an error against its manifest source, without color codes.
pub fn render_to_string(error: &CompilationError, source: &str, filename: Option<&str>) -> String {
    let filename = filename.unwrap_or("<manifest>");
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = build(error, source, filename, false).write((filename, Source::from(source)), &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Print a styled error report to stderr.
pub fn print(error: &CompilationError, source: &str, filename: Option<&str>) {
    let filename = filename.unwrap_or("<manifest>");
    let _ = build(error, source, filename, true).eprint((filename, Source::from(source)));
}
