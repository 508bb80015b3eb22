//! Plain-text rendering of a [`RecordTable`] for previews.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::records::RecordTable;

/// Renders column names, their types, a separator, then up to `limit` rows.
/// Nulls show as empty cells.
pub fn render_records(table: &RecordTable, limit: usize) -> String {
    let headers = table
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .collect::<Vec<_>>();
    let types = table
        .columns()
        .iter()
        .map(|c| c.datatype.to_string())
        .collect::<Vec<_>>();
    let rows = table
        .rows()
        .iter()
        .take(limit)
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    render_table(&headers, Some(types.as_slice()), &rows)
}

pub fn render_table(
    headers: &[String],
    types: Option<&[String]>,
    rows: &[Vec<String>],
) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    let measured = types.into_iter().chain(rows.iter().map(Vec::as_slice));
    for line in measured {
        for (idx, cell) in line.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    if let Some(types) = types {
        let _ = writeln!(output, "{}", format_row(types, &widths));
    }
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
