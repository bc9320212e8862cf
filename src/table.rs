use std::borrow::Cow;
use std::fmt::Write as _;

/// Cells longer than this are cut with an ellipsis in console output.
pub const DEFAULT_MAX_CELL_WIDTH: usize = 48;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    render_table_with_width(headers, rows, DEFAULT_MAX_CELL_WIDTH)
}

pub fn render_table_with_width(
    headers: &[String],
    rows: &[Vec<String>],
    max_cell_width: usize,
) -> String {
    let max_cell_width = max_cell_width.max(2);
    let fit = |value: &String| fit_cell(value, max_cell_width).into_owned();
    let headers = headers.iter().map(fit).collect::<Vec<_>>();
    let rows = rows
        .iter()
        .map(|row| row.iter().map(fit).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&headers, &widths));
    let separator = widths
        .iter()
        .map(|w| "-".repeat((*w).max(1)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{value:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn fit_cell(value: &str, max_width: usize) -> Cow<'_, str> {
    let flattened: Cow<'_, str> = if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    };
    if flattened.chars().count() <= max_width {
        return flattened;
    }
    let mut truncated = flattened.chars().take(max_width - 1).collect::<String>();
    truncated.push('…');
    Cow::Owned(truncated)
}
