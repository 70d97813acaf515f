use unicode_width::UnicodeWidthStr;
use wattledger_recon::table::Row;
use wattledger_recon::Table;

use crate::CliError;

/// Widest a column gets in terminal tables.
const MAX_COL_WIDTH: usize = 28;

/// Display width of a string, accounting for accented and double-width chars.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if width < 3 {
        for ch in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if cw <= width {
                return ch.to_string();
            }
        }
        return String::new();
    }

    if display_width(s) <= width {
        return s.to_string();
    }

    // Stop at width - 2 to leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Right-align within `width`; used for figures.
pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - sw), s)
    }
}

/// Aligned plain-text rendering of `headers` and `rows`.
pub(crate) fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|v| display_width(v))
                .chain(std::iter::once(display_width(h)))
                .max()
                .unwrap_or(0)
                .min(MAX_COL_WIDTH)
        })
        .collect();

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad_right(c, *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers);
    out.push('\n');
    out.push_str(&line(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>()));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

/// Render table rows, showing at most `limit` of them.
pub(crate) fn render_table(table: &Table, rows: &[&Row], limit: Option<usize>) -> String {
    let shown = limit.unwrap_or(rows.len()).min(rows.len());
    let grid: Vec<Vec<String>> = rows[..shown]
        .iter()
        .map(|r| r.cells().iter().map(|c| c.to_string()).collect())
        .collect();
    let mut out = render_grid(table.columns(), &grid);
    if shown < rows.len() {
        out.push_str(&format!("... {} more row(s)\n", rows.len() - shown));
    }
    out
}

/// Amount with two decimals and a thin thousands grouping.
pub(crate) fn fmt_amount(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", value.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac}")
}

pub(crate) fn fmt_pct(value: f64) -> String {
    format!("{value:+.1}%")
}

/// Parse repeated `COLUMN=VALUE` arguments.
pub(crate) fn parse_where(clauses: &[String]) -> Result<Vec<(String, String)>, CliError> {
    clauses
        .iter()
        .map(|clause| {
            let (col, val) = clause.split_once('=').ok_or_else(|| {
                CliError::args(format!("invalid --where '{clause}'"))
                    .with_hint("expected COLUMN=VALUE, e.g. --where UC=ABJ")
            })?;
            let col = col.trim();
            if col.is_empty() {
                return Err(CliError::args(format!("invalid --where '{clause}': empty column")));
            }
            Ok((col.to_string(), val.trim().to_string()))
        })
        .collect()
}

/// Reject filter or selection columns the table does not have.
pub(crate) fn check_columns<'a, I>(table: &Table, names: I) -> Result<(), CliError>
where
    I: IntoIterator<Item = &'a String>,
{
    for name in names {
        if !table.has_column(name) {
            return Err(CliError::args(format!("ledger has no column '{name}'"))
                .with_hint(format!("columns: {}", table.columns().join(", "))));
        }
    }
    Ok(())
}
