//! Console narration helpers shared by the demos

use conduit_common::{ErrorKind, Result, ResultExt};
use serde::Serialize;
use std::time::Instant;

/// Print a section header
pub fn header(title: &str) {
    println!("── {title} {}", "─".repeat(40usize.saturating_sub(title.len())));
}

/// Print a `key: value` line
pub fn kv(key: &str, value: impl std::fmt::Display) {
    println!("{key}: {value}");
}

/// Print a success line
pub fn success(text: &str) {
    println!("✔ {text}");
}

/// Print a warning line
pub fn warn(text: &str) {
    println!("! {text}");
}

/// Print an error line
pub fn error(text: &str) {
    println!("✘ {text}");
}

/// Print a left-aligned table
pub fn table(columns: &[&str], rows: &[Vec<String>]) {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    println!("{}", render_row(columns, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", render_row(rule.as_slice(), &widths));
    for row in rows {
        println!("{}", render_row(row.as_slice(), &widths));
    }
}

fn render_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Print each part's share of the total as a bar of `#`
pub fn breakdown(parts: &[(&str, u64)]) {
    const WIDTH: u64 = 40;
    let total: u64 = parts.iter().map(|(_, count)| count).sum();
    let label_width = parts.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, count) in parts {
        let filled = if total == 0 { 0 } else { count * WIDTH / total };
        let bar = "#".repeat(usize::try_from(filled).unwrap_or(0));
        println!("{label:<label_width$}  {bar:<40}  {count}");
    }
}

/// Print `value` as pretty JSON on stdout
///
/// # Errors
///
/// Returns an internal error if `value` cannot be serialized.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .with_kind(ErrorKind::Internal, "serializing report")?;
    println!("{rendered}");
    Ok(())
}

/// Prints how long a scope took when dropped
pub struct Stopwatch {
    label: String,
    started: Instant,
}

impl Stopwatch {
    /// Start timing `label`
    #[must_use]
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        println!("{}: {} ms", self.label, self.started.elapsed().as_millis());
    }
}
