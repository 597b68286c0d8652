//! Plain-text table rendering for `list` and `usage`.

use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Renders a header row followed by `rows` as borderless columns.
///
/// The process columns of `list` vary with configuration, so cells are
/// passed as strings rather than a derived row type.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut builder = Builder::default();
    if !headers.is_empty() {
        builder.push_record(headers.iter().copied());
    }
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    lines(builder.build())
}

/// Renders derived rows, headed by their field names.
#[must_use]
pub fn render_rows<T: Tabled>(rows: impl IntoIterator<Item = T>) -> Vec<String> {
    lines(Table::new(rows))
}

fn lines(mut table: Table) -> Vec<String> {
    table.with(Style::blank());
    table
        .to_string()
        .lines()
        .map(|line| line.trim_end().to_owned())
        .collect()
}
