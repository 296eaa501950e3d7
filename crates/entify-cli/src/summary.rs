use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use entify_cli::run::RunOutcome;

/// Print the run summary and recorded errors to stderr, keeping stdout for
/// rendered records.
pub fn print_summary(outcome: &RunOutcome) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Model"),
        header_cell("Input"),
        header_cell("Exported"),
        header_cell("Page"),
        header_cell("Errors"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let page = match &outcome.pagination {
        Some(info) => Cell::new(format!("{}/{}", info.current_page, info.last_page)),
        None => dim_cell("-"),
    };
    table.add_row(vec![
        Cell::new(&outcome.model)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        Cell::new(outcome.input_records),
        Cell::new(outcome.exported_records),
        page,
        count_cell(outcome.errors.len()),
    ]);
    eprintln!("{table}");

    if outcome.has_errors() {
        print_error_table(&outcome.errors);
    }
}

fn print_error_table(errors: &[String]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Message")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, message) in errors.iter().enumerate() {
        table.add_row(vec![dim_cell(index + 1), Cell::new(message).fg(Color::Red)]);
    }
    eprintln!();
    eprintln!("Errors:");
    eprintln!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count).fg(Color::Red).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
