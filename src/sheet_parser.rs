// Turns one raw daily sales sheet into a flat table.
//
// The sheets are position-based: a date cell near the top, two header rows
// that together name the columns, then the room rows. A marker row (by
// default "Function Room") starts a non-room section, and everything from
// there down is discarded. All positions come from `SheetLayout`.
//
// Nothing in here fails. A bad date gives a `None` date, a sheet too short
// to have headers gives a table with only the `Date` column, and so on.

use chrono::NaiveDate;

use crate::config::SheetLayout;
use crate::types::Cell;
use crate::util::{excel_serial_to_date, parse_date_dayfirst};

/// Header name of the synthesized reporting-date column.
pub const DATE_COLUMN: &str = "Date";

static EMPTY_CELL: Cell = Cell::Empty;

/// A named-column table extracted from one sheet (or one flat CSV file).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ParsedSheet {
    /// Index of the first column named exactly `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

fn grid_cell(grid: &[Vec<Cell>], row: usize, col: usize) -> &Cell {
    grid.get(row)
        .and_then(|r| r.get(col))
        .unwrap_or(&EMPTY_CELL)
}

/// Interpret a cell as a date: real date cells as-is, numbers as
/// spreadsheet serials, text day-first.
pub fn cell_to_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Text(s) => parse_date_dayfirst(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Build column headers from the two header rows.
///
/// Returns one entry per physical column; `None` marks a column whose main
/// and sub labels are both empty, which is dropped from the output.
pub fn combine_headers(main: &[Cell], sub: &[Cell]) -> Vec<Option<String>> {
    let width = main.len().max(sub.len());
    (0..width)
        .map(|i| {
            let main = main.get(i).map(Cell::to_text).unwrap_or_default();
            let sub = sub.get(i).map(Cell::to_text).unwrap_or_default();
            let (main, sub) = (main.trim(), sub.trim());
            match (main.is_empty(), sub.is_empty()) {
                (true, true) => None,
                (_, false) => Some(format!("{} ({})", main, sub)),
                (false, true) => Some(main.to_string()),
            }
        })
        .collect()
}

/// Parse one sheet grid according to `layout`.
pub fn parse_sheet(name: &str, grid: &[Vec<Cell>], layout: &SheetLayout) -> ParsedSheet {
    let date_cell = grid_cell(grid, layout.date_row, layout.date_col);
    let sheet_date = cell_to_date(date_cell);
    if sheet_date.is_none() {
        log::warn!(
            "Sheet '{}': date cell {:?} is not a date; its rows will have no date",
            name,
            date_cell.to_text()
        );
    }

    let empty = Vec::new();
    let main = grid.get(layout.main_header_row).unwrap_or(&empty);
    let sub = grid.get(layout.sub_header_row).unwrap_or(&empty);
    let headers = combine_headers(main, sub);

    // (physical column, header) for every column that survives.
    let kept: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.as_deref().map(|h| (i, h)))
        .filter(|(_, h)| *h != DATE_COLUMN)
        .collect();

    let body = grid.get(layout.data_start_row..).unwrap_or(&[]);
    let marker_col = kept
        .iter()
        .find(|(_, h)| h.contains(layout.marker_column.as_str()))
        .map(|(i, _)| *i);
    let end = marker_col
        .and_then(|col| {
            body.iter().position(|row| {
                row.get(col).and_then(Cell::as_str) == Some(layout.marker_value.as_str())
            })
        })
        .unwrap_or(body.len());
    if end < body.len() {
        log::debug!(
            "Sheet '{}': '{}' found, dropping {} trailing rows",
            name,
            layout.marker_value,
            body.len() - end
        );
    }

    let date_value = sheet_date.map_or(Cell::Empty, Cell::Date);
    let rows: Vec<Vec<Cell>> = body[..end]
        .iter()
        .map(|row| {
            let mut out = Vec::with_capacity(kept.len() + 1);
            out.push(date_value.clone());
            out.extend(
                kept.iter()
                    .map(|(i, _)| row.get(*i).cloned().unwrap_or(Cell::Empty)),
            );
            out
        })
        .collect();

    let mut columns = Vec::with_capacity(kept.len() + 1);
    columns.push(DATE_COLUMN.to_string());
    columns.extend(kept.iter().map(|(_, h)| h.to_string()));

    log::debug!(
        "Sheet '{}': date {:?}, {} columns, {} rows",
        name,
        sheet_date,
        columns.len(),
        rows.len()
    );

    ParsedSheet {
        name: name.to_string(),
        columns,
        rows,
    }
}
