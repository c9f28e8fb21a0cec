use crate::cli::InputFormat;
use crate::config::SheetLayout;
use crate::error::{ReportError, Result};
use crate::sheet_parser::{parse_sheet, ParsedSheet};
use crate::types::Cell;
use crate::util::excel_serial_to_date;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::borrow::Cow;
use std::path::Path;

/// How the input file was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Workbook,
    FlatCsv,
}

#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub kind: SourceKind,
    pub sheets: Vec<ParsedSheet>,
}

/// Pick the reader from the `--format` flag or the file extension.
pub fn detect_kind(path: &Path, format: InputFormat) -> Result<SourceKind> {
    match format {
        InputFormat::Workbook => return Ok(SourceKind::Workbook),
        InputFormat::Csv => return Ok(SourceKind::FlatCsv),
        InputFormat::Auto => {}
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceKind::Workbook),
        "csv" | "txt" => Ok(SourceKind::FlatCsv),
        _ => Err(ReportError::UnsupportedInput {
            path: path.display().to_string(),
            reason: format!(
                "unknown extension {:?}; use --format to choose a reader",
                ext
            ),
        }),
    }
}

pub fn load_input(path: &Path, format: InputFormat, layout: &SheetLayout) -> Result<LoadedInput> {
    let kind = detect_kind(path, format)?;
    let sheets = match kind {
        SourceKind::Workbook => load_workbook(path, layout)?,
        SourceKind::FlatCsv => vec![load_flat_csv(path)?],
    };
    log::info!(
        "Read {} sheet(s) from {} ({} rows)",
        sheets.len(),
        path.display(),
        sheets.iter().map(|s| s.rows.len()).sum::<usize>()
    );
    Ok(LoadedInput { kind, sheets })
}

/// Read every sheet of a workbook and parse it with the daily sheet layout.
pub fn load_workbook(path: &Path, layout: &SheetLayout) -> Result<Vec<ParsedSheet>> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(ReportError::NoSheets);
    }
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        let grid = range_to_grid(&range);
        sheets.push(parse_sheet(&name, &grid, layout));
    }
    Ok(sheets)
}

/// Lay a calamine range out on absolute sheet coordinates.
///
/// calamine trims leading empty rows and columns, but the daily layout is
/// position-based, so the offsets are padded back in.
fn range_to_grid(range: &calamine::Range<Data>) -> Vec<Vec<Cell>> {
    let (row_off, col_off) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); row_off];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_off];
        cells.extend(row.iter().map(data_to_cell));
        grid.push(cells);
    }
    grid
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map_or(Cell::Number(dt.as_f64()), Cell::Date),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|dt| Cell::Date(dt.date()))
            .or_else(|_| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Cell::Date))
            .unwrap_or_else(|_| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Read a flat CSV export (one row per transaction, header on the first
/// line). Every value stays text; the normalizer coerces it. Bytes that are
/// not valid UTF-8 are replaced rather than failing the file.
pub fn load_flat_csv(path: &Path) -> Result<ParsedSheet> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();
    let mut rows = Vec::new();
    let mut lossy_rows = 0usize;
    for result in rdr.byte_records() {
        let record = result?;
        let values: Vec<Cow<str>> = record.iter().map(String::from_utf8_lossy).collect();
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        if values.iter().any(|v| matches!(v, Cow::Owned(_))) {
            lossy_rows += 1;
        }
        rows.push(values.iter().map(|v| Cell::from(v.as_ref())).collect());
    }
    if lossy_rows > 0 {
        log::warn!(
            "{} row(s) in {} contain invalid UTF-8; the bad bytes were replaced",
            lossy_rows,
            path.display()
        );
    }
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("csv")
        .to_string();
    Ok(ParsedSheet {
        name,
        columns,
        rows,
    })
}
