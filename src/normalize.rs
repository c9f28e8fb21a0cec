use crate::config::ColumnNames;
use crate::error::{ReportError, Result};
use crate::sheet_parser::{cell_to_date, ParsedSheet};
use crate::taxonomy::RoomTaxonomy;
use crate::types::{Cell, StayRecord};
use crate::util::{format_int, parse_f64_safe};
use std::collections::BTreeMap;

/// Counts collected while normalizing, reported once at the end of the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub total_rows: usize,
    pub dated_rows: usize,
    pub undated_rows: usize,
    pub blank_rows: usize,
    /// Particulars with no taxonomy entry, with how many rows used each.
    pub unmapped: BTreeMap<String, usize>,
}

impl NormalizeReport {
    pub fn unmapped_count(&self) -> usize {
        self.unmapped.values().sum()
    }

    /// Emit the unmapped-identifier warning. Called once per run.
    pub fn log_warnings(&self) {
        if !self.unmapped.is_empty() {
            let list: Vec<String> = self
                .unmapped
                .iter()
                .map(|(id, n)| format!("{} (x{})", id, n))
                .collect();
            log::warn!(
                "{} record(s) have no room mapping and were left out of the report: {}",
                format_int(self.unmapped_count()),
                list.join(", ")
            );
        }
        if self.undated_rows > 0 {
            log::warn!(
                "{} record(s) have no valid date and were left out of the daily tables",
                format_int(self.undated_rows)
            );
        }
    }
}

struct SheetColumns {
    date: Option<usize>,
    particulars: Option<usize>,
    rooms: Option<usize>,
    rates: Option<usize>,
}

/// Room count: non-negative whole number, 0 when unreadable.
fn coerce_rooms(cell: &Cell) -> u32 {
    let value = match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => parse_f64_safe(Some(s)),
        _ => None,
    };
    match value {
        Some(v) if v > 0.0 => v.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Room rate: non-negative amount, 0 when unreadable.
fn coerce_rate(cell: &Cell) -> f64 {
    let value = match cell {
        Cell::Number(n) => Some(*n),
        Cell::Text(s) => parse_f64_safe(Some(s)),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Merge all parsed sheets into stay records joined with the taxonomy.
///
/// A required column must exist in at least one sheet; otherwise the input
/// is structurally wrong and the run stops. Sheets that lack a column
/// which others have simply get empty values for it.
pub fn normalize(
    sheets: &[ParsedSheet],
    taxonomy: &RoomTaxonomy,
    names: &ColumnNames,
) -> Result<(Vec<StayRecord>, NormalizeReport)> {
    let layouts: Vec<SheetColumns> = sheets
        .iter()
        .map(|s| SheetColumns {
            date: s.column_index(&names.date),
            particulars: s.column_index(&names.particulars),
            rooms: s.column_index(&names.rooms),
            rates: s.column_index(&names.rates),
        })
        .collect();

    let required: [(&str, fn(&SheetColumns) -> Option<usize>); 4] = [
        (names.particulars.as_str(), |c| c.particulars),
        (names.rooms.as_str(), |c| c.rooms),
        (names.rates.as_str(), |c| c.rates),
        (names.date.as_str(), |c| c.date),
    ];
    for (column, get) in required {
        if !layouts.iter().any(|c| get(c).is_some()) {
            return Err(ReportError::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    let mut report = NormalizeReport::default();
    let mut records = Vec::new();
    for (sheet, cols) in sheets.iter().zip(&layouts) {
        let empty = Cell::Empty;
        for row_idx in 0..sheet.rows.len() {
            let get = |col: Option<usize>| col.map_or(&empty, |c| sheet.cell(row_idx, c));

            let particulars = get(cols.particulars).to_text().trim().to_string();
            let date = cell_to_date(get(cols.date));
            let rooms_occupied = coerce_rooms(get(cols.rooms));
            let room_rate_amount = coerce_rate(get(cols.rates));

            let mapping = taxonomy.lookup(&particulars);
            report.total_rows += 1;
            if date.is_some() {
                report.dated_rows += 1;
            } else {
                report.undated_rows += 1;
            }
            if particulars.is_empty() {
                report.blank_rows += 1;
            } else if mapping.is_none() {
                *report.unmapped.entry(particulars.clone()).or_insert(0) += 1;
            }

            records.push(StayRecord {
                date,
                particulars,
                rooms_occupied,
                room_rate_amount,
                room_type: mapping.map(|m| m.room_type.clone()),
                room_group: mapping.map(|m| m.group.clone()),
            });
        }
    }

    log::info!(
        "Normalized {} records ({} dated, {} unmapped, {} blank)",
        format_int(report.total_rows),
        format_int(report.dated_rows),
        format_int(report.unmapped_count()),
        format_int(report.blank_rows)
    );
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::RoomMapping;
    use chrono::NaiveDate;

    fn taxonomy() -> RoomTaxonomy {
        RoomTaxonomy::new(vec![
            RoomMapping {
                id: "Room 201A".to_string(),
                room_type: "Deluxe Studio Room".to_string(),
                group: "Pamana".to_string(),
            },
            RoomMapping {
                id: "Room 201C".to_string(),
                room_type: "Double Room".to_string(),
                group: "Annex".to_string(),
            },
        ])
        .unwrap()
    }

    fn sheet(columns: &[&str], rows: Vec<Vec<Cell>>) -> ParsedSheet {
        ParsedSheet {
            name: "test".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    fn text(s: &str) -> Cell {
        Cell::from(s)
    }

    const COLUMNS: &[&str] = &["Date", "Particulars", "No. of Rooms", "Rooms Rates"];

    #[test]
    fn test_join_and_coercion() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let input = sheet(
            COLUMNS,
            vec![
                vec![Cell::Date(d), text("  Room 201A "), Cell::Number(1.0), text("1,500.00")],
                vec![text("06/03/2024"), text("Room 201C"), text("2.7"), Cell::Number(-5.0)],
            ],
        );
        let (records, report) = normalize(&[input], &taxonomy(), &ColumnNames::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].particulars, "Room 201A");
        assert_eq!(records[0].room_type.as_deref(), Some("Deluxe Studio Room"));
        assert_eq!(records[0].room_rate_amount, 1500.0);
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 3, 6));
        assert_eq!(records[1].rooms_occupied, 2);
        assert_eq!(records[1].room_rate_amount, 0.0);
        assert_eq!(records[1].room_group.as_deref(), Some("Annex"));
        assert_eq!(report.unmapped_count(), 0);
        assert_eq!(report.dated_rows, 2);
    }

    #[test]
    fn test_unparsable_values_become_zero() {
        let input = sheet(
            COLUMNS,
            vec![vec![text("05/03/2024"), text("Room 201A"), text("one"), text("TBA")]],
        );
        let (records, _) = normalize(&[input], &taxonomy(), &ColumnNames::default()).unwrap();

        assert_eq!(records[0].rooms_occupied, 0);
        assert_eq!(records[0].room_rate_amount, 0.0);
    }

    #[test]
    fn test_unmapped_identifier_is_kept_and_counted() {
        let input = sheet(
            COLUMNS,
            vec![
                vec![text("05/03/2024"), text("Room 999"), text("1"), text("800")],
                vec![text("05/03/2024"), text(""), text(""), text("")],
            ],
        );
        let (records, report) = normalize(&[input], &taxonomy(), &ColumnNames::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].room_type, None);
        assert_eq!(records[0].room_group, None);
        assert_eq!(report.unmapped_count(), 1);
        assert_eq!(report.unmapped.get("Room 999"), Some(&1));
        assert_eq!(report.blank_rows, 1);
    }

    #[test]
    fn test_bad_date_is_null_not_fatal() {
        let input = sheet(
            COLUMNS,
            vec![vec![text("31/31/2024"), text("Room 201A"), text("1"), text("800")]],
        );
        let (records, report) = normalize(&[input], &taxonomy(), &ColumnNames::default()).unwrap();

        assert_eq!(records[0].date, None);
        assert_eq!(report.undated_rows, 1);
    }

    #[test]
    fn test_numeric_particulars_are_stringified() {
        let input = sheet(
            COLUMNS,
            vec![vec![text("05/03/2024"), Cell::Number(201.0), text("1"), text("")]],
        );
        let (records, report) = normalize(&[input], &taxonomy(), &ColumnNames::default()).unwrap();

        assert_eq!(records[0].particulars, "201");
        assert_eq!(report.unmapped.get("201"), Some(&1));
    }

    #[test]
    fn test_missing_rates_column_is_structural() {
        let input = sheet(
            &["Date", "Particulars", "No. of Rooms"],
            vec![vec![text("05/03/2024"), text("Room 201A"), text("1")]],
        );
        let err = normalize(&[input], &taxonomy(), &ColumnNames::default()).unwrap_err();
        match err {
            ReportError::MissingColumn { column } => assert_eq!(column, "Rooms Rates"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_missing_from_one_sheet_degrades() {
        let full = sheet(
            COLUMNS,
            vec![vec![text("05/03/2024"), text("Room 201A"), text("1"), text("900")]],
        );
        let partial = sheet(
            &["Date", "Particulars", "No. of Rooms"],
            vec![vec![text("06/03/2024"), text("Room 201A"), text("1")]],
        );
        let (records, _) =
            normalize(&[full, partial], &taxonomy(), &ColumnNames::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].room_rate_amount, 900.0);
        assert_eq!(records[1].room_rate_amount, 0.0);
        assert_eq!(records[1].rooms_occupied, 1);
    }
}
