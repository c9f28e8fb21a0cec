use crate::error::{ReportError, Result};
use crate::normalize::NormalizeReport;
use crate::reports::{OccupancyReport, Rank, RoomTypeTable, SummaryRow};
use crate::types::{DailyDisplayRow, RunSummary, SummaryDisplayRow};
use crate::util::{format_int, format_money, format_number, percent, round2, slugify};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

/// Daily date label, e.g. `Mar 05,2024`.
pub const DAY_FORMAT: &str = "%b %d,%Y";

pub fn csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.into_inner().map_err(|e| ReportError::Io(e.into_error()))
}

pub fn json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Output files rendered in memory, written together once the run has
/// nothing left that can fail.
#[derive(Debug, Default)]
pub struct StagedOutputs {
    dirs: Vec<PathBuf>,
    files: Vec<(PathBuf, Vec<u8>)>,
}

fn write_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::WriteOutput {
        path: path.display().to_string(),
        source,
    }
}

/// `report.xlsx` -> `report.xlsx.partial`, next to the final file.
fn partial_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        write_error(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
        )
    })?;
    let mut partial = OsString::from(name);
    partial.push(".partial");
    Ok(path.with_file_name(partial))
}

impl StagedOutputs {
    pub fn add_dir(&mut self, dir: &Path) {
        self.dirs.push(dir.to_path_buf());
    }

    pub fn add_file(&mut self, path: &Path, bytes: Vec<u8>) {
        self.files.push((path.to_path_buf(), bytes));
    }

    /// Create the directories, write every file under a `.partial` name and
    /// then rename them into place. If any write fails the partial files are
    /// removed, so no output from this run is left behind and files from an
    /// earlier run stay untouched.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        for dir in &self.dirs {
            std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;
        }

        let mut partials: Vec<PathBuf> = Vec::with_capacity(self.files.len());
        for (path, bytes) in &self.files {
            let partial = match partial_path(path) {
                Ok(p) => p,
                Err(e) => {
                    remove_all(&partials);
                    return Err(e);
                }
            };
            if let Err(e) = std::fs::write(&partial, bytes) {
                remove_all(&partials);
                let _ = std::fs::remove_file(&partial);
                return Err(write_error(path, e));
            }
            partials.push(partial);
        }

        let mut written = Vec::with_capacity(self.files.len());
        for (i, (path, _)) in self.files.iter().enumerate() {
            if let Err(e) = std::fs::rename(&partials[i], path) {
                remove_all(&partials[i..]);
                return Err(write_error(path, e));
            }
            log::debug!("Wrote {}", path.display());
            written.push(path.clone());
        }
        Ok(written)
    }
}

fn remove_all(paths: &[PathBuf]) {
    for p in paths {
        if let Err(e) = std::fs::remove_file(p) {
            log::warn!("Could not remove partial output {}: {}", p.display(), e);
        }
    }
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Amount cell text. A zero day is shown blank: nothing was charged, which
/// is different from an amount nobody knows.
pub fn amount_label(currency: &str, amount: f64) -> String {
    if amount > 0.0 {
        format_money(currency, amount)
    } else {
        String::new()
    }
}

pub fn rank_label(rank: Rank) -> String {
    match rank {
        Rank::Position(n) => n.to_string(),
        Rank::GroupTotal => String::new(),
    }
}

pub fn summary_display_rows(rows: &[SummaryRow], currency: &str) -> Vec<SummaryDisplayRow> {
    rows.iter()
        .map(|r| SummaryDisplayRow {
            room_type: r.room_type.clone(),
            room_group: r.room_group.clone(),
            total_rooms: r.total_rooms,
            occupied_rooms: r.occupied_rooms,
            occupancy_pct: format!("{}%", format_number(r.occupancy_pct, 2)),
            total_amount: format_money(currency, r.total_amount),
            rank: rank_label(r.rank),
        })
        .collect()
}

/// Daily rows plus the TOTAL and OCC. PERCENT. lines, as shown in the
/// report.
pub fn daily_display_rows(table: &RoomTypeTable, currency: &str) -> Vec<DailyDisplayRow> {
    let mut rows: Vec<DailyDisplayRow> = table
        .days
        .iter()
        .map(|d| DailyDisplayRow {
            date: d.date.format(DAY_FORMAT).to_string(),
            total_rooms: d.total_rooms.to_string(),
            occupied_rooms: d.occupied_rooms.to_string(),
            occupancy_pct: format!("{:.0}%", d.occupancy_pct),
            amount: amount_label(currency, d.amount),
        })
        .collect();
    let overall = format!("{:.2}%", table.totals.occupancy_pct);
    rows.push(DailyDisplayRow {
        date: "TOTAL".to_string(),
        total_rooms: table.totals.total_possible.to_string(),
        occupied_rooms: table.totals.occupied_rooms.to_string(),
        occupancy_pct: overall.clone(),
        amount: format_money(currency, table.totals.total_amount),
    });
    rows.push(DailyDisplayRow {
        date: "OCC. PERCENT.".to_string(),
        total_rooms: String::new(),
        occupied_rooms: String::new(),
        occupancy_pct: overall,
        amount: String::new(),
    });
    rows
}

/// Title above a daily table: `DELUXE STUDIO ROOM (Room 201A, Room 203A)`.
pub fn table_title(table: &RoomTypeTable) -> String {
    format!(
        "{} ({})",
        table.room_type.to_uppercase(),
        table.identifiers.join(", ")
    )
}

/// Stage `summary.csv` and one CSV per daily table under `dir`. Returns
/// the number of CSV files staged.
pub fn stage_csv_dir(
    outputs: &mut StagedOutputs,
    dir: &Path,
    report: &OccupancyReport,
    currency: &str,
) -> Result<usize> {
    outputs.add_dir(dir);
    let summary = csv_bytes(&summary_display_rows(&report.summary, currency))?;
    outputs.add_file(&dir.join("summary.csv"), summary);

    for table in &report.tables {
        let file = format!(
            "{}_{}.csv",
            slugify(&table.room_group),
            slugify(&table.room_type)
        );
        outputs.add_file(&dir.join(file), csv_bytes(&daily_display_rows(table, currency))?);
    }
    Ok(report.tables.len() + 1)
}

pub fn run_summary(
    sheets_read: usize,
    normalized: &NormalizeReport,
    report: &OccupancyReport,
) -> RunSummary {
    let ranked: Vec<&SummaryRow> = report.ranked_rows().collect();
    let occupied: u64 = ranked.iter().map(|r| r.occupied_rooms).sum();
    let possible: u64 = ranked.iter().map(|r| r.total_possible).sum();
    RunSummary {
        sheets_read,
        total_records: normalized.total_rows,
        dated_records: normalized.dated_rows,
        undated_records: normalized.undated_rows,
        blank_rows: normalized.blank_rows,
        unmapped_records: normalized.unmapped_count(),
        unmapped_identifiers: normalized.unmapped.clone(),
        room_types_reported: report.tables.len(),
        skipped_room_types: report
            .skipped
            .iter()
            .map(|(t, g)| format!("{} ({})", t, g))
            .collect(),
        inconsistencies: report
            .inconsistencies
            .iter()
            .map(|i| {
                format!(
                    "{} ({}): {} occupied room-nights, no rooms in taxonomy",
                    i.room_type,
                    i.room_group,
                    format_int(i.occupied_rooms)
                )
            })
            .collect(),
        overall_occupancy_pct: round2(percent(occupied, possible)),
        total_amount: ranked.iter().map(|r| r.total_amount).sum(),
    }
}
