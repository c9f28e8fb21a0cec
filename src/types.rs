use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;

/// One untyped spreadsheet or CSV cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// String form of the cell as it would be shown in a sheet. Whole
    /// numbers lose their trailing `.0` so `201` stays `201`.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// A transaction row after type coercion and the taxonomy join.
#[derive(Debug, Clone, PartialEq)]
pub struct StayRecord {
    pub date: Option<NaiveDate>,
    pub particulars: String,
    pub rooms_occupied: u32,
    pub room_rate_amount: f64,
    pub room_type: Option<String>,
    pub room_group: Option<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SummaryDisplayRow {
    #[serde(rename = "Room Type")]
    #[tabled(rename = "Room Type")]
    pub room_type: String,
    #[serde(rename = "Room Group")]
    #[tabled(rename = "Room Group")]
    pub room_group: String,
    #[serde(rename = "No. of Rooms")]
    #[tabled(rename = "No. of Rooms")]
    pub total_rooms: usize,
    #[serde(rename = "Occupied")]
    #[tabled(rename = "Occupied")]
    pub occupied_rooms: u64,
    #[serde(rename = "Occupancy %")]
    #[tabled(rename = "Occupancy %")]
    pub occupancy_pct: String,
    #[serde(rename = "Total Amount")]
    #[tabled(rename = "Total Amount")]
    pub total_amount: String,
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailyDisplayRow {
    #[serde(rename = "DATE")]
    #[tabled(rename = "DATE")]
    pub date: String,
    #[serde(rename = "TOTAL ROOMS")]
    #[tabled(rename = "TOTAL ROOMS")]
    pub total_rooms: String,
    #[serde(rename = "NO. OF OCCUPIED ROOMS")]
    #[tabled(rename = "NO. OF OCCUPIED ROOMS")]
    pub occupied_rooms: String,
    #[serde(rename = "OCCUPANCY PERCENTAGE")]
    #[tabled(rename = "OCCUPANCY PERCENTAGE")]
    pub occupancy_pct: String,
    #[serde(rename = "AMOUNT")]
    #[tabled(rename = "AMOUNT")]
    pub amount: String,
}

/// Machine-readable account of one run, written as JSON.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub sheets_read: usize,
    pub total_records: usize,
    pub dated_records: usize,
    pub undated_records: usize,
    pub blank_rows: usize,
    pub unmapped_records: usize,
    pub unmapped_identifiers: BTreeMap<String, usize>,
    pub room_types_reported: usize,
    pub skipped_room_types: Vec<String>,
    pub inconsistencies: Vec<String>,
    pub overall_occupancy_pct: f64,
    pub total_amount: f64,
}
