use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Choose by file extension
    Auto,
    /// Workbook with one daily sales sheet per day
    Workbook,
    /// Flat CSV with Date, Particulars, No. of Rooms, Rooms Rates
    Csv,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "occupancy_report",
    about = "Build a room occupancy report from daily hotel sales exports",
    version
)]
pub struct Args {
    /// Daily sales workbook (.xlsx/.xls/.ods) or flat CSV export
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Room taxonomy (TOML, one [[rooms]] entry per room)
    #[arg(short, long, default_value = "config/rooms.toml")]
    pub taxonomy: PathBuf,

    /// Sheet layout / column names override (TOML)
    #[arg(short, long)]
    pub layout: Option<PathBuf>,

    /// Report workbook to write
    #[arg(short, long, default_value = "room_occupancy_report.xlsx")]
    pub output: PathBuf,

    /// Also export the summary and every daily table as CSV into this directory
    #[arg(long, value_name = "DIR")]
    pub csv_dir: Option<PathBuf>,

    /// Write a JSON run summary (counts, unmapped rooms, skipped types)
    #[arg(long, value_name = "PATH")]
    pub summary_json: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "auto")]
    pub format: InputFormat,

    /// Summary rows shown in the console preview
    #[arg(long, default_value_t = 10)]
    pub preview_rows: usize,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
