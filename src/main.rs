// Entry point and high-level CLI flow.
//
// One invocation is one batch run:
// - load the room taxonomy and sheet layout,
// - read every daily sheet (or a flat CSV) and normalize the rows,
// - aggregate per-room-type occupancy and the ranked summary,
// - write the workbook plus optional CSV/JSON outputs and a console preview.
//
// Every output is rendered in memory first and only written once all of them
// are ready. A failed write removes the partial files again, so a failed run
// leaves no output behind.
mod cli;
mod config;
mod error;
mod excel;
mod loader;
mod normalize;
mod output;
mod reports;
mod sheet_parser;
mod taxonomy;
mod types;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use config::ReportConfig;
use env_logger::Env;
use normalize::NormalizeReport;
use reports::OccupancyReport;
use std::process::ExitCode;
use taxonomy::RoomTaxonomy;

/// Print the short textual summary of what was loaded and what was left out.
fn print_load_summary(sheets: usize, normalized: &NormalizeReport, report: &OccupancyReport) {
    println!(
        "Processing dataset... ({} rows loaded from {} sheet(s), {} with a valid date)",
        util::format_int(normalized.total_rows),
        util::format_int(sheets),
        util::format_int(normalized.dated_rows)
    );
    if normalized.unmapped_count() > 0 {
        println!(
            "Note: {} rows skipped because their room is not in the taxonomy ({} distinct).",
            util::format_int(normalized.unmapped_count()),
            util::format_int(normalized.unmapped.len())
        );
    }
    if !report.skipped.is_empty() {
        println!(
            "Info: {} room type(s) had no dated records and are not in the report.",
            util::format_int(report.skipped.len())
        );
    }
    println!();
}

fn print_preview(report: &OccupancyReport, config: &ReportConfig, max_rows: usize) {
    println!("Room Occupancy Summary");
    println!("(Ranked by occupancy %, group totals last)\n");
    let rows = output::summary_display_rows(&report.summary, &config.currency_symbol);
    output::preview_table_rows(&rows, max_rows.max(1));

    if let Some(best) = report.ranked_rows().next() {
        let table = report
            .tables
            .iter()
            .find(|t| t.room_type == best.room_type && t.room_group == best.room_group);
        if let Some(table) = table {
            println!("Top room type: {}\n", output::table_title(table));
            let daily = output::daily_display_rows(table, &config.currency_symbol);
            output::preview_table_rows(&daily, daily.len());
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = ReportConfig::load(args.layout.as_deref())
        .with_context(|| format!("Failed to load layout config {:?}", args.layout))?;
    let taxonomy = RoomTaxonomy::load(&args.taxonomy)
        .with_context(|| format!("Failed to load room taxonomy: {}", args.taxonomy.display()))?;

    let input = loader::load_input(&args.input, args.format, &config.layout)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;
    log::debug!("Input read as {:?}", input.kind);

    let (records, normalized) = normalize::normalize(&input.sheets, &taxonomy, &config.columns)
        .with_context(|| format!("Input file {} is missing required data", args.input.display()))?;
    let report = reports::build_report(&records, &taxonomy);
    normalized.log_warnings();

    print_load_summary(input.sheets.len(), &normalized, &report);

    println!("Generating report...");
    let mut outputs = output::StagedOutputs::default();
    let csv_files = match &args.csv_dir {
        Some(dir) => output::stage_csv_dir(&mut outputs, dir, &report, &config.currency_symbol)
            .with_context(|| format!("Failed to export CSV files to {}", dir.display()))?,
        None => 0,
    };
    let summary = output::run_summary(input.sheets.len(), &normalized, &report);
    if let Some(path) = &args.summary_json {
        let bytes = output::json_bytes(&summary)
            .with_context(|| format!("Failed to write run summary: {}", path.display()))?;
        outputs.add_file(path, bytes);
    }
    let workbook = excel::render_report(&report, &config.currency_symbol)
        .with_context(|| format!("Failed to write report: {}", args.output.display()))?;
    outputs.add_file(&args.output, workbook);
    outputs.commit().context("Failed to save report outputs")?;

    println!("(Full report exported to {})\n", args.output.display());
    if let Some(dir) = &args.csv_dir {
        println!("({} CSV file(s) exported to {})\n", csv_files, dir.display());
    }
    if let Some(path) = &args.summary_json {
        log::info!("Wrote run summary to {}", path.display());
    }

    print_preview(&report, &config, args.preview_rows);
    println!(
        "Overall occupancy: {}%  Total amount: {}\n",
        util::format_number(summary.overall_occupancy_pct, 2),
        util::format_money(&config.currency_symbol, summary.total_amount)
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::init_from_env(Env::default().default_filter_or(args.log_filter()));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
