// Workbook output: one sheet per room group plus a ranked "Summary" sheet
// with a bar chart.

use std::collections::BTreeSet;

use rust_xlsxwriter::{
    Chart, ChartType, Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};

use crate::error::Result;
use crate::output::{table_title, DAY_FORMAT};
use crate::reports::{OccupancyReport, Rank, RoomTypeTable, SummaryRow};

pub const SUMMARY_SHEET: &str = "Summary";

const DAILY_HEADERS: [&str; 5] = [
    "DATE",
    "TOTAL ROOMS",
    "NO. OF OCCUPIED ROOMS",
    "OCCUPANCY PERCENTAGE",
    "AMOUNT",
];
const DAILY_WIDTHS: [f64; 5] = [15.0, 15.0, 20.0, 22.0, 15.0];

const SUMMARY_HEADERS: [&str; 7] = [
    "Room Type",
    "Room Group",
    "No. of Rooms",
    "Occupied",
    "Occupancy %",
    "Total Amount",
    "Rank",
];
const SUMMARY_WIDTHS: [f64; 7] = [32.0, 14.0, 13.0, 11.0, 13.0, 16.0, 8.0];

/// Tables placed side by side in one row band.
const TABLES_PER_BAND: usize = 2;

struct Formats {
    border: Format,
    title: Format,
    header: Format,
    money: Format,
    whole_percent: Format,
    percent: Format,
    bold: Format,
}

impl Formats {
    fn new(currency: &str) -> Self {
        let border = Format::new().set_border(FormatBorder::Thin);
        Self {
            title: Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_font_color(Color::Red),
            header: Format::new().set_bold().set_align(FormatAlign::Center),
            money: border
                .clone()
                .set_num_format(format!("\"{}\"#,##0.00", currency)),
            whole_percent: border.clone().set_num_format("0%"),
            percent: border.clone().set_num_format("0.00%"),
            bold: Format::new().set_bold().set_border(FormatBorder::Thin),
            border,
        }
    }
}

/// Write one daily table with its top-left corner at (`row`, `col`).
/// Returns the number of rows used.
fn write_daily_table(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    table: &RoomTypeTable,
    fmt: &Formats,
) -> Result<u32> {
    let last_col = col + DAILY_HEADERS.len() as u16 - 1;
    sheet.merge_range(row, col, row, last_col, &table_title(table), &fmt.title)?;
    for (i, (name, width)) in DAILY_HEADERS.iter().zip(DAILY_WIDTHS).enumerate() {
        let c = col + i as u16;
        sheet.write_string_with_format(row + 1, c, *name, &fmt.header)?;
        sheet.set_column_width(c, width)?;
    }

    let mut r = row + 2;
    for day in &table.days {
        sheet.write_string_with_format(r, col, day.date.format(DAY_FORMAT).to_string(), &fmt.border)?;
        sheet.write_number_with_format(r, col + 1, day.total_rooms as f64, &fmt.border)?;
        sheet.write_number_with_format(r, col + 2, day.occupied_rooms as f64, &fmt.border)?;
        sheet.write_number_with_format(r, col + 3, day.occupancy_pct / 100.0, &fmt.whole_percent)?;
        // Days without revenue stay blank rather than showing 0.00.
        if day.amount > 0.0 {
            sheet.write_number_with_format(r, col + 4, day.amount, &fmt.money)?;
        } else {
            sheet.write_blank(r, col + 4, &fmt.border)?;
        }
        r += 1;
    }

    let totals = &table.totals;
    sheet.write_string_with_format(r, col, "TOTAL", &fmt.bold)?;
    sheet.write_number_with_format(r, col + 1, totals.total_possible as f64, &fmt.border)?;
    sheet.write_number_with_format(r, col + 2, totals.occupied_rooms as f64, &fmt.border)?;
    sheet.write_number_with_format(r, col + 3, totals.occupancy_pct / 100.0, &fmt.percent)?;
    sheet.write_number_with_format(r, col + 4, totals.total_amount, &fmt.money)?;
    r += 1;

    sheet.write_string_with_format(r, col, "OCC. PERCENT.", &fmt.bold)?;
    sheet.write_blank(r, col + 1, &fmt.border)?;
    sheet.write_blank(r, col + 2, &fmt.border)?;
    sheet.write_number_with_format(r, col + 3, totals.occupancy_pct / 100.0, &fmt.percent)?;
    sheet.write_blank(r, col + 4, &fmt.border)?;

    Ok(r - row + 1)
}

fn write_group_sheet(
    workbook: &mut Workbook,
    group: &str,
    tables: &[&RoomTypeTable],
    fmt: &Formats,
) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(group)?;

    let mut band_top = 1u32;
    for band in tables.chunks(TABLES_PER_BAND) {
        let mut band_height = 0u32;
        for (offset, table) in band.iter().enumerate() {
            let col = 1 + (offset * (DAILY_HEADERS.len() + 1)) as u16;
            let used = write_daily_table(sheet, band_top, col, table, fmt)?;
            band_height = band_height.max(used);
        }
        band_top += band_height + 2;
    }
    Ok(())
}

fn write_summary_row(
    sheet: &mut Worksheet,
    r: u32,
    row: &SummaryRow,
    fmt: &Formats,
) -> Result<()> {
    let text = if row.is_group_total() { &fmt.bold } else { &fmt.border };
    sheet.write_string_with_format(r, 0, &row.room_type, text)?;
    sheet.write_string_with_format(r, 1, &row.room_group, text)?;
    sheet.write_number_with_format(r, 2, row.total_rooms as f64, &fmt.border)?;
    sheet.write_number_with_format(r, 3, row.occupied_rooms as f64, &fmt.border)?;
    sheet.write_number_with_format(r, 4, row.occupancy_pct / 100.0, &fmt.percent)?;
    sheet.write_number_with_format(r, 5, row.total_amount, &fmt.money)?;
    match row.rank {
        Rank::Position(n) => sheet.write_number_with_format(r, 6, f64::from(n), &fmt.border)?,
        Rank::GroupTotal => sheet.write_blank(r, 6, &fmt.border)?,
    };
    Ok(())
}

fn write_summary_sheet(workbook: &mut Workbook, summary: &[SummaryRow], fmt: &Formats) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(SUMMARY_SHEET)?;

    for (c, (name, width)) in SUMMARY_HEADERS.iter().zip(SUMMARY_WIDTHS).enumerate() {
        sheet.write_string_with_format(0, c as u16, *name, &fmt.header)?;
        sheet.set_column_width(c as u16, width)?;
    }
    for (i, row) in summary.iter().enumerate() {
        write_summary_row(sheet, i as u32 + 1, row, fmt)?;
    }

    // Ranked rows come first, so the chart covers rows 1..=ranked.
    let ranked = summary.iter().filter(|r| !r.is_group_total()).count() as u32;
    if ranked > 0 {
        let mut chart = Chart::new(ChartType::Bar);
        chart
            .add_series()
            .set_name("Occupancy %")
            .set_categories((SUMMARY_SHEET, 1, 0, ranked, 0))
            .set_values((SUMMARY_SHEET, 1, 4, ranked, 4));
        chart.title().set_name("Occupancy % by Room Type");
        chart.x_axis().set_name("Occupancy %");
        chart.legend().set_hidden();
        sheet.insert_chart(1, SUMMARY_HEADERS.len() as u16 + 1, &chart)?;
    }
    Ok(())
}

/// Build the report workbook in memory and return the xlsx bytes.
pub fn render_report(report: &OccupancyReport, currency: &str) -> Result<Vec<u8>> {
    let fmt = Formats::new(currency);
    let mut workbook = Workbook::new();

    for group in &report.groups {
        let tables: Vec<&RoomTypeTable> = report.tables_in_group(group).collect();
        write_group_sheet(&mut workbook, group, &tables, &fmt)?;
    }
    // Tables whose group is not in the taxonomy still get a sheet.
    let extra: BTreeSet<&str> = report
        .tables
        .iter()
        .map(|t| t.room_group.as_str())
        .filter(|g| !report.groups.iter().any(|known| known.as_str() == *g))
        .collect();
    for group in extra {
        let tables: Vec<&RoomTypeTable> = report.tables_in_group(group).collect();
        write_group_sheet(&mut workbook, group, &tables, &fmt)?;
    }

    write_summary_sheet(&mut workbook, &report.summary, &fmt)?;
    let bytes = workbook.save_to_buffer()?;
    log::debug!("Rendered report workbook ({} bytes)", bytes.len());
    Ok(bytes)
}
