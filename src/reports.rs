use crate::taxonomy::RoomTaxonomy;
use crate::types::StayRecord;
use crate::util::{percent, round2};
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Inclusive range of calendar days covered by a room type's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    /// `(end - start).days + 1`
    pub fn days(&self) -> u64 {
        ((self.end - self.start).num_days() + 1).max(0) as u64
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.days()).map(move |i| self.start + Duration::days(i as i64))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyOccupancyRow {
    pub date: NaiveDate,
    pub total_rooms: usize,
    pub occupied_rooms: u64,
    /// Unrounded; shown as a whole percent.
    pub occupancy_pct: f64,
    /// True sum of the day's rates. Zero means nothing was charged.
    pub amount: f64,
}

/// The TOTAL line under a daily table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableTotals {
    pub total_possible: u64,
    pub occupied_rooms: u64,
    pub occupancy_pct: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomTypeTable {
    pub room_type: String,
    pub room_group: String,
    pub identifiers: Vec<String>,
    pub total_rooms: usize,
    pub span: DateSpan,
    pub days: Vec<DailyOccupancyRow>,
    pub totals: TableTotals,
}

/// Position in the summary ranking. Group totals always sort after every
/// ranked room type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Position(u32),
    GroupTotal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub room_type: String,
    pub room_group: String,
    pub total_rooms: usize,
    pub occupied_rooms: u64,
    pub total_possible: u64,
    /// Rounded to two decimals; ranking uses this value.
    pub occupancy_pct: f64,
    pub total_amount: f64,
    pub rank: Rank,
}

impl SummaryRow {
    pub fn is_group_total(&self) -> bool {
        self.rank == Rank::GroupTotal
    }
}

/// Rooms were occupied under a room type the taxonomy has no rooms for.
#[derive(Debug, Clone, PartialEq)]
pub struct Inconsistency {
    pub room_type: String,
    pub room_group: String,
    pub occupied_rooms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyReport {
    pub groups: Vec<String>,
    pub tables: Vec<RoomTypeTable>,
    pub summary: Vec<SummaryRow>,
    /// Room types that had no dated records, as (room type, group).
    pub skipped: Vec<(String, String)>,
    pub inconsistencies: Vec<Inconsistency>,
}

impl OccupancyReport {
    pub fn tables_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a RoomTypeTable> {
        self.tables.iter().filter(move |t| t.room_group == group)
    }

    /// Ranked room-type rows only.
    pub fn ranked_rows(&self) -> impl Iterator<Item = &SummaryRow> {
        self.summary.iter().filter(|r| !r.is_group_total())
    }
}

#[derive(Default)]
struct DayAcc {
    occupied: u64,
    amount: f64,
}

type TypeKey = (String, String);

/// Build one zero-filled daily table for a room type.
fn build_table(
    key: &TypeKey,
    by_day: &BTreeMap<NaiveDate, DayAcc>,
    taxonomy: &RoomTaxonomy,
) -> Option<RoomTypeTable> {
    let (room_type, group) = key;
    let start = *by_day.keys().next()?;
    let end = *by_day.keys().next_back()?;
    let span = DateSpan { start, end };
    let total_rooms = taxonomy.total_rooms(room_type, group);

    let days: Vec<DailyOccupancyRow> = span
        .iter()
        .map(|date| {
            let (occupied, amount) = by_day
                .get(&date)
                .map_or((0, 0.0), |acc| (acc.occupied, acc.amount));
            DailyOccupancyRow {
                date,
                total_rooms,
                occupied_rooms: occupied,
                occupancy_pct: percent(occupied, total_rooms as u64),
                amount,
            }
        })
        .collect();

    let total_possible = total_rooms as u64 * span.days();
    let occupied_rooms: u64 = days.iter().map(|d| d.occupied_rooms).sum();
    // Only days that actually recorded revenue count towards the total.
    let total_amount: f64 = days.iter().map(|d| d.amount).filter(|a| *a > 0.0).sum();

    Some(RoomTypeTable {
        room_type: room_type.clone(),
        room_group: group.clone(),
        identifiers: taxonomy
            .identifiers(room_type, group)
            .into_iter()
            .map(str::to_string)
            .collect(),
        total_rooms,
        span,
        days,
        totals: TableTotals {
            total_possible,
            occupied_rooms,
            occupancy_pct: percent(occupied_rooms, total_possible),
            total_amount,
        },
    })
}

/// Group dated, mapped records by room type and day, then build one daily
/// table per room type.
///
/// Tables follow taxonomy order. Room types present in the records but not
/// in `taxonomy` come last, sorted, with zero rooms.
pub fn build_room_type_tables(
    records: &[StayRecord],
    taxonomy: &RoomTaxonomy,
) -> (Vec<RoomTypeTable>, Vec<(String, String)>, Vec<Inconsistency>) {
    let mut grouped: HashMap<TypeKey, BTreeMap<NaiveDate, DayAcc>> = HashMap::new();
    for r in records {
        let (Some(date), Some(room_type), Some(group)) = (r.date, &r.room_type, &r.room_group)
        else {
            continue;
        };
        let day = grouped
            .entry((room_type.clone(), group.clone()))
            .or_default()
            .entry(date)
            .or_default();
        day.occupied += u64::from(r.rooms_occupied);
        day.amount += r.room_rate_amount;
    }

    let mut order: Vec<TypeKey> = Vec::new();
    for group in taxonomy.groups() {
        for room_type in taxonomy.room_types(group) {
            order.push((room_type.to_string(), group.to_string()));
        }
    }
    let mut extra: Vec<TypeKey> = grouped
        .keys()
        .filter(|k| !order.contains(k))
        .cloned()
        .collect();
    extra.sort();
    order.extend(extra);

    let mut tables = Vec::new();
    let mut skipped = Vec::new();
    let mut inconsistencies = Vec::new();
    for key in order {
        let table = grouped
            .get(&key)
            .and_then(|by_day| build_table(&key, by_day, taxonomy));
        let Some(table) = table else {
            log::debug!("No dated records for {} / {}; skipped", key.0, key.1);
            skipped.push(key);
            continue;
        };
        if table.total_rooms == 0 && table.totals.occupied_rooms > 0 {
            log::warn!(
                "{} / {} has {} occupied room-nights but no rooms in the taxonomy; reported as 0%",
                table.room_type,
                table.room_group,
                table.totals.occupied_rooms
            );
            inconsistencies.push(Inconsistency {
                room_type: table.room_type.clone(),
                room_group: table.room_group.clone(),
                occupied_rooms: table.totals.occupied_rooms,
            });
        }
        tables.push(table);
    }
    (tables, skipped, inconsistencies)
}

/// Dense-minimum rank, highest value first: equal values share a rank and
/// the next distinct value gets the next integer.
pub fn dense_rank(values: &[f64]) -> Vec<u32> {
    let mut distinct: Vec<f64> = values.to_vec();
    distinct.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    distinct.dedup();
    values
        .iter()
        .map(|v| {
            let pos = distinct
                .iter()
                .position(|d| d == v)
                .unwrap_or(distinct.len());
            pos as u32 + 1
        })
        .collect()
}

/// Ranked summary rows, one per table, followed by one TOTAL row per group.
pub fn build_summary(tables: &[RoomTypeTable], groups: &[String]) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = tables
        .iter()
        .map(|t| SummaryRow {
            room_type: t.room_type.clone(),
            room_group: t.room_group.clone(),
            total_rooms: t.total_rooms,
            occupied_rooms: t.totals.occupied_rooms,
            total_possible: t.totals.total_possible,
            occupancy_pct: round2(t.totals.occupancy_pct),
            total_amount: t.totals.total_amount,
            rank: Rank::GroupTotal,
        })
        .collect();

    let pcts: Vec<f64> = rows.iter().map(|r| r.occupancy_pct).collect();
    for (row, rank) in rows.iter_mut().zip(dense_rank(&pcts)) {
        row.rank = Rank::Position(rank);
    }
    // Stable: equal ranks keep table order.
    rows.sort_by_key(|r| r.rank);

    let mut group_order: Vec<&str> = groups.iter().map(String::as_str).collect();
    for t in tables {
        if !group_order.contains(&t.room_group.as_str()) {
            group_order.push(&t.room_group);
        }
    }
    for group in group_order {
        let members: Vec<&SummaryRow> = rows.iter().filter(|r| r.room_group == group).collect();
        if members.is_empty() {
            continue;
        }
        let total_rooms: usize = members.iter().map(|r| r.total_rooms).sum();
        let occupied_rooms: u64 = members.iter().map(|r| r.occupied_rooms).sum();
        let total_possible: u64 = members.iter().map(|r| r.total_possible).sum();
        let total_amount: f64 = members.iter().map(|r| r.total_amount).sum();
        let total = SummaryRow {
            room_type: "TOTAL".to_string(),
            room_group: group.to_string(),
            total_rooms,
            occupied_rooms,
            total_possible,
            occupancy_pct: round2(percent(occupied_rooms, total_possible)),
            total_amount,
            rank: Rank::GroupTotal,
        };
        rows.push(total);
    }
    rows
}

/// Run the whole aggregation over normalized records.
pub fn build_report(records: &[StayRecord], taxonomy: &RoomTaxonomy) -> OccupancyReport {
    let groups: Vec<String> = taxonomy.groups().into_iter().map(str::to_string).collect();
    let (tables, skipped, inconsistencies) = build_room_type_tables(records, taxonomy);
    let summary = build_summary(&tables, &groups);
    log::info!(
        "Built {} room type tables ({} skipped without dated records)",
        tables.len(),
        skipped.len()
    );
    OccupancyReport {
        groups,
        tables,
        summary,
        skipped,
        inconsistencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::RoomMapping;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn taxonomy(rooms: &[(&str, &str, &str)]) -> RoomTaxonomy {
        RoomTaxonomy::new(
            rooms
                .iter()
                .map(|(id, room_type, group)| RoomMapping {
                    id: id.to_string(),
                    room_type: room_type.to_string(),
                    group: group.to_string(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn record(
        date: Option<NaiveDate>,
        id: &str,
        rooms: u32,
        rate: f64,
        taxonomy: &RoomTaxonomy,
    ) -> StayRecord {
        let mapping = taxonomy.lookup(id);
        StayRecord {
            date,
            particulars: id.to_string(),
            rooms_occupied: rooms,
            room_rate_amount: rate,
            room_type: mapping.map(|m| m.room_type.clone()),
            room_group: mapping.map(|m| m.group.clone()),
        }
    }

    fn resort() -> RoomTaxonomy {
        taxonomy(&[
            ("Room 201A", "Deluxe Studio Room", "Pamana"),
            ("Room 203A", "Deluxe Studio Room", "Pamana"),
            ("Room 101B", "Dormitory", "Pamana"),
            ("Room 201C", "Double Room", "Annex"),
            ("Room 202C", "Double Room", "Annex"),
        ])
    }

    #[test]
    fn test_single_room_three_days() {
        let tax = taxonomy(&[("Room 201A", "Deluxe Studio Room", "Pamana")]);
        let records = vec![
            record(Some(ymd(2024, 3, 1)), "Room 201A", 1, 1000.0, &tax),
            record(Some(ymd(2024, 3, 2)), "Room 201A", 0, 0.0, &tax),
            record(Some(ymd(2024, 3, 3)), "Room 201A", 1, 1000.0, &tax),
        ];
        let report = build_report(&records, &tax);

        assert_eq!(report.tables.len(), 1);
        let table = &report.tables[0];
        assert_eq!(table.total_rooms, 1);
        let days: Vec<(NaiveDate, usize, u64, f64, f64)> = table
            .days
            .iter()
            .map(|d| (d.date, d.total_rooms, d.occupied_rooms, d.occupancy_pct, d.amount))
            .collect();
        assert_eq!(
            days,
            vec![
                (ymd(2024, 3, 1), 1, 1, 100.0, 1000.0),
                (ymd(2024, 3, 2), 1, 0, 0.0, 0.0),
                (ymd(2024, 3, 3), 1, 1, 100.0, 1000.0),
            ]
        );
        assert_eq!(table.totals.total_possible, 3);
        assert_eq!(table.totals.occupied_rooms, 2);
        assert_eq!(round2(table.totals.occupancy_pct), 66.67);
        assert_eq!(table.totals.total_amount, 2000.0);

        let first = &report.summary[0];
        assert_eq!(first.rank, Rank::Position(1));
        assert_eq!(first.total_possible, 3);
        assert_eq!(first.occupancy_pct, 66.67);
    }

    #[test]
    fn test_missing_days_are_zero_filled() {
        let tax = resort();
        let records = vec![
            record(Some(ymd(2024, 2, 27)), "Room 201A", 1, 500.0, &tax),
            record(Some(ymd(2024, 3, 2)), "Room 203A", 2, 900.0, &tax),
        ];
        let report = build_report(&records, &tax);
        let table = &report.tables[0];

        // 2024 is a leap year: Feb 27, 28, 29, Mar 1, 2.
        assert_eq!(table.span.days(), 5);
        assert_eq!(table.days.len(), 5);
        for pair in table.days.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
        assert_eq!(table.days[1].occupied_rooms, 0);
        assert_eq!(table.days[1].amount, 0.0);
        assert_eq!(table.days[4].occupancy_pct, 100.0);
        assert_eq!(report.summary[0].total_possible, 2 * 5);
    }

    #[test]
    fn test_unmapped_and_undated_records_are_excluded() {
        let tax = resort();
        let records = vec![
            record(Some(ymd(2024, 3, 1)), "Room 201A", 1, 1000.0, &tax),
            record(Some(ymd(2024, 3, 1)), "Room 999", 1, 1000.0, &tax),
            record(None, "Room 201A", 1, 1000.0, &tax),
            record(Some(ymd(2024, 3, 9)), "Room 999", 1, 1000.0, &tax),
        ];
        let report = build_report(&records, &tax);

        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].days.len(), 1);
        assert_eq!(report.tables[0].totals.occupied_rooms, 1);
        assert_eq!(report.ranked_rows().count(), 1);
    }

    #[test]
    fn test_room_types_without_records_are_skipped() {
        let tax = resort();
        let records = vec![record(Some(ymd(2024, 3, 1)), "Room 201C", 1, 1000.0, &tax)];
        let report = build_report(&records, &tax);

        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].room_type, "Double Room");
        assert_eq!(
            report.skipped,
            vec![
                ("Deluxe Studio Room".to_string(), "Pamana".to_string()),
                ("Dormitory".to_string(), "Pamana".to_string()),
            ]
        );
        assert!(report.summary.iter().all(|r| r.room_group == "Annex"));
        assert_eq!(report.tables_in_group("Pamana").count(), 0);
    }

    #[test]
    fn test_dense_rank() {
        assert_eq!(dense_rank(&[50.0, 80.0, 50.0]), vec![2, 1, 2]);
        assert_eq!(dense_rank(&[10.0, 30.0, 30.0, 20.0, 10.0]), vec![3, 1, 1, 2, 3]);
        assert_eq!(dense_rank(&[0.0]), vec![1]);
        assert!(dense_rank(&[]).is_empty());
    }

    #[test]
    fn test_ties_share_a_rank() {
        let tax = taxonomy(&[
            ("A1", "Alpha", "Pamana"),
            ("B1", "Beta", "Pamana"),
            ("C1", "Gamma", "Annex"),
        ]);
        let d1 = ymd(2024, 3, 1);
        let d2 = ymd(2024, 3, 2);
        let mut records = vec![
            // Alpha: 1 of 2 nights -> 50%
            record(Some(d1), "A1", 1, 100.0, &tax),
            record(Some(d2), "A1", 0, 0.0, &tax),
            // Beta: 1 of 2 nights -> 50%
            record(Some(d1), "B1", 0, 0.0, &tax),
            record(Some(d2), "B1", 1, 100.0, &tax),
        ];
        // Gamma: 4 of 5 nights -> 80%
        for day in 1..=5 {
            let occupied = if day == 3 { 0 } else { 1 };
            records.push(record(Some(ymd(2024, 3, day)), "C1", occupied, 100.0, &tax));
        }
        let report = build_report(&records, &tax);

        let ranked: Vec<(&str, f64, Rank)> = report
            .ranked_rows()
            .map(|r| (r.room_type.as_str(), r.occupancy_pct, r.rank))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("Gamma", 80.0, Rank::Position(1)),
                ("Alpha", 50.0, Rank::Position(2)),
                ("Beta", 50.0, Rank::Position(2)),
            ]
        );
    }

    #[test]
    fn test_group_total_is_recomputed_from_sums() {
        let tax = resort();
        let records = vec![
            // Deluxe Studio: 2 rooms x 1 day, 2 occupied -> 100%
            record(Some(ymd(2024, 3, 1)), "Room 201A", 1, 1000.0, &tax),
            record(Some(ymd(2024, 3, 1)), "Room 203A", 1, 1000.0, &tax),
            // Dormitory: 1 room x 4 days, 1 occupied -> 25%
            record(Some(ymd(2024, 3, 1)), "Room 101B", 1, 300.0, &tax),
            record(Some(ymd(2024, 3, 4)), "Room 101B", 0, 0.0, &tax),
        ];
        let report = build_report(&records, &tax);

        let total = report
            .summary
            .iter()
            .find(|r| r.is_group_total() && r.room_group == "Pamana")
            .unwrap();
        assert_eq!(total.total_rooms, 3);
        assert_eq!(total.occupied_rooms, 3);
        assert_eq!(total.total_possible, 2 + 4);
        // 3 / 6, not the 62.5 average of 100% and 25%.
        assert_eq!(total.occupancy_pct, 50.0);
        assert_eq!(total.total_amount, 2300.0);
        assert_eq!(report.summary.last().map(|r| r.rank), Some(Rank::GroupTotal));
        assert!(Rank::Position(u32::MAX) < Rank::GroupTotal);
    }

    #[test]
    fn test_rooms_without_taxonomy_entries_are_flagged() {
        let tax = resort();
        let stray = StayRecord {
            date: Some(ymd(2024, 3, 1)),
            particulars: "Villa 1".to_string(),
            rooms_occupied: 2,
            room_rate_amount: 5000.0,
            room_type: Some("Villa".to_string()),
            room_group: Some("Annex".to_string()),
        };
        let report = build_report(&[stray], &tax);

        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].total_rooms, 0);
        assert_eq!(report.tables[0].days[0].occupancy_pct, 0.0);
        assert_eq!(report.tables[0].totals.occupancy_pct, 0.0);
        assert_eq!(
            report.inconsistencies,
            vec![Inconsistency {
                room_type: "Villa".to_string(),
                room_group: "Annex".to_string(),
                occupied_rooms: 2,
            }]
        );
    }

    #[test]
    fn test_same_input_gives_same_report() {
        let tax = resort();
        let records = vec![
            record(Some(ymd(2024, 3, 2)), "Room 201C", 1, 800.0, &tax),
            record(Some(ymd(2024, 3, 1)), "Room 201A", 1, 1000.0, &tax),
            record(Some(ymd(2024, 3, 3)), "Room 101B", 1, 300.0, &tax),
            record(Some(ymd(2024, 3, 3)), "Room 202C", 1, 800.0, &tax),
        ];
        assert_eq!(build_report(&records, &tax), build_report(&records, &tax));
    }
}
