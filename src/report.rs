use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::error::Result;
use crate::features;
use crate::models::{DistanceKey, GroupKey, GroupSummary, Record, Season};

/// 252 scheme boundary for compound bows, as an arrow average.
pub const COMPOUND_252_AVERAGE: f64 = 280.0 / 36.0;
/// 252 scheme boundary for recurve bows, as an arrow average.
pub const RECURVE_252_AVERAGE: f64 = 252.0 / 36.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Grouping {
    DayOfWeek,
    YearMonth,
    DistanceYearMonth,
    Distance,
    DistanceComp,
}

impl Grouping {
    pub const ALL: [Grouping; 5] = [
        Grouping::DayOfWeek,
        Grouping::YearMonth,
        Grouping::DistanceYearMonth,
        Grouping::Distance,
        Grouping::DistanceComp,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Grouping::DayOfWeek => "Day of Week",
            Grouping::YearMonth => "Month",
            Grouping::DistanceYearMonth => "Distance by Month",
            Grouping::Distance => "Distance",
            Grouping::DistanceComp => "Competition Status",
        }
    }

    fn key(&self, record: &Record, day_of_week: u32, year: i32, month: u32) -> GroupKey {
        let distance = DistanceKey::from_yards(record.distance);
        match self {
            Grouping::DayOfWeek => GroupKey::DayOfWeek(day_of_week),
            Grouping::YearMonth => GroupKey::YearMonth(year, month),
            Grouping::DistanceYearMonth => GroupKey::DistanceYearMonth(distance, year, month),
            Grouping::Distance => GroupKey::Distance(distance),
            Grouping::DistanceComp => GroupKey::DistanceComp(distance, record.is_comp),
        }
    }
}

#[derive(Default)]
struct Totals {
    arrow_average: f64,
    distance: f64,
    arrows: f64,
    golds_pct: f64,
    count: usize,
}

/// Group means ordered by key.
pub fn summarize(records: &[Record], grouping: Grouping) -> Result<Vec<GroupSummary>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let set = features::derive(records)?;

    let mut groups: BTreeMap<GroupKey, Totals> = BTreeMap::new();
    for (record, side) in records.iter().zip(&set.side) {
        let key = grouping.key(record, side.day_of_week, side.year, side.month);
        let entry = groups.entry(key).or_default();
        entry.arrow_average += record.arrow_average;
        entry.distance += record.distance;
        entry.arrows += record.arrows as f64;
        entry.golds_pct += side.golds_pct;
        entry.count += 1;
    }

    Ok(groups
        .into_iter()
        .map(|(key, totals)| {
            let n = totals.count as f64;
            GroupSummary {
                key,
                mean_arrow_average: totals.arrow_average / n,
                mean_distance: totals.distance / n,
                mean_arrows: totals.arrows / n,
                mean_golds_pct: totals.golds_pct / n,
                count: totals.count,
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSpread {
    pub distance: DistanceKey,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Lowest, mean and highest arrow average at each distance.
pub fn distance_spread(records: &[Record]) -> Vec<DistanceSpread> {
    let mut by_distance: BTreeMap<DistanceKey, Vec<f64>> = BTreeMap::new();
    for record in records {
        by_distance
            .entry(DistanceKey::from_yards(record.distance))
            .or_default()
            .push(record.arrow_average);
    }

    by_distance
        .into_iter()
        .map(|(distance, averages)| DistanceSpread {
            distance,
            min: averages.iter().copied().fold(f64::INFINITY, f64::min),
            mean: averages.iter().sum::<f64>() / averages.len() as f64,
            max: averages.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect()
}

pub fn arrows_per_day(records: &[Record]) -> BTreeMap<NaiveDate, u64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.date).or_insert(0) += record.arrows as u64;
    }
    totals
}

fn write_summary_table(output: &mut String, summaries: &[GroupSummary]) {
    let _ = writeln!(
        output,
        "| Group | Avg arrow | Avg distance | Avg arrows | Gold % | Sessions |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for summary in summaries {
        let _ = writeln!(
            output,
            "| {} | {:.3} | {:.2} | {:.1} | {:.2} | {} |",
            summary.key,
            summary.mean_arrow_average,
            summary.mean_distance,
            summary.mean_arrows,
            summary.mean_golds_pct,
            summary.count
        );
    }
}

pub fn build_report(season: Season, year: i32, records: &[Record]) -> Result<String> {
    let mut output = String::new();

    let _ = writeln!(output, "# {} Score Report {}", season.title(), year);
    let _ = writeln!(output);

    if records.is_empty() {
        let _ = writeln!(output, "No sessions recorded for this season.");
        return Ok(output);
    }

    let daily = arrows_per_day(records);
    let total_arrows: u64 = daily.values().sum();
    let _ = writeln!(
        output,
        "Analysis derived from {} arrows across {} sessions.",
        total_arrows,
        records.len()
    );

    for grouping in Grouping::ALL {
        let summaries = summarize(records, grouping)?;
        let _ = writeln!(output);
        let _ = writeln!(output, "## Grouped by {}", grouping.title());
        write_summary_table(&mut output, &summaries);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Arrow Average Range by Distance");
    for spread in distance_spread(records) {
        let mut cleared = Vec::new();
        if spread.mean >= COMPOUND_252_AVERAGE {
            cleared.push("compound");
        }
        if spread.mean >= RECURVE_252_AVERAGE {
            cleared.push("recurve");
        }
        let _ = writeln!(
            output,
            "- {} yds: min {:.2}, mean {:.2}, max {:.2}{}",
            spread.distance,
            spread.min,
            spread.mean,
            spread.max,
            if cleared.is_empty() {
                String::new()
            } else {
                format!(" (252 {} boundary met)", cleared.join(" and "))
            }
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Arrows per Day");
    for (date, arrows) in &daily {
        let _ = writeln!(output, "- {date}: {arrows}");
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;

    fn record(day: u32, distance: f64, arrow_average: f64, is_comp: bool) -> Record {
        Record {
            arrow_average,
            distance,
            // 2024-05-06 is a Monday.
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            golds: 9,
            arrows: 36,
            is_comp,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record(6, 50.0, 8.0, false),
            record(7, 50.0, 9.0, true),
            record(13, 30.0, 9.5, false),
            record(13, 50.0, 7.0, false),
        ]
    }

    #[test]
    fn groups_by_day_of_week_in_order() {
        let summaries = summarize(&sample(), Grouping::DayOfWeek).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].key, GroupKey::DayOfWeek(0));
        assert_eq!(summaries[0].count, 3);
        assert!((summaries[0].mean_arrow_average - 24.5 / 3.0).abs() < 1e-9);
        assert_eq!(summaries[1].key, GroupKey::DayOfWeek(1));
        assert_eq!(summaries[1].mean_golds_pct, 25.0);
        assert_eq!(summaries[1].mean_arrows, 36.0);
    }

    #[test]
    fn groups_by_distance_and_competition() {
        let summaries = summarize(&sample(), Grouping::DistanceComp).unwrap();
        let keys: Vec<String> = summaries.iter().map(|s| s.key.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "30.00 yds, practice",
                "50.00 yds, practice",
                "50.00 yds, competition"
            ]
        );
        assert_eq!(summaries[1].count, 2);
        assert_eq!(summaries[1].mean_arrow_average, 7.5);
    }

    #[test]
    fn month_groupings_include_distance_when_asked() {
        assert_eq!(summarize(&sample(), Grouping::YearMonth).unwrap().len(), 1);
        let by_distance = summarize(&sample(), Grouping::DistanceYearMonth).unwrap();
        assert_eq!(by_distance.len(), 2);
        assert_eq!(
            by_distance[0].key,
            GroupKey::DistanceYearMonth(DistanceKey::from_yards(30.0), 2024, 5)
        );
    }

    #[test]
    fn zero_arrow_sessions_fail_summaries() {
        let mut records = sample();
        records[2].arrows = 0;
        assert!(matches!(
            summarize(&records, Grouping::Distance),
            Err(TrackerError::ZeroArrows { .. })
        ));
    }

    #[test]
    fn spread_and_daily_totals() {
        let spread = distance_spread(&sample());
        assert_eq!(spread.len(), 2);
        assert_eq!(spread[1].min, 7.0);
        assert_eq!(spread[1].max, 9.0);
        assert_eq!(spread[1].mean, 8.0);

        let daily = arrows_per_day(&sample());
        assert_eq!(daily.values().sum::<u64>(), 144);
        assert_eq!(daily[&NaiveDate::from_ymd_opt(2024, 5, 13).unwrap()], 72);
    }

    #[test]
    fn report_lists_every_grouping() {
        let report = build_report(Season::Outdoors, 2024, &sample()).unwrap();
        assert!(report.starts_with("# Outdoors Score Report 2024"));
        assert!(report.contains("Analysis derived from 144 arrows across 4 sessions."));
        for grouping in Grouping::ALL {
            assert!(report.contains(&format!("## Grouped by {}", grouping.title())));
        }
        assert!(report.contains("- 30.00 yds: min 9.50, mean 9.50, max 9.50 (252 compound and recurve boundary met)"));
    }

    #[test]
    fn empty_report_says_so() {
        let report = build_report(Season::Indoors, 2024, &[]).unwrap();
        assert!(report.contains("No sessions recorded"));
    }
}
