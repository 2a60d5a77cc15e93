use chrono::{Datelike, NaiveDate};

use crate::error::{Result, TrackerError};
use crate::models::{FeatureVector, Record, SideInfo, Targets};

/// Model-ready view of one loaded record set.
///
/// `days_since_first_entry` is relative to the earliest date in the set it was
/// derived from, so a feature set is only valid for that exact snapshot.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub first_entry: NaiveDate,
    pub last_entry: NaiveDate,
    pub features: Vec<FeatureVector>,
    pub targets: Vec<Targets>,
    pub side: Vec<SideInfo>,
}

pub fn golds_pct(record: &Record) -> Result<f64> {
    if record.arrows == 0 {
        return Err(TrackerError::ZeroArrows { date: record.date });
    }
    Ok(record.golds as f64 / record.arrows as f64 * 100.0)
}

pub fn derive(records: &[Record]) -> Result<FeatureSet> {
    let first_entry = records
        .iter()
        .map(|record| record.date)
        .min()
        .ok_or(TrackerError::InsufficientData {
            what: "score data",
            found: 0,
            required: 1,
        })?;
    let last_entry = records
        .iter()
        .map(|record| record.date)
        .max()
        .unwrap_or(first_entry);

    let mut features = Vec::with_capacity(records.len());
    let mut targets = Vec::with_capacity(records.len());
    let mut side = Vec::with_capacity(records.len());

    for record in records {
        if !record.distance.is_finite() {
            return Err(TrackerError::NonFinite { field: "distance" });
        }
        if !record.arrow_average.is_finite() {
            return Err(TrackerError::NonFinite {
                field: "arrow_average",
            });
        }

        let golds_pct = golds_pct(record)?;
        features.push(FeatureVector {
            distance: record.distance,
            days_since_first_entry: (record.date - first_entry).num_days() as f64,
            is_comp: record.is_comp,
        });
        targets.push(Targets {
            avg_score: record.arrow_average,
            gold_pct: golds_pct,
        });
        side.push(SideInfo {
            golds_pct,
            day_of_week: record.date.weekday().num_days_from_monday(),
            month: record.date.month(),
            year: record.date.year(),
        });
    }

    Ok(FeatureSet {
        first_entry,
        last_entry,
        features,
        targets,
        side,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(y: i32, m: u32, d: u32, golds: u32, arrows: u32) -> Record {
        Record {
            arrow_average: 8.8,
            distance: 50.0,
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            golds,
            arrows,
            is_comp: false,
        }
    }

    #[test]
    fn earliest_record_is_day_zero() {
        let records = vec![
            record(2024, 5, 20, 10, 36),
            record(2024, 5, 1, 10, 36),
            record(2024, 6, 2, 10, 36),
        ];
        let set = derive(&records).unwrap();
        let days: Vec<f64> = set
            .features
            .iter()
            .map(|f| f.days_since_first_entry)
            .collect();
        assert_eq!(days, vec![19.0, 0.0, 32.0]);
        assert_eq!(set.first_entry, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(set.last_entry, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }

    #[test]
    fn days_follow_date_order_and_never_go_negative() {
        let records: Vec<Record> = (1..=28).rev().map(|d| record(2024, 2, d, 5, 36)).collect();
        let set = derive(&records).unwrap();

        let mut pairs: Vec<(NaiveDate, f64)> = records
            .iter()
            .zip(&set.features)
            .map(|(r, f)| (r.date, f.days_since_first_entry))
            .collect();
        pairs.sort_by_key(|(date, _)| *date);
        assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(pairs.iter().all(|(_, days)| *days >= 0.0));
    }

    #[test]
    fn adding_an_earlier_record_shifts_the_axis() {
        let mut records = vec![record(2024, 5, 10, 1, 36)];
        assert_eq!(derive(&records).unwrap().features[0].days_since_first_entry, 0.0);

        records.push(record(2024, 5, 3, 1, 36));
        assert_eq!(derive(&records).unwrap().features[0].days_since_first_entry, 7.0);
    }

    #[test]
    fn gold_percentage_is_bounded_when_golds_fit() {
        for golds in 0..=36 {
            let pct = golds_pct(&record(2024, 1, 1, golds, 36)).unwrap();
            assert!((0.0..=100.0).contains(&pct));
        }
        assert_eq!(golds_pct(&record(2024, 1, 1, 9, 36)).unwrap(), 25.0);
    }

    #[test]
    fn zero_arrows_is_an_error() {
        let records = vec![record(2024, 1, 1, 5, 36), record(2024, 1, 2, 0, 0)];
        assert!(matches!(
            derive(&records),
            Err(TrackerError::ZeroArrows { .. })
        ));
    }

    #[test]
    fn empty_input_is_insufficient() {
        assert!(matches!(
            derive(&[]),
            Err(TrackerError::InsufficientData { found: 0, .. })
        ));
    }

    #[test]
    fn side_table_carries_calendar_fields() {
        // 2024-05-06 is a Monday.
        let set = derive(&[record(2024, 5, 6, 18, 36)]).unwrap();
        assert_eq!(set.side[0].day_of_week, 0);
        assert_eq!(set.side[0].month, 5);
        assert_eq!(set.side[0].year, 2024);
        assert_eq!(set.side[0].golds_pct, 50.0);
        assert_eq!(set.targets[0].gold_pct, 50.0);
    }
}
