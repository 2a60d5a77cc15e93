use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};
use crate::models::{Record, Season};

pub const HEADER: &str = "arrow_average,distance,date,golds,arrows,is_comp";

/// Season files for one calendar year under a data directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
    year: i32,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>, year: i32) -> Self {
        Self {
            root: root.into(),
            year,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn path_for(&self, season: Season) -> PathBuf {
        self.root.join(file_name(season, self.year))
    }

    pub fn load(&self, season: Season) -> Result<Vec<Record>> {
        load_path(&self.path_for(season))
    }

    /// Appends one record. A missing file is created with a header row; a missing
    /// directory is an error unless `create_dirs` is set.
    pub fn append(&self, season: Season, record: &Record, create_dirs: bool) -> Result<PathBuf> {
        let path = self.path_for(season);
        if create_dirs {
            std::fs::create_dir_all(&self.root).map_err(|e| TrackerError::io(&self.root, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TrackerError::io(&path, e))?;
        let is_new = file
            .metadata()
            .map_err(|e| TrackerError::io(&path, e))?
            .len()
            == 0;

        let mut line = String::new();
        if is_new {
            line.push_str(HEADER);
        }
        line.push_str(&format_row(record));
        file.write_all(line.as_bytes())
            .map_err(|e| TrackerError::io(&path, e))?;

        log::debug!("appended session on {} to {}", record.date, path.display());
        Ok(path)
    }
}

pub fn file_name(season: Season, year: i32) -> String {
    format!("arrow_scores_{}_{:02}.csv", season, year.rem_euclid(100))
}

/// Newline-prefixed row in the fixed column order of [`HEADER`].
pub fn format_row(record: &Record) -> String {
    format!(
        "\n{:.2},{:.2},\"{}\",{},{},{}",
        record.arrow_average,
        record.distance,
        record.date.format("%Y-%m-%d"),
        record.golds,
        record.arrows,
        u8::from(record.is_comp)
    )
}

pub fn load_path(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).map_err(|e| TrackerError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut records = Vec::new();
    for result in reader.deserialize::<Record>() {
        records.push(result?);
    }

    log::debug!("loaded {} sessions from {}", records.len(), path.display());
    Ok(records)
}

/// Records ordered by distance ascending, then arrow average descending.
pub fn sorted_for_display(records: &[Record]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(b.arrow_average.total_cmp(&a.arrow_average))
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn session(date: NaiveDate, arrow_average: f64, distance: f64) -> Record {
        Record {
            arrow_average,
            distance,
            date,
            golds: 12,
            arrows: 36,
            is_comp: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn file_name_uses_two_digit_year() {
        assert_eq!(
            file_name(Season::Outdoors, 2024),
            "arrow_scores_outdoors_24.csv"
        );
        assert_eq!(file_name(Season::Indoors, 2005), "arrow_scores_indoors_05.csv");
    }

    #[test]
    fn row_uses_fixed_formatting() {
        let mut record = session(date(2024, 5, 3), 9.0, 54.6805);
        record.is_comp = true;
        assert_eq!(format_row(&record), "\n9.00,54.68,\"2024-05-03\",12,36,1");
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path(), 2024);
        let first = session(date(2024, 4, 1), 8.5, 50.0);
        let mut second = session(date(2024, 4, 8), 9.123, 30.0 * 1.09361);
        second.is_comp = true;

        store.append(Season::Outdoors, &first, false).unwrap();
        store.append(Season::Outdoors, &second, false).unwrap();

        let loaded = store.load(Season::Outdoors).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], first);
        assert_eq!(loaded[1].date, second.date);
        assert_eq!(loaded[1].arrow_average, 9.12);
        assert_eq!(loaded[1].distance, 32.81);
        assert!(loaded[1].is_comp);
    }

    #[test]
    fn seasons_are_partitioned() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path(), 2024);
        store
            .append(Season::Indoors, &session(date(2024, 1, 10), 9.5, 20.0), false)
            .unwrap();

        assert_eq!(store.load(Season::Indoors).unwrap().len(), 1);
        assert!(matches!(
            store.load(Season::Outdoors),
            Err(TrackerError::Io { .. })
        ));
    }

    #[test]
    fn missing_directory_fails_without_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("absent"), 2024);
        let record = session(date(2024, 4, 1), 8.5, 50.0);

        let err = store.append(Season::Outdoors, &record, false).unwrap_err();
        assert!(matches!(err, TrackerError::Io { .. }));

        store.append(Season::Outdoors, &record, true).unwrap();
        assert_eq!(store.load(Season::Outdoors).unwrap(), vec![record]);
    }

    #[test]
    fn load_is_header_driven() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(
            &path,
            "date, is_comp, arrows, golds, distance, arrow_average\n\"2023-06-01\",True,72,20,60,8.75\n",
        )
        .unwrap();

        let records = load_path(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].distance, 60.0);
        assert_eq!(records[0].golds, 20);
        assert!(records[0].is_comp);
    }

    #[test]
    fn malformed_rows_are_data_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, format!("{HEADER}\n9.0,50,\"not a date\",1,2,0")).unwrap();

        assert!(matches!(load_path(&path), Err(TrackerError::Csv(_))));
    }

    #[test]
    fn display_order_is_distance_then_best_average() {
        let records = vec![
            session(date(2024, 4, 1), 8.0, 50.0),
            session(date(2024, 4, 2), 9.0, 30.0),
            session(date(2024, 4, 3), 9.5, 50.0),
        ];
        let sorted = sorted_for_display(&records);
        let averages: Vec<f64> = sorted.iter().map(|r| r.arrow_average).collect();
        assert_eq!(averages, vec![9.0, 9.5, 8.0]);
    }
}
