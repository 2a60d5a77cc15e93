use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Deserializer};

/// Yards per metre. Distances are stored in yards.
pub const METRES_TO_YARDS: f64 = 1.09361;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Season {
    Outdoors,
    Indoors,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Outdoors => "outdoors",
            Season::Indoors => "indoors",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Season::Outdoors => "Outdoors",
            Season::Indoors => "Indoors",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "outdoors" => Ok(Season::Outdoors),
            "indoors" => Ok(Season::Indoors),
            other => Err(format!("unknown season '{other}', use outdoors or indoors")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Units {
    #[value(name = "yds")]
    Yards,
    #[value(name = "m")]
    Metres,
}

impl Units {
    /// Multiplier that converts a distance in these units to yards.
    pub fn factor(&self) -> f64 {
        match self {
            Units::Yards => 1.0,
            Units::Metres => METRES_TO_YARDS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Units::Yards => "yds",
            Units::Metres => "m",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    pub arrow_average: f64,
    pub distance: f64,
    pub date: NaiveDate,
    pub golds: u32,
    pub arrows: u32,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_comp: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid competition flag '{other}'"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub distance: f64,
    pub days_since_first_entry: f64,
    pub is_comp: bool,
}

impl FeatureVector {
    pub fn as_array(&self) -> [f64; 3] {
        [
            self.distance,
            self.days_since_first_entry,
            if self.is_comp { 1.0 } else { 0.0 },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Targets {
    pub avg_score: f64,
    pub gold_pct: f64,
}

impl Targets {
    pub fn as_array(&self) -> [f64; 2] {
        [self.avg_score, self.gold_pct]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideInfo {
    pub golds_pct: f64,
    /// Monday is 0.
    pub day_of_week: u32,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub avg_score: f64,
    pub gold_pct: f64,
}

/// Hundredths of a yard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DistanceKey(pub i64);

impl DistanceKey {
    pub fn from_yards(distance: f64) -> Self {
        DistanceKey((distance * 100.0).round() as i64)
    }

    pub fn yards(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for DistanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.yards())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    DayOfWeek(u32),
    YearMonth(i32, u32),
    DistanceYearMonth(DistanceKey, i32, u32),
    Distance(DistanceKey),
    DistanceComp(DistanceKey, bool),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::DayOfWeek(day) => f.write_str(weekday_name(*day)),
            GroupKey::YearMonth(year, month) => write!(f, "{year}-{month:02}"),
            GroupKey::DistanceYearMonth(distance, year, month) => {
                write!(f, "{distance} yds, {year}-{month:02}")
            }
            GroupKey::Distance(distance) => write!(f, "{distance} yds"),
            GroupKey::DistanceComp(distance, is_comp) => write!(
                f,
                "{distance} yds, {}",
                if *is_comp { "competition" } else { "practice" }
            ),
        }
    }
}

pub fn weekday_name(day: u32) -> &'static str {
    match day {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub key: GroupKey,
    pub mean_arrow_average: f64,
    pub mean_distance: f64,
    pub mean_arrows: f64,
    pub mean_golds_pct: f64,
    pub count: usize,
}
