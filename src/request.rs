use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Result, TrackerError};
use crate::models::{PredictionResult, Record, Season, Units};
use crate::predictor::Predictor;
use crate::store::RecordStore;

/// Target distances offered for both requests, in the request's own units.
pub const DISTANCES: [u32; 11] = [10, 18, 20, 30, 40, 50, 60, 70, 80, 90, 100];

#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub season: Season,
    pub distance: u32,
    pub units: Units,
    pub target_date: NaiveDate,
    pub is_comp: bool,
}

impl PredictionRequest {
    pub fn validate(&self) -> Result<()> {
        check_distance(self.distance)
    }

    pub fn distance_yards(&self) -> f64 {
        self.distance as f64 * self.units.factor()
    }
}

#[derive(Debug, Clone)]
pub struct NewScoreRequest {
    pub season: Season,
    pub arrow_average: f64,
    pub distance: u32,
    pub units: Units,
    pub date: NaiveDate,
    pub golds: u32,
    pub total_arrows: u32,
    pub is_comp: bool,
}

impl NewScoreRequest {
    pub fn validate(&self) -> Result<()> {
        check_distance(self.distance)?;
        if !self.arrow_average.is_finite() || !(0.0..=10.0).contains(&self.arrow_average) {
            return Err(TrackerError::invalid(format!(
                "arrow_average {} must be between 0 and 10",
                self.arrow_average
            )));
        }
        if self.total_arrows == 0 {
            return Err(TrackerError::invalid("total_arrows must be at least 1"));
        }
        if self.golds > self.total_arrows {
            return Err(TrackerError::invalid(format!(
                "golds ({}) cannot exceed total_arrows ({})",
                self.golds, self.total_arrows
            )));
        }
        Ok(())
    }

    /// Validated record with the distance converted to yards.
    pub fn to_record(&self) -> Result<Record> {
        self.validate()?;
        Ok(Record {
            arrow_average: self.arrow_average,
            distance: self.distance as f64 * self.units.factor(),
            date: self.date,
            golds: self.golds,
            arrows: self.total_arrows,
            is_comp: self.is_comp,
        })
    }
}

fn check_distance(distance: u32) -> Result<()> {
    if DISTANCES.contains(&distance) {
        Ok(())
    } else {
        Err(TrackerError::invalid(format!(
            "distance {distance} is not one of {DISTANCES:?}"
        )))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub distance: f64,
    pub on_date: String,
    pub is_comp: bool,
    pub predicted_avg_score: String,
    pub predicted_gold_pct: String,
}

impl PredictionResponse {
    pub fn new(distance: f64, on_date: NaiveDate, is_comp: bool, result: PredictionResult) -> Self {
        Self {
            distance,
            on_date: on_date.format("%A %d %B %Y").to_string(),
            is_comp,
            predicted_avg_score: format!("{:.3}", result.avg_score),
            predicted_gold_pct: format!("{:.2}", result.gold_pct),
        }
    }
}

impl fmt::Display for PredictionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Prediction for {} at {:.2} yds{}",
            self.on_date,
            self.distance,
            if self.is_comp { " (competition)" } else { "" }
        )?;
        writeln!(f, "- average arrow score: {}", self.predicted_avg_score)?;
        write!(f, "- gold percentage: {}%", self.predicted_gold_pct)
    }
}

pub fn handle_prediction(
    predictor: &Predictor,
    request: &PredictionRequest,
) -> Result<PredictionResponse> {
    request.validate()?;
    let distance = request.distance_yards();
    let input = predictor.features_for(distance, request.target_date, request.is_comp)?;
    let result = predictor.predict(&input);
    log::debug!("{} prediction {result:?} for {input:?}", request.season);
    Ok(PredictionResponse::new(
        distance,
        request.target_date,
        request.is_comp,
        result,
    ))
}

pub fn handle_new_score(
    store: &RecordStore,
    request: &NewScoreRequest,
    create_dirs: bool,
) -> Result<PathBuf> {
    let record = request.to_record()?;
    store.append(request.season, &record, create_dirs)
}
