//! Sight-marking estimates from a handful of measured marks.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TrackerError};
use crate::models::Units;
use crate::predictor::LinearMap;

pub const YARD_DISTANCES: [u32; 10] = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
pub const METRE_DISTANCES: [u32; 11] = [10, 18, 20, 30, 40, 50, 60, 70, 80, 90, 100];

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SightMark {
    /// Yards.
    pub distance: f64,
    pub sight_marking: f64,
}

pub fn load_marks(path: &Path) -> Result<Vec<SightMark>> {
    let file = std::fs::File::open(path).map_err(|e| TrackerError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut marks = Vec::new();
    for result in reader.deserialize::<SightMark>() {
        marks.push(result?);
    }
    Ok(marks)
}

#[derive(Debug, Clone)]
pub struct SightModel {
    line: LinearMap<1, 1>,
}

impl SightModel {
    pub fn fit(marks: &[SightMark]) -> Result<Self> {
        if marks.len() < 2 {
            return Err(TrackerError::InsufficientData {
                what: "sight marks",
                found: marks.len(),
                required: 2,
            });
        }
        let x: Vec<[f64; 1]> = marks.iter().map(|m| [m.distance]).collect();
        let y: Vec<[f64; 1]> = marks.iter().map(|m| [m.sight_marking]).collect();
        Ok(Self {
            line: LinearMap::fit(&x, &y)?,
        })
    }

    pub fn mark_for_yards(&self, yards: f64) -> f64 {
        self.line.apply(&[yards])[0]
    }

    /// Estimated mark for each distance, keyed by the distance as entered.
    pub fn ladder(&self, distances: &[u32], units: Units) -> Vec<(u32, f64)> {
        distances
            .iter()
            .map(|&d| (d, self.mark_for_yards(d as f64 * units.factor())))
            .collect()
    }
}

pub fn render_ladders(model: &SightModel) -> String {
    let mut output = String::new();
    for (distances, units) in [
        (&YARD_DISTANCES[..], Units::Yards),
        (&METRE_DISTANCES[..], Units::Metres),
    ] {
        for (distance, mark) in model.ladder(distances, units) {
            output.push_str(&format!("{distance}{} : {mark:.2}\n", units.label()));
        }
        output.push('\n');
    }
    output
}
