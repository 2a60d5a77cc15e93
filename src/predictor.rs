use chrono::NaiveDate;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, TrackerError};
use crate::features::FeatureSet;
use crate::linalg;
use crate::models::{FeatureVector, PredictionResult, Targets};

pub const MAX_AVG_SCORE: f64 = 10.0;
pub const MAX_GOLD_PCT: f64 = 100.0;

/// Affine map fitted by ordinary least squares: `y = x · coefficients + intercept`.
///
/// Columns are mean-centered and solved together with one minimum-norm SVD
/// solve, which is the same as one single-output fit per target.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMap<const P: usize, const T: usize> {
    pub coefficients: [[f64; T]; P],
    pub intercept: [f64; T],
}

impl<const P: usize, const T: usize> LinearMap<P, T> {
    pub fn fit(x: &[[f64; P]], y: &[[f64; T]]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(TrackerError::invalid(format!(
                "{} feature rows but {} target rows",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(TrackerError::InsufficientData {
                what: "regression input",
                found: 0,
                required: 1,
            });
        }

        let n = x.len();
        let design = Array2::from_shape_fn((n, P), |(i, j)| x[i][j]);
        let targets = Array2::from_shape_fn((n, T), |(i, t)| y[i][t]);
        let x_mean = design.sum_axis(Axis(0)) / n as f64;
        let y_mean = targets.sum_axis(Axis(0)) / n as f64;

        let solution = linalg::least_squares(&(&design - &x_mean), &(&targets - &y_mean))?;
        let offset = &y_mean - &x_mean.dot(&solution);

        let mut coefficients = [[0.0; T]; P];
        for j in 0..P {
            for t in 0..T {
                coefficients[j][t] = solution[(j, t)];
            }
        }
        let mut intercept = [0.0; T];
        for t in 0..T {
            intercept[t] = offset[t];
        }

        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn apply(&self, x: &[f64; P]) -> [f64; T] {
        let mut out = self.intercept;
        for (j, value) in x.iter().enumerate() {
            for t in 0..T {
                out[t] += value * self.coefficients[j][t];
            }
        }
        out
    }

    /// Coefficient of determination averaged uniformly over the outputs.
    /// `None` when fewer than two rows are scored.
    pub fn score(&self, x: &[[f64; P]], y: &[[f64; T]]) -> Option<f64> {
        if x.len() < 2 || x.len() != y.len() {
            return None;
        }

        let n = y.len() as f64;
        let mut total = 0.0;
        for t in 0..T {
            let mean = y.iter().map(|row| row[t]).sum::<f64>() / n;
            let ss_tot: f64 = y.iter().map(|row| (row[t] - mean).powi(2)).sum();
            let ss_res: f64 = x
                .iter()
                .zip(y)
                .map(|(features, row)| (row[t] - self.apply(features)[t]).powi(2))
                .sum();

            total += if ss_tot > 0.0 {
                1.0 - ss_res / ss_tot
            } else if ss_res == 0.0 {
                1.0
            } else {
                0.0
            };
        }
        Some(total / T as f64)
    }
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub test_fraction: f64,
    pub seed: u64,
    /// Fail instead of warning when a partition has no competition sessions.
    pub require_comp_data: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 864,
            require_comp_data: false,
        }
    }
}

/// Diagnostics from a fit. Scores never gate anything.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub train_len: usize,
    pub test_len: usize,
    pub train_score: Option<f64>,
    pub test_score: Option<f64>,
}

/// Maps {distance, days since first entry, competition} to {average arrow score, gold %}.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    map: LinearMap<3, 2>,
}

impl FittedModel {
    #[cfg(test)]
    pub fn from_parts(coefficients: [[f64; 2]; 3], intercept: [f64; 2]) -> Self {
        Self {
            map: LinearMap {
                coefficients,
                intercept,
            },
        }
    }

    pub fn coefficients(&self) -> &[[f64; 2]; 3] {
        &self.map.coefficients
    }

    pub fn intercept(&self) -> &[f64; 2] {
        &self.map.intercept
    }

    /// Raw linear combination, before any clamping.
    pub fn predict_raw(&self, input: &FeatureVector) -> PredictionResult {
        let [avg_score, gold_pct] = self.map.apply(&input.as_array());
        PredictionResult {
            avg_score,
            gold_pct,
        }
    }

    pub fn predict(&self, input: &FeatureVector) -> PredictionResult {
        sanitize(self.predict_raw(input))
    }
}

/// Caps the average at 10 and the gold percentage at 100. Lower bounds are not
/// enforced; negative values pass through.
pub fn sanitize(raw: PredictionResult) -> PredictionResult {
    let avg_score = if raw.avg_score > MAX_AVG_SCORE {
        MAX_AVG_SCORE
    } else {
        raw.avg_score
    };
    let gold_pct = if raw.gold_pct > MAX_GOLD_PCT {
        MAX_GOLD_PCT
    } else {
        raw.gold_pct
    };

    if avg_score < 0.0 || gold_pct < 0.0 {
        log::warn!(
            "negative prediction passed through unclamped (avg {avg_score:.3}, gold {gold_pct:.2}%)"
        );
    }

    PredictionResult {
        avg_score,
        gold_pct,
    }
}

/// Deterministic shuffle split. Returns (train, test) row indices; the test
/// partition holds `ceil(n * test_fraction)` rows.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(TrackerError::invalid(format!(
            "test fraction {test_fraction} must be in [0, 1)"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = (n as f64 * test_fraction).ceil() as usize;
    let train = indices.split_off(test_len.min(n));
    Ok((train, indices))
}

pub fn fit(
    features: &[FeatureVector],
    targets: &[Targets],
    options: &FitOptions,
) -> Result<(FittedModel, FitReport)> {
    if features.len() != targets.len() {
        return Err(TrackerError::invalid(format!(
            "{} feature rows but {} target rows",
            features.len(),
            targets.len()
        )));
    }

    let (train, test) = train_test_split(features.len(), options.test_fraction, options.seed)?;
    if train.len() < 2 {
        return Err(TrackerError::InsufficientData {
            what: "training partition",
            found: train.len(),
            required: 2,
        });
    }
    log::debug!(
        "split {} sessions into {} train / {} test",
        features.len(),
        train.len(),
        test.len()
    );

    check_competition_coverage(features, &train, "training", options)?;
    if !test.is_empty() {
        check_competition_coverage(features, &test, "test", options)?;
    }

    let gather = |rows: &[usize]| -> (Vec<[f64; 3]>, Vec<[f64; 2]>) {
        rows.iter()
            .map(|&i| (features[i].as_array(), targets[i].as_array()))
            .unzip()
    };
    let (x_train, y_train) = gather(&train);
    let (x_test, y_test) = gather(&test);

    let map = LinearMap::fit(&x_train, &y_train)?;
    let report = FitReport {
        train_len: train.len(),
        test_len: test.len(),
        train_score: map.score(&x_train, &y_train),
        test_score: map.score(&x_test, &y_test),
    };

    log::info!("train model score: {}", format_score(report.train_score));
    log::info!("test model score: {}", format_score(report.test_score));

    Ok((FittedModel { map }, report))
}

fn check_competition_coverage(
    features: &[FeatureVector],
    rows: &[usize],
    partition: &'static str,
    options: &FitOptions,
) -> Result<()> {
    if rows.iter().any(|&i| features[i].is_comp) {
        return Ok(());
    }
    if options.require_comp_data {
        return Err(TrackerError::MissingCompetitionData { partition });
    }
    log::warn!(
        "{partition} partition has no competition sessions, the competition coefficient is uninformative"
    );
    Ok(())
}

pub fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |value| format!("{value:.4}"))
}

/// A model fitted once at startup together with the time axis it was trained on.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: FittedModel,
    report: FitReport,
    first_entry: NaiveDate,
    last_entry: NaiveDate,
}

impl Predictor {
    pub fn build(set: &FeatureSet, options: &FitOptions) -> Result<Self> {
        let (model, report) = fit(&set.features, &set.targets, options)?;
        Ok(Self {
            model,
            report,
            first_entry: set.first_entry,
            last_entry: set.last_entry,
        })
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn report(&self) -> &FitReport {
        &self.report
    }

    pub fn last_entry(&self) -> NaiveDate {
        self.last_entry
    }

    pub fn features_for(
        &self,
        distance: f64,
        date: NaiveDate,
        is_comp: bool,
    ) -> Result<FeatureVector> {
        if date < self.first_entry {
            return Err(TrackerError::invalid(format!(
                "target date {date} is before the first recorded session on {}",
                self.first_entry
            )));
        }
        if !distance.is_finite() {
            return Err(TrackerError::NonFinite { field: "distance" });
        }
        Ok(FeatureVector {
            distance,
            days_since_first_entry: (date - self.first_entry).num_days() as f64,
            is_comp,
        })
    }

    pub fn predict(&self, input: &FeatureVector) -> PredictionResult {
        self.model.predict(input)
    }
}
