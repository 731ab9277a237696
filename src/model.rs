use chrono::{DateTime, Duration, Utc};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::PredictionError;
use crate::features::{FEATURE_NAMES, FeatureFrame};
use crate::misc::ForecastPoint;

pub const MODEL_NAME: &str = "LinearRegression";
pub const SPLIT_SEED: u64 = 42;
pub const HORIZONS_DAYS: [i64; 3] = [1, 7, 30];

const TRAIN_FRACTION: f64 = 0.8;
const REG_STRENGTH: f64 = 0.3;
const L1_RATIO: f64 = 0.8;
const MAX_ITER: usize = 10;
const DAILY_DRIFT: f64 = 0.01;

/// Coefficients of one fitted regression; owned by a single pipeline run,
/// never reused across symbols.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl FittedModel {
    pub fn predict(&self, features: &Array2<f64>) -> Array1<f64> {
        features.dot(&self.coefficients) + self.intercept
    }
}

/// Fit outcome: the model plus its held-out error.
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub model: FittedModel,
    pub rmse: f64,
    pub train_rows: usize,
    pub eval_rows: usize,
}

/// Splits the frame 80/20 with a fixed seed, fits the elastic-net
/// regression on the training partition and scores RMSE on the rest.
pub fn train_and_evaluate(frame: &FeatureFrame) -> Result<ModelReport, PredictionError> {
    check_finite(frame)?;

    let (train_idx, eval_idx) = split_indices(frame.len(), SPLIT_SEED);
    if train_idx.is_empty() || eval_idx.is_empty() {
        return Err(PredictionError::DegenerateTraining(
            "empty train or eval partition",
        ));
    }

    let train = select(frame, &train_idx);
    let eval = select(frame, &eval_idx);

    let model = fit_elastic_net(&train)?;
    let rmse = rmse(&model, &eval);

    Ok(ModelReport {
        model,
        rmse,
        train_rows: train_idx.len(),
        eval_rows: eval_idx.len(),
    })
}

/// Produces the three fixed-horizon forecasts for a symbol. The "latest"
/// price is the top label ordered descending by price, i.e. the highest
/// price seen, not the newest row.
pub fn forecast(
    symbol: &str,
    frame: &FeatureFrame,
    report: &ModelReport,
    now: DateTime<Utc>,
) -> Vec<ForecastPoint> {
    let latest_price = frame
        .labels
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    HORIZONS_DAYS
        .iter()
        .map(|&days_ahead| {
            // flat drift ramp off the latest price; the fitted coefficients
            // only back the reported error figure
            let predicted = latest_price * (1.0 + DAILY_DRIFT * days_ahead as f64);
            let target_date = now + Duration::days(days_ahead);

            ForecastPoint {
                symbol: symbol.to_string(),
                predicted_price: predicted,
                confidence_interval: report.rmse,
                target_date: target_date.to_rfc3339(),
                model: MODEL_NAME.to_string(),
            }
        })
        .collect()
}

fn split_indices(len: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_len = (len as f64 * TRAIN_FRACTION).floor() as usize;
    let eval = indices.split_off(train_len);
    (indices, eval)
}

fn select(frame: &FeatureFrame, indices: &[usize]) -> FeatureFrame {
    let labels: Vec<f64> = indices.iter().map(|&i| frame.labels[i]).collect();
    FeatureFrame {
        features: frame.features.select(Axis(0), indices),
        labels: Array1::from_vec(labels),
    }
}

fn check_finite(frame: &FeatureFrame) -> Result<(), PredictionError> {
    for (row, features) in frame.features.outer_iter().enumerate() {
        for (col, value) in features.iter().enumerate() {
            if !value.is_finite() {
                return Err(PredictionError::NonFiniteFeatures {
                    column: FEATURE_NAMES[col],
                    row,
                });
            }
        }
    }

    for (row, value) in frame.labels.iter().enumerate() {
        if !value.is_finite() {
            return Err(PredictionError::NonFiniteFeatures {
                column: "label",
                row,
            });
        }
    }

    Ok(())
}

/// Cyclic coordinate descent with soft-thresholding over z-scored
/// features and centered labels, then mapped back to the raw scale.
fn fit_elastic_net(train: &FeatureFrame) -> Result<FittedModel, PredictionError> {
    let n = train.len();
    let dim = train.features.ncols();

    let x_mean = train
        .features
        .mean_axis(Axis(0))
        .ok_or(PredictionError::DegenerateTraining("empty training partition"))?;
    let x_std = train.features.std_axis(Axis(0), 0.0);
    let y_mean = train
        .labels
        .mean()
        .ok_or(PredictionError::DegenerateTraining("empty training partition"))?;

    let label_variance = train
        .labels
        .iter()
        .map(|y| (y - y_mean).powi(2))
        .sum::<f64>()
        / n as f64;
    if label_variance == 0.0 {
        return Err(PredictionError::DegenerateTraining("zero label variance"));
    }

    // z-score; zero-variance columns carry no signal and stay zeroed
    let mut z = Array2::<f64>::zeros((n, dim));
    for i in 0..n {
        for j in 0..dim {
            if x_std[j] > 1e-10 {
                z[[i, j]] = (train.features[[i, j]] - x_mean[j]) / x_std[j];
            }
        }
    }
    let y_centered = train.labels.mapv(|y| y - y_mean);

    let l1 = REG_STRENGTH * L1_RATIO;
    let l2 = REG_STRENGTH * (1.0 - L1_RATIO);
    let mut beta = Array1::<f64>::zeros(dim);
    let mut residual = y_centered;

    for _ in 0..MAX_ITER {
        for j in 0..dim {
            let column = z.column(j);
            let col_sq = column.dot(&column) / n as f64;
            if col_sq == 0.0 {
                continue;
            }

            let rho = column.dot(&residual) / n as f64 + col_sq * beta[j];
            let updated = soft_threshold(rho, l1) / (col_sq + l2);
            let delta = updated - beta[j];
            if delta != 0.0 {
                residual.scaled_add(-delta, &column);
                beta[j] = updated;
            }
        }
    }

    // back to the raw feature scale
    let mut coefficients = Array1::<f64>::zeros(dim);
    for j in 0..dim {
        if x_std[j] > 1e-10 {
            coefficients[j] = beta[j] / x_std[j];
        }
    }
    let intercept = y_mean - coefficients.dot(&x_mean);

    Ok(FittedModel {
        coefficients,
        intercept,
    })
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

fn rmse(model: &FittedModel, eval: &FeatureFrame) -> f64 {
    let predictions = model.predict(&eval.features);
    let mse = predictions
        .iter()
        .zip(eval.labels.iter())
        .map(|(predicted, actual)| (predicted - actual).powi(2))
        .sum::<f64>()
        / eval.len() as f64;
    mse.sqrt()
}
