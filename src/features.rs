use chrono::{Datelike, Timelike};
use ndarray::{Array1, Array2};

use crate::error::PredictionError;
use crate::loader::PriceRecord;

pub const FEATURE_DIM: usize = 7;

pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "price_lagged",
    "volume24h",
    "high24h",
    "low24h",
    "price_change_percent24h",
    "hour_of_day",
    "day_of_week",
];

/// Assembled per-symbol training data: one feature row per record,
/// label = price. Built fresh for every pipeline run.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Derives calendar features and assembles the fixed-order feature matrix.
/// Missing values are not imputed; they propagate as NaN and the fit
/// rejects them.
pub fn build_features(records: &[PriceRecord]) -> Result<FeatureFrame, PredictionError> {
    if records.is_empty() {
        return Err(PredictionError::EmptyDataset);
    }

    let mut values = Vec::with_capacity(records.len() * FEATURE_DIM);
    let mut labels = Vec::with_capacity(records.len());

    for record in records {
        let price = as_feature(record.price);
        // price_lagged is the current price copied as-is; no shift against a
        // prior time step yet
        values.push(price);
        values.push(as_feature(record.volume_24h));
        values.push(as_feature(record.high_24h));
        values.push(as_feature(record.low_24h));
        values.push(as_feature(record.price_change_percent_24h));
        values.push(f64::from(record.timestamp.hour()));
        // 1 = Sunday .. 7 = Saturday
        values.push(f64::from(
            record.timestamp.weekday().num_days_from_sunday() + 1,
        ));
        labels.push(price);
    }

    let features = Array2::from_shape_vec((records.len(), FEATURE_DIM), values)?;
    Ok(FeatureFrame {
        features,
        labels: Array1::from_vec(labels),
    })
}

fn as_feature(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(price: Option<f64>, timestamp: &str) -> PriceRecord {
        PriceRecord {
            id: "1".to_string(),
            symbol: "BTCUSDT".to_string(),
            price,
            volume_24h: Some(1200.0),
            market_cap: Some(5.0e7),
            high_24h: Some(43000.0),
            low_24h: Some(41000.0),
            price_change_percent_24h: Some(1.2),
            timestamp: timestamp.parse().unwrap(),
        }
    }

    #[test]
    fn assembles_fixed_order_features() {
        // 2024-01-15 is a Monday
        let rows = vec![record(Some(42000.5), "2024-01-15T10:30:00Z")];
        let frame = build_features(&rows).unwrap();

        assert_eq!(frame.features.shape(), &[1, FEATURE_DIM]);
        let row: Vec<f64> = frame.features.row(0).to_vec();
        assert_eq!(row, vec![42000.5, 1200.0, 43000.0, 41000.0, 1.2, 10.0, 2.0]);
        assert_eq!(frame.labels[0], 42000.5);
    }

    #[test]
    fn day_of_week_starts_at_sunday() {
        let sunday = Utc.with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap();
        let mut row = record(Some(1.0), "2024-01-15T00:00:00Z");
        row.timestamp = sunday;

        let frame = build_features(&[row]).unwrap();
        assert_eq!(frame.features[[0, 6]], 1.0);
    }

    #[test]
    fn nulls_propagate_as_nan() {
        let mut row = record(None, "2024-01-15T10:30:00Z");
        row.volume_24h = None;

        let frame = build_features(&[row]).unwrap();
        assert!(frame.features[[0, 0]].is_nan());
        assert!(frame.features[[0, 1]].is_nan());
        assert!(frame.labels[0].is_nan());
        // calendar features still derive from the timestamp
        assert_eq!(frame.features[[0, 5]], 10.0);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            build_features(&[]),
            Err(PredictionError::EmptyDataset)
        ));
    }
}
