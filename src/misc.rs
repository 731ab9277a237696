use serde::Serialize;

/// One point forecast as submitted to the prediction API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub symbol: String,
    pub predicted_price: f64,
    pub confidence_interval: f64,
    pub target_date: String,
    pub model: String,
}
