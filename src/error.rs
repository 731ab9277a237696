use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config not found: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("feature matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("no rows to build features from")]
    EmptyDataset,

    #[error("non-finite value in column {column} at row {row}")]
    NonFiniteFeatures { column: &'static str, row: usize },

    #[error("degenerate training data: {0}")]
    DegenerateTraining(&'static str),

    #[error("publish rejected with status {status}: {body}")]
    PublishRejected {
        status: reqwest::StatusCode,
        body: String,
    },
}
