use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::error::PredictionError;
use crate::misc::ForecastPoint;

/// Narrow seam over the prediction-storage API so the pipeline can run
/// against an in-memory sink in tests.
#[async_trait]
pub trait ForecastSink {
    async fn publish(&self, point: &ForecastPoint) -> Result<(), PredictionError>;
}

/// Submits forecasts to `{api_base}/predictions/{symbol}/save`, one call
/// per point. No retry, no backoff, no batching.
pub struct HttpPublisher {
    client: Client,
    base_url: String,
}

impl HttpPublisher {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ForecastSink for HttpPublisher {
    async fn publish(&self, point: &ForecastPoint) -> Result<(), PredictionError> {
        let url = format!("{}/predictions/{}/save", self.base_url, point.symbol);
        debug!("Submitting forecast: {}", serde_json::to_string(point)?);

        let response = self.client.post(&url).json(point).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PredictionError::PublishRejected { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_save_url_without_double_slashes() {
        let publisher = HttpPublisher::new("http://backend:8080/api/");
        assert_eq!(publisher.base_url, "http://backend:8080/api");
    }
}
