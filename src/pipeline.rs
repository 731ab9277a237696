use chrono::Utc;
use log::{error, info};

use crate::config::JobConfig;
use crate::error::PredictionError;
use crate::features::build_features;
use crate::loader::RecordSource;
use crate::model::{forecast, train_and_evaluate};
use crate::publisher::ForecastSink;

/// Minimum historical rows a symbol needs before a model is attempted.
pub const MIN_ROWS: usize = 10;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub attempted: usize,
    pub forecasted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub published: usize,
}

enum SymbolOutcome {
    Skipped,
    Forecasted { published: usize },
}

/// Runs the whole batch: for every configured symbol, load history, build
/// features, fit and score the model, publish the three horizon forecasts.
pub struct PredictionJob<S, P> {
    config: JobConfig,
    source: S,
    sink: P,
}

impl<S: RecordSource, P: ForecastSink> PredictionJob<S, P> {
    pub fn new(config: JobConfig, source: S, sink: P) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    pub async fn run(&self) -> JobSummary {
        let mut summary = JobSummary::default();

        // symbols are strictly sequential; one failure never aborts the batch
        for symbol in &self.config.job.symbols {
            summary.attempted += 1;
            match self.run_symbol(symbol).await {
                Ok(SymbolOutcome::Skipped) => summary.skipped += 1,
                Ok(SymbolOutcome::Forecasted { published }) => {
                    summary.forecasted += 1;
                    summary.published += published;
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Error processing {}: {}", symbol, e);
                }
            }
        }

        summary
    }

    async fn run_symbol(&self, symbol: &str) -> Result<SymbolOutcome, PredictionError> {
        info!("Processing symbol: {}", symbol);

        let rows = self.source.read_rows(symbol)?;
        if rows.len() < MIN_ROWS {
            info!("Not enough data for {} to make a prediction", symbol);
            return Ok(SymbolOutcome::Skipped);
        }

        let frame = build_features(&rows)?;
        let report = train_and_evaluate(&frame)?;
        info!(
            "Root Mean Squared Error (RMSE) for {}: {}",
            symbol, report.rmse
        );

        let points = forecast(symbol, &frame, &report, Utc::now());

        let mut published = 0;
        for point in &points {
            // publish failures are per-point; the rest still go out
            match self.sink.publish(point).await {
                Ok(()) => {
                    info!(
                        "Successfully saved prediction for {}, target date: {}",
                        symbol, point.target_date
                    );
                    published += 1;
                }
                Err(e) => error!("Error saving prediction for {}: {}", symbol, e),
            }
        }

        Ok(SymbolOutcome::Forecasted { published })
    }
}
