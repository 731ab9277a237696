use anyhow::Result;
use log::info;

use price_prediction::config::JobConfig;
use price_prediction::loader::CsvHistoryLoader;
use price_prediction::logger::init_logger;
use price_prediction::pipeline::PredictionJob;
use price_prediction::publisher::HttpPublisher;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let config = JobConfig::from_env()?;
    info!("Starting price prediction job");

    let loader = CsvHistoryLoader::new(config.storage.base_path.as_str());
    let publisher = HttpPublisher::new(&config.api.base_url);
    let job = PredictionJob::new(config, loader, publisher);

    let summary = job.run().await;
    info!(
        "Price prediction job completed: {} attempted, {} forecasted, {} skipped, {} failed, {} predictions saved",
        summary.attempted, summary.forecasted, summary.skipped, summary.failed, summary.published
    );

    // a run that forecast nothing should be visible to the scheduler
    if summary.forecasted == 0 {
        std::process::exit(1);
    }

    Ok(())
}
