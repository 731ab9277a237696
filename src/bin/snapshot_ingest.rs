use anyhow::Result;
use chrono::Utc;
use log::{error, info};

use price_prediction::config::JobConfig;
use price_prediction::ingest::{PartitionWriter, TickerClient};
use price_prediction::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let config = JobConfig::from_env()?;
    info!("Fetching crypto prices at {}", Utc::now());

    let client = TickerClient::new(&config.exchange.base_url);
    let writer = PartitionWriter::new(config.storage.base_path.as_str());

    let mut exported = 0usize;
    for symbol in &config.job.symbols {
        match client.fetch_snapshot(symbol, Utc::now()).await {
            Ok(record) => match writer.write_snapshot(&record) {
                Ok(_) => exported += 1,
                Err(e) => error!("Error exporting snapshot for {}: {}", symbol, e),
            },
            Err(e) => error!("Error fetching price for symbol {}: {}", symbol, e),
        }
    }

    info!(
        "Snapshot ingest completed, {} of {} symbols exported",
        exported,
        config.job.symbols.len()
    );
    Ok(())
}
