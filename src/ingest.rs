use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::info;
use reqwest::Client;
use serde::Deserialize;

use crate::error::PredictionError;
use crate::loader::PriceRecord;

const SNAPSHOT_HEADER: [&str; 9] = [
    "id",
    "symbol",
    "price",
    "volume24h",
    "marketCap",
    "high24h",
    "low24h",
    "priceChangePercent24h",
    "timestamp",
];

/// 24h ticker payload; the exchange sends decimals as strings.
#[derive(Debug, Deserialize)]
pub struct Ticker24h {
    #[serde(rename = "lastPrice")]
    pub last_price: String,
    pub volume: String,
    #[serde(rename = "highPrice")]
    pub high_price: String,
    #[serde(rename = "lowPrice")]
    pub low_price: String,
    #[serde(rename = "priceChangePercent")]
    pub price_change_percent: String,
}

/// Fetches current 24h ticker snapshots from the exchange REST API.
pub struct TickerClient {
    client: Client,
    base_url: String,
}

impl TickerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_snapshot(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<PriceRecord, PredictionError> {
        let url = format!("{}/api/v3/ticker/24hr?symbol={}", self.base_url, symbol);
        let ticker: Ticker24h = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(snapshot_record(symbol, &ticker, now))
    }
}

pub fn snapshot_record(symbol: &str, ticker: &Ticker24h, now: DateTime<Utc>) -> PriceRecord {
    let price = parse_decimal(&ticker.last_price);
    let volume = parse_decimal(&ticker.volume);
    // the exchange has no market cap figure; price * volume / 1000 stands in
    let market_cap = match (price, volume) {
        (Some(price), Some(volume)) => Some(price * volume / 1000.0),
        _ => None,
    };

    PriceRecord {
        id: now.timestamp_millis().to_string(),
        symbol: symbol.to_string(),
        price,
        volume_24h: volume,
        market_cap,
        high_24h: parse_decimal(&ticker.high_price),
        low_24h: parse_decimal(&ticker.low_price),
        price_change_percent_24h: parse_decimal(&ticker.price_change_percent),
        timestamp: now,
    }
}

/// Appends snapshot files under the `{base}/{symbol}/<y>/<m>/<d>/` layout
/// the history loader reads back.
pub struct PartitionWriter {
    base_path: PathBuf,
}

impl PartitionWriter {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn write_snapshot(&self, record: &PriceRecord) -> Result<PathBuf, PredictionError> {
        let partition = self
            .base_path
            .join(&record.symbol)
            .join(record.timestamp.format("%Y").to_string())
            .join(record.timestamp.format("%m").to_string())
            .join(record.timestamp.format("%d").to_string());
        fs::create_dir_all(&partition)?;

        let path = partition.join(format!("prices-{}.csv", record.timestamp.format("%H%M%S")));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(SNAPSHOT_HEADER)?;
        writer.write_record(&[
            record.id.clone(),
            record.symbol.clone(),
            format_field(record.price),
            format_field(record.volume_24h),
            format_field(record.market_cap),
            format_field(record.high_24h),
            format_field(record.low_24h),
            format_field(record.price_change_percent_24h),
            record.timestamp.to_rfc3339(),
        ])?;
        writer.flush()?;

        info!(
            "Exported snapshot for {} to {}",
            record.symbol,
            path.display()
        );
        Ok(path)
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn format_field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
