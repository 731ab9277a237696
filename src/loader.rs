use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{error, info, warn};

use crate::error::PredictionError;

/// One historical market snapshot as stored in the partition files.
/// Numeric fields are nullable; only the timestamp is required.
#[derive(Debug, Clone)]
pub struct PriceRecord {
    pub id: String,
    pub symbol: String,
    pub price: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_percent_24h: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Narrow seam over historical storage so the pipeline can run against
/// in-memory rows in tests.
pub trait RecordSource {
    fn read_rows(&self, symbol: &str) -> Result<Vec<PriceRecord>, PredictionError>;
}

/// Reads per-symbol history from `{base}/{symbol}/<y>/<m>/<d>/*.csv`.
pub struct CsvHistoryLoader {
    base_path: PathBuf,
}

impl CsvHistoryLoader {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn partition_files(&self, symbol: &str) -> Result<Vec<PathBuf>, PredictionError> {
        let symbol_dir = self.base_path.join(symbol);
        let mut files = Vec::new();
        if !symbol_dir.is_dir() {
            return Ok(files);
        }

        // three date-style directory levels under the symbol
        for year in read_subdirs(&symbol_dir)? {
            for month in read_subdirs(&year)? {
                for day in read_subdirs(&month)? {
                    for entry in fs::read_dir(&day)? {
                        let path = entry?.path();
                        if path.extension().map(|ext| ext == "csv").unwrap_or(false) {
                            files.push(path);
                        }
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<PriceRecord>, PredictionError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // schema applied by position: id, symbol, price, volume24h,
            // market_cap, high24h, low24h, price_change_percent24h, timestamp
            let Some(timestamp) = record.get(8).and_then(parse_timestamp) else {
                warn!("Dropping row with unparseable timestamp in {}", path.display());
                continue;
            };

            rows.push(PriceRecord {
                id: record.get(0).unwrap_or_default().to_string(),
                symbol: record.get(1).unwrap_or_default().to_string(),
                price: field_f64(&record, 2),
                volume_24h: field_f64(&record, 3),
                market_cap: field_f64(&record, 4),
                high_24h: field_f64(&record, 5),
                low_24h: field_f64(&record, 6),
                price_change_percent_24h: field_f64(&record, 7),
                timestamp,
            });
        }

        Ok(rows)
    }
}

impl RecordSource for CsvHistoryLoader {
    fn read_rows(&self, symbol: &str) -> Result<Vec<PriceRecord>, PredictionError> {
        // storage failures mean "no data for this symbol", never a fatal error
        let files = match self.partition_files(symbol) {
            Ok(files) => files,
            Err(e) => {
                error!("Error listing partitions for {}: {}", symbol, e);
                return Ok(Vec::new());
            }
        };

        let mut rows = Vec::new();
        for file in &files {
            match self.read_file(file) {
                Ok(mut file_rows) => rows.append(&mut file_rows),
                Err(e) => {
                    error!("Error loading data for {}: {}", symbol, e);
                    return Ok(Vec::new());
                }
            }
        }

        info!("Loaded {} records for {}", rows.len(), symbol);
        Ok(rows)
    }
}

fn read_subdirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn field_f64(record: &csv::StringRecord, index: usize) -> Option<f64> {
    record
        .get(index)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &str =
        "id,symbol,price,volume24h,marketCap,high24h,low24h,priceChangePercent24h,timestamp";

    fn write_partition(base: &Path, symbol: &str, date: (&str, &str, &str), body: &str) {
        let dir = base.join(symbol).join(date.0).join(date.1).join(date.2);
        fs::create_dir_all(&dir).unwrap();
        let mut file = fs::File::create(dir.join("prices.csv")).unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        write!(file, "{}", body).unwrap();
    }

    #[test]
    fn reads_rows_across_partitions() {
        let dir = tempdir().unwrap();
        write_partition(
            dir.path(),
            "BTCUSDT",
            ("2024", "01", "15"),
            "1,BTCUSDT,42000.5,1200.0,50400600.0,43000.0,41000.0,1.2,2024-01-15T10:30:00Z\n",
        );
        write_partition(
            dir.path(),
            "BTCUSDT",
            ("2024", "01", "16"),
            "2,BTCUSDT,42500.0,1100.0,46750000.0,43100.0,41900.0,-0.4,2024-01-16T09:00:00Z\n",
        );

        let loader = CsvHistoryLoader::new(dir.path());
        let rows = loader.read_rows("BTCUSDT").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[0].price, Some(42000.5));
        assert_eq!(rows[0].timestamp.to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert_eq!(rows[1].symbol, "BTCUSDT");
        assert_eq!(rows[1].price_change_percent_24h, Some(-0.4));
    }

    #[test]
    fn drops_rows_with_unparseable_timestamps() {
        let dir = tempdir().unwrap();
        write_partition(
            dir.path(),
            "ETHUSDT",
            ("2024", "02", "01"),
            "1,ETHUSDT,2500.0,900.0,2250000.0,2600.0,2400.0,0.8,not-a-date\n\
             2,ETHUSDT,2510.0,950.0,2384500.0,2610.0,2410.0,0.9,2024-02-01T12:00:00Z\n",
        );

        let loader = CsvHistoryLoader::new(dir.path());
        let rows = loader.read_rows("ETHUSDT").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "2");
    }

    #[test]
    fn nulls_load_as_none() {
        let dir = tempdir().unwrap();
        write_partition(
            dir.path(),
            "BNBUSDT",
            ("2024", "03", "10"),
            "7,BNBUSDT,,312.0,,320.0,300.0,0.1,2024-03-10T00:00:00Z\n",
        );

        let loader = CsvHistoryLoader::new(dir.path());
        let rows = loader.read_rows("BNBUSDT").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, None);
        assert_eq!(rows[0].market_cap, None);
        assert_eq!(rows[0].volume_24h, Some(312.0));
    }

    #[test]
    fn missing_symbol_directory_is_empty() {
        let dir = tempdir().unwrap();
        let loader = CsvHistoryLoader::new(dir.path());
        assert!(loader.read_rows("DOGEUSDT").unwrap().is_empty());
    }

    #[test]
    fn malformed_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let partition = dir.path().join("ADAUSDT/2024/01/01");
        fs::create_dir_all(&partition).unwrap();
        // invalid UTF-8 makes the reader fail for the whole symbol
        fs::write(partition.join("prices.csv"), b"id,symbol\n\xff\xfe,broken\n").unwrap();

        let loader = CsvHistoryLoader::new(dir.path());
        assert!(loader.read_rows("ADAUSDT").unwrap().is_empty());
    }

    #[test]
    fn parses_space_separated_timestamps() {
        assert_eq!(
            parse_timestamp("2024-01-15 10:30:00.5").unwrap().to_rfc3339(),
            "2024-01-15T10:30:00.500+00:00"
        );
        assert!(parse_timestamp("").is_none());
    }
}
