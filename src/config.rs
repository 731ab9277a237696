use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobSettings {
    pub symbols: Vec<String>,
}

/// Deploy-time settings shared by both binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub exchange: ExchangeConfig,
    pub job: JobSettings,
}

impl JobConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var("FORECAST_CONFIG").unwrap_or_else(|_| "forecast.toml".to_string());
        Self::from_file(&path)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .build()?;

        cfg.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_job_config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[storage]
base_path = "/crypto/data"

[api]
base_url = "http://backend:8080/api"

[exchange]
base_url = "https://api.binance.com"

[job]
symbols = ["BTCUSDT", "ETHUSDT"]
"#
        )
        .unwrap();

        let cfg = JobConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.storage.base_path, "/crypto/data");
        assert_eq!(cfg.api.base_url, "http://backend:8080/api");
        assert_eq!(cfg.exchange.base_url, "https://api.binance.com");
        assert_eq!(cfg.job.symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(JobConfig::from_file("/nonexistent/forecast.toml").is_err());
    }
}
