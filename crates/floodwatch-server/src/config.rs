use std::path::PathBuf;
use std::time::Duration;

use floodwatch_core::DrainageMode;
use floodwatch_weather::{OpenMeteoConfig, WeatherApiConfig};

use crate::error::ServerError;

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_DB_PATH: &str = "./data/floodwatch-db.json";

/// Everything the daemon reads from the environment, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: String,
    pub db_path: PathBuf,
    pub weather_api_key: Option<String>,
    pub weather_base_url: Option<String>,
    pub elevation_base_url: Option<String>,
    pub forecast_days: u8,
    pub provider_timeout: Option<Duration>,
    pub drainage: DrainageMode,
    pub seed_location: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            weather_api_key: None,
            weather_base_url: None,
            elevation_base_url: None,
            forecast_days: 5,
            provider_timeout: None,
            drainage: DrainageMode::default(),
            seed_location: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut drainage = match non_empty("FLOODWATCH_DRAINAGE") {
            Some(raw) => raw
                .parse::<DrainageMode>()
                .map_err(|e| ServerError::Config(e.to_string()))?,
            None => defaults.drainage,
        };
        if let DrainageMode::Random { seed: None } = drainage {
            if let Some(raw) = non_empty("FLOODWATCH_DRAINAGE_SEED") {
                let seed = raw.trim().parse::<u64>().map_err(|_| {
                    ServerError::Config(format!("FLOODWATCH_DRAINAGE_SEED `{raw}` is not a u64"))
                })?;
                drainage = DrainageMode::Random { seed: Some(seed) };
            }
        }

        let forecast_days = env_usize(&lookup, "FLOODWATCH_FORECAST_DAYS", 5, 1, 14);
        let provider_timeout = non_empty("FLOODWATCH_PROVIDER_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|ms| Duration::from_millis(ms.clamp(100, 120_000)));

        Ok(Self {
            http_addr: non_empty("FLOODWATCH_HTTP_ADDR").unwrap_or(defaults.http_addr),
            db_path: non_empty("FLOODWATCH_DB").map_or(defaults.db_path, PathBuf::from),
            weather_api_key: non_empty("WEATHER_API_KEY"),
            weather_base_url: non_empty("FLOODWATCH_WEATHER_BASE_URL"),
            elevation_base_url: non_empty("FLOODWATCH_ELEVATION_BASE_URL"),
            forecast_days: u8::try_from(forecast_days).unwrap_or(defaults.forecast_days),
            provider_timeout,
            drainage,
            seed_location: env_bool(&lookup, "FLOODWATCH_SEED_LOCATION", defaults.seed_location),
        })
    }

    /// `None` when no API key is configured.
    pub fn weather_api(&self) -> Option<WeatherApiConfig> {
        let key = self.weather_api_key.as_deref()?;
        let mut cfg = WeatherApiConfig::new(key);
        if let Some(base) = &self.weather_base_url {
            cfg.base_url.clone_from(base);
        }
        if let Some(timeout) = self.provider_timeout {
            cfg.timeout = timeout;
        }
        cfg.forecast_days = self.forecast_days;
        Some(cfg)
    }

    pub fn open_meteo(&self) -> OpenMeteoConfig {
        let mut cfg = OpenMeteoConfig::default();
        if let Some(base) = &self.elevation_base_url {
            cfg.base_url.clone_from(base);
        }
        if let Some(timeout) = self.provider_timeout {
            cfg.timeout = timeout;
        }
        cfg
    }
}

fn env_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: usize,
    min: usize,
    max: usize,
) -> usize {
    lookup(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
