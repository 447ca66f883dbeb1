use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WeatherApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub forecast_days: u8,
    pub timeout: Duration,
}

impl WeatherApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.weatherapi.com".to_string(),
            forecast_days: 5,
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenMeteoConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub enum WeatherProviderConfig {
    WeatherApi(WeatherApiConfig),
}

#[derive(Debug, Clone)]
pub enum ElevationProviderConfig {
    OpenMeteo(OpenMeteoConfig),
}
