use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::WeatherApiConfig;
use crate::error::ProviderError;
use crate::report::ApiCurrentResponse;
use crate::traits::WeatherProvider;
use crate::types::{Coordinates, CurrentConditions};

#[derive(Clone)]
pub struct WeatherApiProvider {
    config: WeatherApiConfig,
    client: Client,
}

impl WeatherApiProvider {
    pub fn new(config: WeatherApiConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Config(
                "weather API key is empty".to_string(),
            ));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ProviderError> {
        let res = self
            .client
            .get(self.endpoint(path))
            .query(&[("key", self.config.api_key.as_str())])
            .query(query)
            .send()
            .await?;
        debug!(path, status = res.status().as_u16(), "weatherapi response");
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }
        Ok(res.json().await?)
    }
}

#[async_trait::async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn name(&self) -> &'static str {
        "weatherapi"
    }

    async fn forecast(&self, at: Coordinates) -> Result<Value, ProviderError> {
        let payload = self
            .get_json(
                "forecast.json",
                &[
                    ("q", at.to_string()),
                    ("days", self.config.forecast_days.to_string()),
                    ("aqi", "no".to_string()),
                    ("alerts", "no".to_string()),
                ],
            )
            .await?;
        if !payload.is_object() {
            return Err(ProviderError::InvalidResponse(
                "forecast payload is not a JSON object".to_string(),
            ));
        }
        Ok(payload)
    }

    async fn current(&self, at: Coordinates) -> Result<CurrentConditions, ProviderError> {
        let payload = self
            .get_json(
                "current.json",
                &[("q", at.to_string()), ("aqi", "no".to_string())],
            )
            .await?;
        let parsed: ApiCurrentResponse = serde_json::from_value(payload)?;
        Ok(parsed.current.into())
    }
}
