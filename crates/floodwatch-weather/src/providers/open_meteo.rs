use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::OpenMeteoConfig;
use crate::error::ProviderError;
use crate::traits::ElevationProvider;
use crate::types::Coordinates;

#[derive(Clone)]
pub struct OpenMeteoElevationProvider {
    config: OpenMeteoConfig,
    client: Client,
}

impl OpenMeteoElevationProvider {
    pub fn new(config: OpenMeteoConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn elevation_url(&self) -> String {
        format!(
            "{}/v1/elevation",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl ElevationProvider for OpenMeteoElevationProvider {
    fn name(&self) -> &'static str {
        "open-meteo"
    }

    async fn elevation(&self, at: Coordinates) -> Result<Value, ProviderError> {
        let res = self
            .client
            .get(self.elevation_url())
            .query(&[
                ("latitude", at.latitude.to_string()),
                ("longitude", at.longitude.to_string()),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let parsed: Value = res.json().await?;
        let elevation = elevation_field(parsed);
        if elevation.is_null() {
            debug!(at = %at, "open-meteo response carried no elevation");
        }
        Ok(elevation)
    }
}

/// Open-Meteo answers `{"elevation": [35.0]}`; the list is passed through
/// untouched for the extractor to coerce.
fn elevation_field(mut payload: Value) -> Value {
    payload
        .get_mut("elevation")
        .map(Value::take)
        .unwrap_or(Value::Null)
}
