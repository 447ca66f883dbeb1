use std::sync::Arc;

use crate::config::{ElevationProviderConfig, WeatherProviderConfig};
use crate::error::ProviderError;
use crate::providers::{OpenMeteoElevationProvider, WeatherApiProvider};
use crate::traits::{ElevationProvider, WeatherProvider};

pub fn build_weather_provider(
    cfg: WeatherProviderConfig,
) -> Result<Arc<dyn WeatherProvider>, ProviderError> {
    match cfg {
        WeatherProviderConfig::WeatherApi(c) => Ok(Arc::new(WeatherApiProvider::new(c)?)),
    }
}

pub fn build_elevation_provider(
    cfg: ElevationProviderConfig,
) -> Result<Arc<dyn ElevationProvider>, ProviderError> {
    match cfg {
        ElevationProviderConfig::OpenMeteo(c) => {
            Ok(Arc::new(OpenMeteoElevationProvider::new(c)?))
        }
    }
}
