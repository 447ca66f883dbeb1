use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{Coordinates, CurrentConditions};

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw forecast payload. Field shapes vary by upstream and are coerced
    /// by the risk extractor.
    async fn forecast(&self, at: Coordinates) -> Result<Value, ProviderError>;

    async fn current(&self, at: Coordinates) -> Result<CurrentConditions, ProviderError>;
}

#[async_trait]
pub trait ElevationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw elevation reading; a scalar or a list depending on the upstream.
    async fn elevation(&self, at: Coordinates) -> Result<Value, ProviderError>;
}
