use std::io;

use floodwatch_storage::StorageError;
use floodwatch_weather::ProviderError;
use serde_json::json;
use thiserror::Error;

use crate::http::HttpResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("Weather API key not configured")]
    MissingApiKey,

    #[error("weather provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ServerError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::Storage(StorageError::InvalidInput(_)) => 400,
            Self::NotFound(_) | Self::Storage(StorageError::UnknownLocation(_)) => 404,
            Self::MethodNotAllowed => 405,
            Self::Provider(err) => match err.upstream_status() {
                Some(status) => status,
                None => 502,
            },
            Self::MissingApiKey
            | Self::Storage(_)
            | Self::Serde(_)
            | Self::Config(_)
            | Self::Io(_) => 500,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Storage(StorageError::InvalidInput(msg)) => msg.clone(),
            Self::Storage(err @ StorageError::UnknownLocation(_)) => err.to_string(),
            Self::Storage(_) => "Database error occurred".to_string(),
            Self::Provider(_) => "Failed to fetch weather data".to_string(),
            Self::MethodNotAllowed | Self::MissingApiKey => self.to_string(),
            Self::Serde(_) | Self::Config(_) | Self::Io(_) => "Internal server error".to_string(),
        }
    }

    /// Log-safe rendering; provider errors can echo request URLs with the key.
    pub fn redacted(&self) -> String {
        match self {
            Self::Provider(err) => err.redacted(&[]),
            other => other.to_string(),
        }
    }

    pub fn to_response(&self) -> HttpResponse {
        HttpResponse::json(self.status(), json!({ "error": self.public_message() }))
    }
}
