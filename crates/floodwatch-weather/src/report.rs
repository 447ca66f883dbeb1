use floodwatch_core::RiskLevel;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{CurrentConditions, DailyForecast, WaterLevelOutlook, WeatherReport};

const OUTLOOK_FACTOR: f64 = 0.1;
const OUTLOOK_HIGH_MM: f64 = 50.0;
const OUTLOOK_MEDIUM_MM: f64 = 20.0;

/// Turns a WeatherAPI forecast payload into the trimmed report served to
/// clients. Unlike risk extraction this is strict: a payload missing the
/// documented fields is an invalid response.
pub fn summarize_forecast(payload: &Value) -> Result<WeatherReport, ProviderError> {
    let parsed = ApiForecastResponse::deserialize(payload).map_err(|e| {
        ProviderError::InvalidResponse(format!("unexpected forecast payload: {e}"))
    })?;

    let forecast: Vec<DailyForecast> = parsed
        .forecast
        .forecastday
        .into_iter()
        .map(|entry| DailyForecast {
            date: entry.date,
            temp: entry.day.avgtemp_c,
            weather_description: entry.day.condition.text,
            weather_icon: entry.day.condition.icon,
            humidity: entry.day.avghumidity,
            wind_speed: entry.day.maxwind_kph,
            precipitation: entry.day.totalprecip_mm,
        })
        .collect();

    let water_level = water_outlook(&forecast);
    Ok(WeatherReport {
        current: parsed.current.into(),
        forecast,
        water_level,
    })
}

fn water_outlook(days: &[DailyForecast]) -> WaterLevelOutlook {
    if days.is_empty() {
        return WaterLevelOutlook {
            value: 0.0,
            status: RiskLevel::Low,
        };
    }
    let total: f64 = days.iter().map(|d| d.precipitation).sum();
    let avg = total / days.len() as f64;
    let status = if avg > OUTLOOK_HIGH_MM {
        RiskLevel::High
    } else if avg > OUTLOOK_MEDIUM_MM {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    WaterLevelOutlook {
        value: avg * OUTLOOK_FACTOR,
        status,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCurrentResponse {
    pub(crate) current: ApiCurrent,
}

#[derive(Debug, Deserialize)]
struct ApiForecastResponse {
    current: ApiCurrent,
    forecast: ApiForecast,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCurrent {
    temp_c: f64,
    condition: ApiCondition,
    humidity: f64,
    wind_kph: f64,
    precip_mm: f64,
}

impl From<ApiCurrent> for CurrentConditions {
    fn from(c: ApiCurrent) -> Self {
        Self {
            temp: c.temp_c,
            weather_description: c.condition.text,
            weather_icon: c.condition.icon,
            humidity: c.humidity,
            wind_speed: c.wind_kph,
            precipitation: c.precip_mm,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    text: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ApiForecast {
    #[serde(default)]
    forecastday: Vec<ApiForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ApiForecastDay {
    date: String,
    day: ApiDay,
}

#[derive(Debug, Deserialize)]
struct ApiDay {
    avgtemp_c: f64,
    condition: ApiCondition,
    avghumidity: f64,
    maxwind_kph: f64,
    totalprecip_mm: f64,
}
