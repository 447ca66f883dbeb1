use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::coerce::{to_float, try_float, FieldValue};
use crate::config::ScoringConfig;
use crate::drainage::DrainageSource;

pub const MAX_SEVERITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskFactor {
    Rainfall,
    Elevation,
    Humidity,
    Drainage,
}

impl RiskFactor {
    pub const ALL: [Self; 4] = [Self::Rainfall, Self::Elevation, Self::Humidity, Self::Drainage];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rainfall => "rainfall",
            Self::Elevation => "elevation",
            Self::Humidity => "humidity",
            Self::Drainage => "drainage",
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FactorError {
    #[error("malformed payload field `{field}`: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("{factor} metric is not finite: {value}")]
    NonFinite { factor: RiskFactor, value: f64 },
}

/// Severity per factor. Every factor is always present and clamped to
/// `0..=MAX_SEVERITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RiskFactors {
    #[serde(rename = "rainfall_risk")]
    rainfall: u8,
    #[serde(rename = "elevation_risk")]
    elevation: u8,
    #[serde(rename = "humidity_risk")]
    humidity: u8,
    #[serde(rename = "drainage_risk")]
    drainage: u8,
}

impl RiskFactors {
    pub fn new(rainfall: u8, elevation: u8, humidity: u8, drainage: u8) -> Self {
        Self {
            rainfall: rainfall.min(MAX_SEVERITY),
            elevation: elevation.min(MAX_SEVERITY),
            humidity: humidity.min(MAX_SEVERITY),
            drainage: drainage.min(MAX_SEVERITY),
        }
    }

    pub const fn get(&self, factor: RiskFactor) -> u8 {
        match factor {
            RiskFactor::Rainfall => self.rainfall,
            RiskFactor::Elevation => self.elevation,
            RiskFactor::Humidity => self.humidity,
            RiskFactor::Drainage => self.drainage,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskFactor, u8)> + '_ {
        RiskFactor::ALL.into_iter().map(|f| (f, self.get(f)))
    }

    pub fn total(&self) -> u8 {
        self.iter().map(|(_, v)| v).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSnapshot {
    pub precip_mm: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastDay {
    pub totalprecip_mm: FieldValue,
    pub avghumidity: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElevationSample(pub FieldValue);

/// Everything the extractor reads. A malformed container is held as an error
/// and only degrades the factors that read it.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInputs {
    pub current: Result<WeatherSnapshot, FactorError>,
    pub forecast: Result<Vec<ForecastDay>, FactorError>,
    pub elevation: ElevationSample,
}

impl Default for RiskInputs {
    fn default() -> Self {
        Self {
            current: Ok(WeatherSnapshot::default()),
            forecast: Ok(Vec::new()),
            elevation: ElevationSample::default(),
        }
    }
}

impl RiskInputs {
    /// Builds inputs from a WeatherAPI-style forecast payload
    /// (`current.precip_mm`, `forecast.forecastday[].day.{totalprecip_mm,avghumidity}`)
    /// and a raw elevation value.
    pub fn from_payload(payload: &Value, elevation: &Value) -> Self {
        Self {
            current: parse_current(payload),
            forecast: parse_forecast(payload),
            elevation: ElevationSample(FieldValue::from_json(elevation)),
        }
    }
}

fn parse_current(payload: &Value) -> Result<WeatherSnapshot, FactorError> {
    match payload.get("current") {
        None | Some(Value::Null) => Ok(WeatherSnapshot::default()),
        Some(current @ Value::Object(_)) => Ok(WeatherSnapshot {
            precip_mm: FieldValue::field(current, "precip_mm"),
        }),
        Some(other) => Err(FactorError::Malformed {
            field: "current",
            reason: format!("expected object, got {}", json_kind(other)),
        }),
    }
}

fn parse_forecast(payload: &Value) -> Result<Vec<ForecastDay>, FactorError> {
    let days = match payload.get("forecast") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(forecast @ Value::Object(_)) => match forecast.get("forecastday") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(days)) => days,
            Some(other) => {
                return Err(FactorError::Malformed {
                    field: "forecast.forecastday",
                    reason: format!("expected array, got {}", json_kind(other)),
                })
            }
        },
        Some(other) => {
            return Err(FactorError::Malformed {
                field: "forecast",
                reason: format!("expected object, got {}", json_kind(other)),
            })
        }
    };

    // A malformed day still counts as a day; its readings coerce to zero.
    Ok(days
        .iter()
        .map(|entry| {
            let day = entry.get("day").unwrap_or(&Value::Null);
            ForecastDay {
                totalprecip_mm: FieldValue::field(day, "totalprecip_mm"),
                avghumidity: FieldValue::field(day, "avghumidity"),
            }
        })
        .collect())
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RainfallSummary {
    pub current_mm: f64,
    pub forecast_total_mm: f64,
    pub average_mm: f64,
}

/// Sub-scores plus the intermediate metrics they were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorExtraction {
    pub factors: RiskFactors,
    pub rainfall: RainfallSummary,
    pub avg_humidity: f64,
    pub elevation_m: f64,
}

pub fn rainfall_factor(
    inputs: &RiskInputs,
    config: &ScoringConfig,
) -> Result<(RainfallSummary, u8), FactorError> {
    let current = inputs.current.as_ref().map_err(Clone::clone)?;
    let days = inputs.forecast.as_ref().map_err(Clone::clone)?;

    let current_mm = to_float(&current.precip_mm, 0.0);
    // Folding from +0.0 keeps an empty forecast from totalling -0.0.
    let forecast_total_mm = days
        .iter()
        .map(|d| to_float(&d.totalprecip_mm, 0.0))
        .fold(0.0, |acc, mm| acc + mm);
    let samples = days.len() + 1;
    let average_mm = (current_mm + forecast_total_mm) / samples as f64;
    if !average_mm.is_finite() {
        return Err(FactorError::NonFinite {
            factor: RiskFactor::Rainfall,
            value: average_mm,
        });
    }

    let summary = RainfallSummary {
        current_mm,
        forecast_total_mm,
        average_mm,
    };
    Ok((summary, config.rainfall_mm.grade_above(average_mm)))
}

pub fn elevation_factor(
    inputs: &RiskInputs,
    config: &ScoringConfig,
) -> Result<(f64, u8), FactorError> {
    // No reading means no evidence of low ground; the echo still shows 0.
    let Some(elevation_m) = try_float(&inputs.elevation.0) else {
        return Ok((0.0, 0));
    };
    if !elevation_m.is_finite() {
        return Err(FactorError::NonFinite {
            factor: RiskFactor::Elevation,
            value: elevation_m,
        });
    }
    Ok((elevation_m, config.elevation_m.grade_below(elevation_m)))
}

pub fn humidity_factor(
    inputs: &RiskInputs,
    config: &ScoringConfig,
) -> Result<(f64, u8), FactorError> {
    let days = inputs.forecast.as_ref().map_err(Clone::clone)?;
    if days.is_empty() {
        return Ok((0.0, config.humidity_pct.grade_above(0.0)));
    }
    let total = days
        .iter()
        .map(|d| to_float(&d.avghumidity, 0.0))
        .fold(0.0, |acc, pct| acc + pct);
    let average = total / days.len() as f64;
    if !average.is_finite() {
        return Err(FactorError::NonFinite {
            factor: RiskFactor::Humidity,
            value: average,
        });
    }
    Ok((average, config.humidity_pct.grade_above(average)))
}

/// Computes every factor in isolation. A failing factor is logged and scored
/// 0; the others are unaffected.
pub fn extract_factors(
    inputs: &RiskInputs,
    config: &ScoringConfig,
    drainage: &mut dyn DrainageSource,
) -> FactorExtraction {
    let (rainfall, rainfall_risk) = rainfall_factor(inputs, config).unwrap_or_else(|err| {
        degraded(RiskFactor::Rainfall, &err);
        let current_mm = inputs
            .current
            .as_ref()
            .map(|c| to_float(&c.precip_mm, 0.0))
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        (
            RainfallSummary {
                current_mm,
                ..RainfallSummary::default()
            },
            0,
        )
    });

    let (elevation_m, elevation_risk) = elevation_factor(inputs, config).unwrap_or_else(|err| {
        degraded(RiskFactor::Elevation, &err);
        (0.0, 0)
    });

    let (avg_humidity, humidity_risk) = humidity_factor(inputs, config).unwrap_or_else(|err| {
        degraded(RiskFactor::Humidity, &err);
        (0.0, 0)
    });

    let drainage_risk = drainage.severity();

    FactorExtraction {
        factors: RiskFactors::new(rainfall_risk, elevation_risk, humidity_risk, drainage_risk),
        rainfall,
        avg_humidity,
        elevation_m,
    }
}

fn degraded(factor: RiskFactor, err: &FactorError) {
    warn!(%factor, error = %err, "risk factor could not be computed, scoring it 0");
}
