use std::fmt;

use floodwatch_core::RiskLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Formats as `lat,lng`, the query form WeatherAPI expects.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub weather_description: String,
    pub weather_icon: String,
    pub humidity: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: String,
    pub temp: f64,
    pub weather_description: String,
    pub weather_icon: String,
    pub humidity: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
}

/// Rainfall-only water outlook shown next to the forecast. Independent of the
/// full risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterLevelOutlook {
    pub value: f64,
    pub status: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub forecast: Vec<DailyForecast>,
    pub water_level: WaterLevelOutlook,
}
