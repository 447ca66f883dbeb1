use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::drainage::DrainageSource;
use crate::factors::{
    extract_factors, FactorExtraction, RiskFactor, RiskFactors, RiskInputs, MAX_SEVERITY,
};

/// Highest achievable total: four factors at severity 3.
pub const MAX_POSSIBLE_RISK: u8 = MAX_SEVERITY * RiskFactor::ALL.len() as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Inclusive lower bounds, checked from HIGH down.
    pub fn from_percentage(percentage: f64, config: &ScoringConfig) -> Self {
        if percentage >= config.high_percentage {
            Self::High
        } else if percentage >= config.medium_percentage {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values the verdict was computed from, rounded for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherEcho {
    pub current_rainfall: f64,
    pub forecast_rainfall: f64,
    pub avg_rainfall: f64,
    pub avg_humidity: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_percentage: f64,
    pub water_level: f64,
    pub risk_factors: RiskFactors,
    pub total_risk_score: u8,
    pub max_possible_risk: u8,
    pub weather_data: WeatherEcho,
}

/// Synthetic water level: scales average rainfall up by the risk percentage.
/// A display heuristic, not a hydrological model.
pub fn water_level(avg_rainfall_mm: f64, risk_percentage: f64, config: &ScoringConfig) -> f64 {
    avg_rainfall_mm * config.water_level_factor * (1.0 + risk_percentage / 100.0)
}

pub fn aggregate(extraction: &FactorExtraction, config: &ScoringConfig) -> RiskAssessment {
    let total = extraction.factors.total();
    let percentage = f64::from(total) / f64::from(MAX_POSSIBLE_RISK) * 100.0;
    let level = RiskLevel::from_percentage(percentage, config);
    let water = water_level(extraction.rainfall.average_mm, percentage, config);

    RiskAssessment {
        risk_level: level,
        risk_percentage: round2(percentage),
        water_level: round2(water),
        risk_factors: extraction.factors,
        total_risk_score: total,
        max_possible_risk: MAX_POSSIBLE_RISK,
        weather_data: WeatherEcho {
            current_rainfall: round2(extraction.rainfall.current_mm),
            forecast_rainfall: round2(extraction.rainfall.forecast_total_mm),
            avg_rainfall: round2(extraction.rainfall.average_mm),
            avg_humidity: round2(extraction.avg_humidity),
            elevation: round2(extraction.elevation_m),
        },
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Owns the thresholds and the drainage source; produces one fresh
/// assessment per call.
pub struct RiskScorer {
    config: ScoringConfig,
    drainage: Box<dyn DrainageSource>,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig, drainage: Box<dyn DrainageSource>) -> Self {
        Self { config, drainage }
    }

    pub fn assess(&mut self, inputs: &RiskInputs) -> RiskAssessment {
        let extraction = extract_factors(inputs, &self.config, self.drainage.as_mut());
        aggregate(&extraction, &self.config)
    }
}
