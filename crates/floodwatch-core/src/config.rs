use serde::{Deserialize, Serialize};

/// Three cut points mapping a metric onto severities 3, 2 and 1.
///
/// Bands are evaluated from the most severe cut point down and the first
/// match wins; anything past the last cut point scores 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBands {
    pub severe: f64,
    pub elevated: f64,
    pub moderate: f64,
}

impl SeverityBands {
    pub const fn new(severe: f64, elevated: f64, moderate: f64) -> Self {
        Self {
            severe,
            elevated,
            moderate,
        }
    }

    /// Grades a metric where larger is riskier (exclusive lower bounds).
    pub fn grade_above(&self, value: f64) -> u8 {
        if value > self.severe {
            3
        } else if value > self.elevated {
            2
        } else if value > self.moderate {
            1
        } else {
            0
        }
    }

    /// Grades a metric where smaller is riskier (exclusive upper bounds).
    pub fn grade_below(&self, value: f64) -> u8 {
        if value < self.severe {
            3
        } else if value < self.elevated {
            2
        } else if value < self.moderate {
            1
        } else {
            0
        }
    }
}

/// Thresholds used by the extractor and aggregator. Passed in explicitly;
/// scoring never reads process state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Average rainfall in millimetres.
    pub rainfall_mm: SeverityBands,
    /// Elevation in metres above sea level.
    pub elevation_m: SeverityBands,
    /// Average relative humidity in percent.
    pub humidity_pct: SeverityBands,
    /// Inclusive lower bound of the HIGH verdict, in percent.
    pub high_percentage: f64,
    /// Inclusive lower bound of the MEDIUM verdict, in percent.
    pub medium_percentage: f64,
    pub water_level_factor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rainfall_mm: SeverityBands::new(50.0, 30.0, 10.0),
            elevation_m: SeverityBands::new(5.0, 10.0, 20.0),
            humidity_pct: SeverityBands::new(80.0, 70.0, 60.0),
            high_percentage: 75.0,
            medium_percentage: 50.0,
            water_level_factor: 0.1,
        }
    }
}
