use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use floodwatch_core::RiskLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_LOCATION_NAME: &str = "Test Location";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default)]
    pub rainfall_history: Vec<f64>,
    #[serde(default)]
    pub average_rainfall: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub rainfall_history: Vec<f64>,
    pub average_rainfall: f64,
}

/// Last known conditions for a location. Readings stay `None` on a record
/// created lazily until something fills them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherRecord {
    pub id: u64,
    pub location_id: u64,
    pub rainfall: f64,
    pub water_level: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskRecord {
    pub id: u64,
    pub location_id: u64,
    pub risk_level: RiskLevel,
    pub total_risk_score: u8,
    pub water_level: f64,
    pub timestamp: DateTime<Utc>,
}

pub trait StorageBackend: Send {
    fn list_locations(&self) -> Vec<Location>;
    fn get_location(&self, id: u64) -> Option<Location>;
    fn create_location(&mut self, new_location: NewLocation) -> Result<Location, StorageError>;
    fn delete_location(&mut self, id: u64) -> Result<bool, StorageError>;
    fn weather_record(&self, location_id: u64) -> Option<WeatherRecord>;
    fn ensure_weather_record(&mut self, location_id: u64) -> Result<WeatherRecord, StorageError>;
    fn save_assessment(
        &mut self,
        location_id: u64,
        risk_level: RiskLevel,
        total_score: u8,
        water_level: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<RiskRecord, StorageError>;
    fn assessments(&self, location_id: u64, limit: usize) -> Vec<RiskRecord>;
    fn latest_risk_level(&self, location_id: u64) -> Option<RiskLevel>;
    fn seed_default_location(&mut self) -> Result<Option<Location>, StorageError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("location {0} not found")]
    UnknownLocation(u64),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Persisted {
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    weather: Vec<WeatherRecord>,
    #[serde(default)]
    assessments: Vec<RiskRecord>,
}

#[derive(Debug, Clone, Copy)]
struct IdSequence {
    location: u64,
    weather: u64,
    assessment: u64,
}

impl IdSequence {
    fn after(persisted: &Persisted) -> Self {
        Self {
            location: next_id(persisted.locations.iter().map(|l| l.id)),
            weather: next_id(persisted.weather.iter().map(|w| w.id)),
            assessment: next_id(persisted.assessments.iter().map(|a| a.id)),
        }
    }
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}

/// Single-file JSON store. Every mutation rewrites the whole file, and the
/// in-memory state only changes once that write has succeeded.
pub struct PersistentStore {
    path: PathBuf,
    data: Persisted,
    next: IdSequence,
}

impl PersistentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if !path.exists() {
            write_snapshot(&path, &Persisted::default())?;
        }

        let bytes = fs::read(&path)?;
        let data: Persisted = serde_json::from_slice(&bytes)?;
        let next = IdSequence::after(&data);
        debug!(
            path = %path.display(),
            locations = data.locations.len(),
            assessments = data.assessments.len(),
            "opened store"
        );

        Ok(Self { path, data, next })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list_locations(&self) -> Vec<Location> {
        self.data.locations.clone()
    }

    pub fn get_location(&self, id: u64) -> Option<Location> {
        self.data.locations.iter().find(|l| l.id == id).cloned()
    }

    pub fn create_location(&mut self, new_location: NewLocation) -> Result<Location, StorageError> {
        validate(&new_location)?;

        let now = Utc::now();
        let location = Location {
            id: self.next.location,
            name: new_location.name.trim().to_string(),
            description: new_location.description,
            latitude: new_location.latitude,
            longitude: new_location.longitude,
            elevation: new_location.elevation,
            rainfall_history: new_location.rainfall_history,
            average_rainfall: new_location.average_rainfall,
            created_at: now,
            updated_at: now,
        };
        let weather = WeatherRecord {
            id: self.next.weather,
            location_id: location.id,
            rainfall: 0.0,
            water_level: 0.0,
            temperature: Some(0.0),
            humidity: Some(0.0),
            wind_speed: Some(0.0),
            timestamp: now,
        };

        let mut data = self.data.clone();
        data.locations.push(location.clone());
        data.weather.push(weather);
        let next = IdSequence {
            location: self.next.location + 1,
            weather: self.next.weather + 1,
            ..self.next
        };
        self.commit(data, next)?;

        Ok(location)
    }

    /// Removes the location together with its weather record and risk history.
    pub fn delete_location(&mut self, id: u64) -> Result<bool, StorageError> {
        if self.require_location(id).is_err() {
            return Ok(false);
        }
        let mut data = self.data.clone();
        data.locations.retain(|l| l.id != id);
        data.weather.retain(|w| w.location_id != id);
        data.assessments.retain(|a| a.location_id != id);
        self.commit(data, self.next)?;
        Ok(true)
    }

    pub fn weather_record(&self, location_id: u64) -> Option<WeatherRecord> {
        self.data
            .weather
            .iter()
            .find(|w| w.location_id == location_id)
            .cloned()
    }

    pub fn ensure_weather_record(&mut self, location_id: u64) -> Result<WeatherRecord, StorageError> {
        if let Some(existing) = self.weather_record(location_id) {
            return Ok(existing);
        }
        self.require_location(location_id)?;

        let record = WeatherRecord {
            id: self.next.weather,
            location_id,
            rainfall: 0.0,
            water_level: 0.0,
            temperature: None,
            humidity: None,
            wind_speed: None,
            timestamp: Utc::now(),
        };
        let mut data = self.data.clone();
        data.weather.push(record.clone());
        let next = IdSequence {
            weather: self.next.weather + 1,
            ..self.next
        };
        self.commit(data, next)?;
        Ok(record)
    }

    pub fn save_assessment(
        &mut self,
        location_id: u64,
        risk_level: RiskLevel,
        total_score: u8,
        water_level: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<RiskRecord, StorageError> {
        self.require_location(location_id)?;
        if !water_level.is_finite() {
            return Err(StorageError::InvalidInput(
                "water level must be finite".to_string(),
            ));
        }

        let record = RiskRecord {
            id: self.next.assessment,
            location_id,
            risk_level,
            total_risk_score: total_score,
            water_level,
            timestamp,
        };
        let mut data = self.data.clone();
        data.assessments.push(record.clone());
        let next = IdSequence {
            assessment: self.next.assessment + 1,
            ..self.next
        };
        self.commit(data, next)?;
        Ok(record)
    }

    /// Newest first.
    pub fn assessments(&self, location_id: u64, limit: usize) -> Vec<RiskRecord> {
        let n = limit.max(1);
        self.data
            .assessments
            .iter()
            .rev()
            .filter(|a| a.location_id == location_id)
            .take(n)
            .cloned()
            .collect()
    }

    pub fn latest_risk_level(&self, location_id: u64) -> Option<RiskLevel> {
        self.data
            .assessments
            .iter()
            .rev()
            .find(|a| a.location_id == location_id)
            .map(|a| a.risk_level)
    }

    /// Inserts the demo location into an empty store.
    pub fn seed_default_location(&mut self) -> Result<Option<Location>, StorageError> {
        if !self.data.locations.is_empty() {
            return Ok(None);
        }
        let seeded = self.create_location(NewLocation {
            name: DEFAULT_LOCATION_NAME.to_string(),
            description: "A test location for development".to_string(),
            latitude: 51.5074,
            longitude: -0.1278,
            elevation: 35.0,
            ..NewLocation::default()
        })?;
        info!(id = seeded.id, name = %seeded.name, "seeded default location");
        Ok(Some(seeded))
    }

    /// Record counts, for startup logging.
    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "locations": self.data.locations.len(),
            "weather_records": self.data.weather.len(),
            "assessments": self.data.assessments.len(),
        })
    }

    fn require_location(&self, location_id: u64) -> Result<(), StorageError> {
        if self.data.locations.iter().any(|l| l.id == location_id) {
            Ok(())
        } else {
            Err(StorageError::UnknownLocation(location_id))
        }
    }

    fn commit(&mut self, data: Persisted, next: IdSequence) -> Result<(), StorageError> {
        write_snapshot(&self.path, &data)?;
        self.data = data;
        self.next = next;
        Ok(())
    }
}

fn write_snapshot(path: &Path, data: &Persisted) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(data)?;
    fs::write(path, bytes)?;
    Ok(())
}

impl StorageBackend for PersistentStore {
    fn list_locations(&self) -> Vec<Location> {
        Self::list_locations(self)
    }

    fn get_location(&self, id: u64) -> Option<Location> {
        Self::get_location(self, id)
    }

    fn create_location(&mut self, new_location: NewLocation) -> Result<Location, StorageError> {
        Self::create_location(self, new_location)
    }

    fn delete_location(&mut self, id: u64) -> Result<bool, StorageError> {
        Self::delete_location(self, id)
    }

    fn weather_record(&self, location_id: u64) -> Option<WeatherRecord> {
        Self::weather_record(self, location_id)
    }

    fn ensure_weather_record(&mut self, location_id: u64) -> Result<WeatherRecord, StorageError> {
        Self::ensure_weather_record(self, location_id)
    }

    fn save_assessment(
        &mut self,
        location_id: u64,
        risk_level: RiskLevel,
        total_score: u8,
        water_level: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<RiskRecord, StorageError> {
        Self::save_assessment(self, location_id, risk_level, total_score, water_level, timestamp)
    }

    fn assessments(&self, location_id: u64, limit: usize) -> Vec<RiskRecord> {
        Self::assessments(self, location_id, limit)
    }

    fn latest_risk_level(&self, location_id: u64) -> Option<RiskLevel> {
        Self::latest_risk_level(self, location_id)
    }

    fn seed_default_location(&mut self) -> Result<Option<Location>, StorageError> {
        Self::seed_default_location(self)
    }
}

fn validate(new_location: &NewLocation) -> Result<(), StorageError> {
    if new_location.name.trim().is_empty() {
        return Err(StorageError::InvalidInput(
            "name cannot be empty".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&new_location.latitude) {
        return Err(StorageError::InvalidInput(format!(
            "latitude {} out of range",
            new_location.latitude
        )));
    }
    if !(-180.0..=180.0).contains(&new_location.longitude) {
        return Err(StorageError::InvalidInput(format!(
            "longitude {} out of range",
            new_location.longitude
        )));
    }
    if !new_location.elevation.is_finite() || !new_location.average_rainfall.is_finite() {
        return Err(StorageError::InvalidInput(
            "elevation and average rainfall must be finite".to_string(),
        ));
    }
    Ok(())
}
