use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use floodwatch_core::{
    build_drainage_source, to_float, try_float, FieldValue, RiskAssessment, RiskInputs,
    RiskLevel, RiskScorer, ScoringConfig,
};
use floodwatch_storage::{
    Location, NewLocation, PersistentStore, StorageBackend, WeatherRecord,
};
use floodwatch_weather::{
    build_elevation_provider, build_weather_provider, summarize_forecast, Coordinates,
    ElevationProvider, ElevationProviderConfig, WeatherProvider, WeatherProviderConfig,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::{read_http_request, write_http_response, HttpRequest, HttpResponse};

pub const APP_NAME: &str = "floodwatch";
const DEFAULT_LOCATION_NAME: &str = "Unknown Location";
const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 500;

pub struct FloodServer {
    store: Mutex<Box<dyn StorageBackend>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    elevation: Arc<dyn ElevationProvider>,
    scorer: parking_lot::Mutex<RiskScorer>,
    runtime: tokio::runtime::Runtime,
}

impl FloodServer {
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let mut store = PersistentStore::open(&config.db_path)?;
        if config.seed_location {
            store.seed_default_location()?;
        }

        let weather = match config.weather_api() {
            Some(cfg) => Some(build_weather_provider(WeatherProviderConfig::WeatherApi(cfg))?),
            None => {
                warn!("WEATHER_API_KEY is not set; weather and risk routes will answer 500");
                None
            }
        };
        let elevation =
            build_elevation_provider(ElevationProviderConfig::OpenMeteo(config.open_meteo()))?;
        let scorer = RiskScorer::new(
            ScoringConfig::default(),
            build_drainage_source(config.drainage),
        );
        info!(
            db = %store.path().display(),
            store = %store.stats(),
            drainage = %config.drainage,
            forecast_days = config.forecast_days,
            "floodwatch server configured"
        );

        Self::with_parts(Box::new(store), weather, elevation, scorer)
    }

    pub fn with_parts(
        store: Box<dyn StorageBackend>,
        weather: Option<Arc<dyn WeatherProvider>>,
        elevation: Arc<dyn ElevationProvider>,
        scorer: RiskScorer,
    ) -> Result<Self, ServerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            store: Mutex::new(store),
            weather,
            elevation,
            scorer: parking_lot::Mutex::new(scorer),
            runtime,
        })
    }

    pub fn serve_http(&self, addr: &str) -> io::Result<()> {
        let listener = TcpListener::bind(addr)?;
        info!(addr = %listener.local_addr()?, "floodwatch http listening");
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(err) = self.handle_http_connection(stream) {
                        warn!(error = %err, "http request error");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "http accept error");
                }
            }
        }
        Ok(())
    }

    fn handle_http_connection(&self, mut stream: TcpStream) -> io::Result<()> {
        let Some(req) = read_http_request(&stream)? else {
            return Ok(());
        };
        let response = self.handle(req);
        write_http_response(&mut stream, &response)
    }

    /// Routes one request. Never panics on request input; failures become
    /// JSON error bodies.
    pub fn handle(&self, req: HttpRequest) -> HttpResponse {
        if req.method == "OPTIONS" {
            return HttpResponse::no_content();
        }
        let response = match self.dispatch(&req) {
            Ok(resp) => resp,
            Err(err) => {
                if err.status() >= 500 {
                    error!(method = %req.method, path = %req.path, error = %err.redacted(), "request failed");
                } else {
                    debug!(method = %req.method, path = %req.path, error = %err.redacted(), "request rejected");
                }
                err.to_response()
            }
        };
        debug!(method = %req.method, path = %req.path, status = response.status, "handled");
        response
    }

    fn dispatch(&self, req: &HttpRequest) -> Result<HttpResponse, ServerError> {
        let segments: Vec<&str> = req
            .path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match (req.method.as_str(), segments.as_slice()) {
            ("GET", ["health"]) => Ok(HttpResponse::json(200, json!({"status": "ok"}))),
            ("GET", ["api", "locations"]) => self.list_locations(),
            ("POST", ["api", "locations"]) => self.create_location(req),
            ("GET", ["api", "locations", id]) => self.get_location(id),
            ("DELETE", ["api", "locations", id]) => self.delete_location(id),
            ("GET", ["api", "locations", id, "risk-assessments"]) => {
                self.risk_history(id, req.query_param("limit"))
            }
            ("GET", ["api", "weather-data"]) => self.weather_data(req.query_param("location_id")),
            ("POST", ["api", "predict-flood-risk"]) => self.predict_flood_risk(req),
            ("GET", ["api", "weather"]) => self.weather_report(req),
            ("GET", ["api", "share-location", id]) => self.share_location(id),
            (_, path) if is_known_route(path) => Err(ServerError::MethodNotAllowed),
            _ => Err(ServerError::NotFound("Not found".to_string())),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Box<dyn StorageBackend>>, ServerError> {
        self.store
            .lock()
            .map_err(|_| ServerError::Io(io::Error::other("storage lock poisoned")))
    }

    fn list_locations(&self) -> Result<HttpResponse, ServerError> {
        let store = self.store()?;
        let items: Vec<Value> = store
            .list_locations()
            .iter()
            .map(|loc| location_summary(loc, store.latest_risk_level(loc.id)))
            .collect();
        Ok(HttpResponse::json(200, Value::Array(items)))
    }

    fn create_location(&self, req: &HttpRequest) -> Result<HttpResponse, ServerError> {
        let body = match req.json_body() {
            Some(Value::Object(map)) if !map.is_empty() => Value::Object(map),
            _ => return Err(ServerError::BadRequest("No data provided".to_string())),
        };
        let new_location = new_location_from(&body);

        let mut store = self.store()?;
        let created = store.create_location(new_location)?;
        info!(id = created.id, name = %created.name, "location created");
        let weather = store.weather_record(created.id);
        Ok(HttpResponse::json(
            201,
            location_detail(&created, weather.as_ref(), None),
        ))
    }

    fn get_location(&self, raw_id: &str) -> Result<HttpResponse, ServerError> {
        let id = parse_location_id(raw_id)?;
        let store = self.store()?;
        let location = store.get_location(id).ok_or_else(location_not_found)?;
        let weather = store.weather_record(id);
        Ok(HttpResponse::json(
            200,
            location_detail(&location, weather.as_ref(), store.latest_risk_level(id)),
        ))
    }

    fn delete_location(&self, raw_id: &str) -> Result<HttpResponse, ServerError> {
        let id = parse_location_id(raw_id)?;
        if !self.store()?.delete_location(id)? {
            return Err(location_not_found());
        }
        info!(id, "location deleted");
        Ok(HttpResponse::json(
            200,
            json!({"message": "Location deleted successfully"}),
        ))
    }

    fn risk_history(&self, raw_id: &str, limit: Option<&str>) -> Result<HttpResponse, ServerError> {
        let id = parse_location_id(raw_id)?;
        let limit = limit
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        let store = self.store()?;
        if store.get_location(id).is_none() {
            return Err(location_not_found());
        }
        let records = store.assessments(id, limit);
        Ok(HttpResponse::json(
            200,
            json!({
                "location_id": id,
                "count": records.len(),
                "assessments": records,
            }),
        ))
    }

    fn weather_data(&self, location_id: Option<&str>) -> Result<HttpResponse, ServerError> {
        let raw = location_id
            .ok_or_else(|| ServerError::BadRequest("Location ID is required".to_string()))?;
        let id = raw.trim().parse::<u64>().map_err(|_| {
            ServerError::BadRequest("Location ID must be a positive integer".to_string())
        })?;
        let record = self.store()?.ensure_weather_record(id)?;
        Ok(HttpResponse::json(200, serde_json::to_value(record)?))
    }

    fn predict_flood_risk(&self, req: &HttpRequest) -> Result<HttpResponse, ServerError> {
        let body = req.json_body().unwrap_or(Value::Null);
        let at = coordinates_from(
            &FieldValue::field(&body, "latitude"),
            &FieldValue::field(&body, "longitude"),
        )?;
        let location_id = body.get("location_id").and_then(location_id_from);

        let assessment = self.assess(at)?;
        if let Some(id) = location_id {
            self.record_assessment(id, &assessment);
        }
        Ok(HttpResponse::json(200, serde_json::to_value(&assessment)?))
    }

    fn weather_report(&self, req: &HttpRequest) -> Result<HttpResponse, ServerError> {
        let text = |name: &str| {
            req.query_param(name)
                .map_or(FieldValue::Absent, |v| FieldValue::Text(v.to_string()))
        };
        let at = coordinates_from(&text("lat"), &text("lng"))?;
        let weather = self.weather.as_ref().ok_or(ServerError::MissingApiKey)?;

        let payload = self.runtime.block_on(weather.forecast(at))?;
        let report = summarize_forecast(&payload)?;
        Ok(HttpResponse::json(200, serde_json::to_value(report)?))
    }

    fn share_location(&self, raw_id: &str) -> Result<HttpResponse, ServerError> {
        let id = parse_location_id(raw_id)?;
        let location = self.store()?.get_location(id).ok_or_else(location_not_found)?;
        let at = Coordinates::new(location.latitude, location.longitude);

        let current_weather = self.weather.as_ref().map_or_else(
            || json!({}),
            |weather| match self.runtime.block_on(weather.current(at)) {
                Ok(current) => json!({
                    "temp": current.temp,
                    "condition": current.weather_description,
                    "humidity": current.humidity,
                    "wind_speed": current.wind_speed,
                }),
                Err(err) => {
                    warn!(id, error = %err.redacted(&[]), "share: current weather unavailable");
                    json!({})
                }
            },
        );

        let risk = match self.assess(at) {
            Ok(assessment) => {
                self.record_assessment(id, &assessment);
                serde_json::to_value(&assessment)?
            }
            Err(err) => {
                warn!(id, error = %err.redacted(), "share: risk assessment unavailable");
                json!({})
            }
        };

        Ok(HttpResponse::json(
            200,
            json!({
                "location": {
                    "name": location.name,
                    "latitude": location.latitude,
                    "longitude": location.longitude,
                    "description": location.description,
                },
                "weather": current_weather,
                "risk": risk,
                "timestamp": Utc::now().to_rfc3339(),
                "app_name": APP_NAME,
            }),
        ))
    }

    /// Fetches forecast and elevation and scores them. A missing elevation
    /// degrades to an absent reading; a failed forecast fails the call.
    fn assess(&self, at: Coordinates) -> Result<RiskAssessment, ServerError> {
        let weather = self.weather.as_ref().ok_or(ServerError::MissingApiKey)?;
        let payload = self.runtime.block_on(weather.forecast(at))?;
        let elevation = match self.runtime.block_on(self.elevation.elevation(at)) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    provider = self.elevation.name(),
                    error = %err.redacted(&[]),
                    "elevation lookup failed; scoring without it"
                );
                Value::Null
            }
        };

        let inputs = RiskInputs::from_payload(&payload, &elevation);
        let assessment = self.scorer.lock().assess(&inputs);
        debug!(
            at = %at,
            level = %assessment.risk_level,
            total = assessment.total_risk_score,
            "risk assessed"
        );
        Ok(assessment)
    }

    /// Appends to the history of an existing location. Failures are logged
    /// and never reach the caller.
    fn record_assessment(&self, location_id: u64, assessment: &RiskAssessment) {
        let mut store = match self.store() {
            Ok(store) => store,
            Err(err) => {
                warn!(location_id, error = %err, "risk history not saved");
                return;
            }
        };
        if store.get_location(location_id).is_none() {
            debug!(location_id, "risk history skipped for unknown location");
            return;
        }
        if let Err(err) = store.save_assessment(
            location_id,
            assessment.risk_level,
            assessment.total_risk_score,
            assessment.water_level,
            Utc::now(),
        ) {
            warn!(location_id, error = %err, "risk history not saved");
        }
    }
}

fn is_known_route(segments: &[&str]) -> bool {
    matches!(
        segments,
        ["health"]
            | ["api", "locations"]
            | ["api", "locations", _]
            | ["api", "locations", _, "risk-assessments"]
            | ["api", "weather-data"]
            | ["api", "predict-flood-risk"]
            | ["api", "weather"]
            | ["api", "share-location", _]
    )
}

fn location_not_found() -> ServerError {
    ServerError::NotFound("Location not found".to_string())
}

/// Non-numeric ids cannot name a location, so they read as missing.
fn parse_location_id(raw: &str) -> Result<u64, ServerError> {
    raw.parse::<u64>().map_err(|_| location_not_found())
}

fn location_id_from(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Both coordinates must be readable numbers inside the valid ranges.
/// Zero is a legitimate coordinate.
fn coordinates_from(lat: &FieldValue, lng: &FieldValue) -> Result<Coordinates, ServerError> {
    let (Some(latitude), Some(longitude)) = (try_float(lat), try_float(lng)) else {
        return Err(ServerError::BadRequest(
            "Latitude and longitude are required".to_string(),
        ));
    };
    let at = Coordinates::new(latitude, longitude);
    if !at.is_valid() {
        return Err(ServerError::BadRequest(
            "Latitude and longitude are out of range".to_string(),
        ));
    }
    Ok(at)
}

fn new_location_from(body: &Value) -> NewLocation {
    let text = |key: &str, default: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let number = |key: &str| to_float(&FieldValue::field(body, key), 0.0);
    let rainfall_history = body
        .get("rainfall_history")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| to_float(&FieldValue::from_json(v), 0.0))
                .collect()
        })
        .unwrap_or_default();

    NewLocation {
        name: text("name", DEFAULT_LOCATION_NAME),
        description: text("description", ""),
        latitude: number("latitude"),
        longitude: number("longitude"),
        elevation: number("elevation"),
        rainfall_history,
        average_rainfall: number("average_rainfall"),
    }
}

fn location_summary(location: &Location, risk_level: Option<RiskLevel>) -> Value {
    json!({
        "id": location.id,
        "name": location.name,
        "description": location.description,
        "lat": location.latitude,
        "lng": location.longitude,
        "elevation": location.elevation,
        "risk_level": risk_level,
        "created_at": location.created_at.to_rfc3339(),
        "updated_at": location.updated_at.to_rfc3339(),
    })
}

fn location_detail(
    location: &Location,
    weather: Option<&WeatherRecord>,
    risk_level: Option<RiskLevel>,
) -> Value {
    json!({
        "id": location.id,
        "name": location.name,
        "latitude": location.latitude,
        "longitude": location.longitude,
        "description": location.description,
        "elevation": location.elevation,
        "rainfall_history": location.rainfall_history,
        "average_rainfall": location.average_rainfall,
        "weather_data": weather,
        "risk_level": risk_level,
        "timestamp": location.updated_at.to_rfc3339(),
    })
}
