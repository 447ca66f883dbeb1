use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use floodwatch_core::{FixedDrainage, RiskLevel, RiskScorer, ScoringConfig};
use floodwatch_server::{FloodServer, HttpRequest, HttpResponse};
use floodwatch_storage::{
    Location, NewLocation, PersistentStore, RiskRecord, StorageBackend, StorageError,
    WeatherRecord,
};
use floodwatch_weather::{
    Coordinates, CurrentConditions, ElevationProvider, ProviderError, WeatherProvider,
};
use serde_json::{json, Value};

struct StubWeather {
    fail_status: Option<u16>,
}

#[async_trait::async_trait]
impl WeatherProvider for StubWeather {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn forecast(&self, _at: Coordinates) -> Result<Value, ProviderError> {
        if let Some(status) = self.fail_status {
            return Err(ProviderError::Api {
                status,
                body: r#"{"error":{"message":"API key is invalid"}}"#.to_string(),
            });
        }
        Ok(wet_forecast())
    }

    async fn current(&self, _at: Coordinates) -> Result<CurrentConditions, ProviderError> {
        Ok(CurrentConditions {
            temp: 11.5,
            weather_description: "Heavy rain".to_string(),
            weather_icon: "//cdn/heavy.png".to_string(),
            humidity: 93.0,
            wind_speed: 18.0,
            precipitation: 20.0,
        })
    }
}

struct CurrentOnlyWeather;

#[async_trait::async_trait]
impl WeatherProvider for CurrentOnlyWeather {
    fn name(&self) -> &'static str {
        "current-only"
    }

    async fn forecast(&self, _at: Coordinates) -> Result<Value, ProviderError> {
        Ok(json!({"current": {"precip_mm": 5}}))
    }

    async fn current(&self, _at: Coordinates) -> Result<CurrentConditions, ProviderError> {
        Err(ProviderError::InvalidResponse("no current conditions".to_string()))
    }
}

struct StubElevation {
    reading: Option<Value>,
}

#[async_trait::async_trait]
impl ElevationProvider for StubElevation {
    fn name(&self) -> &'static str {
        "stub-elevation"
    }

    async fn elevation(&self, _at: Coordinates) -> Result<Value, ProviderError> {
        self.reading
            .clone()
            .ok_or_else(|| ProviderError::InvalidResponse("elevation service down".to_string()))
    }
}

/// Delegates to a real store but refuses every history write.
struct HistoryWriteFails(PersistentStore);

impl StorageBackend for HistoryWriteFails {
    fn list_locations(&self) -> Vec<Location> {
        self.0.list_locations()
    }

    fn get_location(&self, id: u64) -> Option<Location> {
        self.0.get_location(id)
    }

    fn create_location(&mut self, new_location: NewLocation) -> Result<Location, StorageError> {
        self.0.create_location(new_location)
    }

    fn delete_location(&mut self, id: u64) -> Result<bool, StorageError> {
        self.0.delete_location(id)
    }

    fn weather_record(&self, location_id: u64) -> Option<WeatherRecord> {
        self.0.weather_record(location_id)
    }

    fn ensure_weather_record(&mut self, location_id: u64) -> Result<WeatherRecord, StorageError> {
        self.0.ensure_weather_record(location_id)
    }

    fn save_assessment(
        &mut self,
        _location_id: u64,
        _risk_level: RiskLevel,
        _total_score: u8,
        _water_level: f64,
        _timestamp: DateTime<Utc>,
    ) -> Result<RiskRecord, StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk full")))
    }

    fn assessments(&self, location_id: u64, limit: usize) -> Vec<RiskRecord> {
        self.0.assessments(location_id, limit)
    }

    fn latest_risk_level(&self, location_id: u64) -> Option<RiskLevel> {
        self.0.latest_risk_level(location_id)
    }

    fn seed_default_location(&mut self) -> Result<Option<Location>, StorageError> {
        self.0.seed_default_location()
    }
}

fn wet_day(date: &str, precip: f64, humidity: f64) -> Value {
    json!({
        "date": date,
        "day": {
            "avgtemp_c": 12.0,
            "condition": {"text": "Heavy rain", "icon": "//cdn/heavy.png"},
            "avghumidity": humidity,
            "maxwind_kph": 30.0,
            "totalprecip_mm": precip
        }
    })
}

/// avg rainfall (20 + 40 + 44) / 3, humidity 87.5.
fn wet_forecast() -> Value {
    json!({
        "current": {
            "temp_c": 11.5,
            "condition": {"text": "Heavy rain", "icon": "//cdn/heavy.png"},
            "humidity": 93,
            "wind_kph": 18.0,
            "precip_mm": 20.0
        },
        "forecast": {"forecastday": [
            wet_day("2024-10-01", 40.0, 85.0),
            wet_day("2024-10-02", 44.0, 90.0)
        ]}
    })
}

fn temp_db_path(label: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir()
        .join(format!("floodwatch-api-{label}-{now}.json"))
        .display()
        .to_string()
}

fn server_with(
    db_path: &str,
    weather: Option<StubWeather>,
    elevation: Option<Value>,
) -> FloodServer {
    let store = PersistentStore::open(db_path).expect("open store");
    FloodServer::with_parts(
        Box::new(store),
        weather.map(|w| Arc::new(w) as Arc<dyn WeatherProvider>),
        Arc::new(StubElevation { reading: elevation }),
        RiskScorer::new(ScoringConfig::default(), Box::new(FixedDrainage::new(1))),
    )
    .expect("build server")
}

fn healthy_server(db_path: &str) -> FloodServer {
    server_with(db_path, Some(StubWeather { fail_status: None }), Some(json!([3.0])))
}

fn call(server: &FloodServer, method: &str, target: &str, body: &str) -> HttpResponse {
    server.handle(HttpRequest::new(method, target, body.as_bytes().to_vec()))
}

fn create_riverside(server: &FloodServer) -> u64 {
    let resp = call(
        server,
        "POST",
        "/api/locations",
        r#"{"name":"Riverside","latitude":52.2,"longitude":0.12,"elevation":3}"#,
    );
    assert_eq!(resp.status, 201);
    resp.json_body()["id"].as_u64().expect("location id")
}

#[test]
fn location_crud_flow_works() {
    let db_path = temp_db_path("crud");
    let server = healthy_server(&db_path);

    let id = create_riverside(&server);
    let detail = call(&server, "GET", &format!("/api/locations/{id}"), "");
    assert_eq!(detail.status, 200);
    let body = detail.json_body();
    assert_eq!(body["name"], json!("Riverside"));
    assert_eq!(body["weather_data"]["rainfall"], json!(0.0));
    assert_eq!(body["risk_level"], Value::Null);

    let list = call(&server, "GET", "/api/locations", "").json_body();
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["lat"], json!(52.2));

    let unnamed = call(&server, "POST", "/api/locations", r#"{"latitude":1,"longitude":2}"#);
    assert_eq!(unnamed.status, 201);
    assert_eq!(unnamed.json_body()["name"], json!("Unknown Location"));

    assert_eq!(call(&server, "POST", "/api/locations", "{}").status, 400);
    assert_eq!(call(&server, "POST", "/api/locations", "[1,2]").status, 400);
    assert_eq!(
        call(&server, "POST", "/api/locations", r#"{"name":"  ","latitude":1}"#).status,
        400
    );
    assert_eq!(
        call(&server, "POST", "/api/locations", r#"{"name":"Pole","latitude":120}"#).status,
        400
    );

    let deleted = call(&server, "DELETE", &format!("/api/locations/{id}"), "");
    assert_eq!(deleted.status, 200);
    assert_eq!(
        deleted.json_body()["message"],
        json!("Location deleted successfully")
    );
    assert_eq!(call(&server, "GET", &format!("/api/locations/{id}"), "").status, 404);
    assert_eq!(call(&server, "DELETE", &format!("/api/locations/{id}"), "").status, 404);
    assert_eq!(call(&server, "GET", "/api/locations/abc", "").status, 404);

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn routing_answers_404_405_and_preflight() {
    let db_path = temp_db_path("routing");
    let server = healthy_server(&db_path);

    assert_eq!(call(&server, "GET", "/health", "").json_body()["status"], json!("ok"));
    assert_eq!(call(&server, "GET", "/api/rivers", "").status, 404);
    assert_eq!(call(&server, "PUT", "/api/locations", "{}").status, 405);
    assert_eq!(call(&server, "GET", "/api/predict-flood-risk", "").status, 405);
    assert_eq!(call(&server, "OPTIONS", "/api/locations", "").status, 204);

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn predict_scores_and_persists_history() {
    let db_path = temp_db_path("predict");
    let server = healthy_server(&db_path);
    let id = create_riverside(&server);

    let resp = call(
        &server,
        "POST",
        "/api/predict-flood-risk",
        &format!(r#"{{"location_id":{id},"latitude":52.2,"longitude":0.12}}"#),
    );
    assert_eq!(resp.status, 200);
    let body = resp.json_body();
    assert_eq!(body["risk_level"], json!("HIGH"));
    assert_eq!(body["total_risk_score"], json!(9));
    assert_eq!(body["max_possible_risk"], json!(12));
    assert_eq!(body["risk_percentage"], json!(75.0));
    assert_eq!(body["risk_factors"]["rainfall_risk"], json!(2));
    assert_eq!(body["risk_factors"]["elevation_risk"], json!(3));
    assert_eq!(body["risk_factors"]["humidity_risk"], json!(3));
    assert_eq!(body["risk_factors"]["drainage_risk"], json!(1));
    assert_eq!(body["water_level"], json!(6.07));
    assert_eq!(body["weather_data"]["avg_rainfall"], json!(34.67));
    assert_eq!(body["weather_data"]["elevation"], json!(3.0));

    let history = call(
        &server,
        "GET",
        &format!("/api/locations/{id}/risk-assessments?limit=5"),
        "",
    )
    .json_body();
    assert_eq!(history["count"], json!(1));
    assert_eq!(history["assessments"][0]["risk_level"], json!("HIGH"));
    assert_eq!(history["assessments"][0]["total_risk_score"], json!(9));

    let list = call(&server, "GET", "/api/locations", "").json_body();
    assert_eq!(list[0]["risk_level"], json!("HIGH"));

    let stranger = call(
        &server,
        "POST",
        "/api/predict-flood-risk",
        r#"{"location_id":77,"latitude":"52.2","longitude":[0.12]}"#,
    );
    assert_eq!(stranger.status, 200);
    assert_eq!(
        call(&server, "GET", "/api/locations/77/risk-assessments", "").status,
        404
    );

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn predict_validates_coordinates_and_key() {
    let db_path = temp_db_path("predict-errors");
    let server = healthy_server(&db_path);
    assert_eq!(
        call(&server, "POST", "/api/predict-flood-risk", r#"{"latitude":52.2}"#).status,
        400
    );
    assert_eq!(call(&server, "POST", "/api/predict-flood-risk", "").status, 400);
    let at_origin = call(
        &server,
        "POST",
        "/api/predict-flood-risk",
        r#"{"latitude":0,"longitude":0}"#,
    );
    assert_eq!(at_origin.status, 200);

    let keyless = server_with(&db_path, None, Some(json!([3.0])));
    let resp = call(
        &keyless,
        "POST",
        "/api/predict-flood-risk",
        r#"{"latitude":52.2,"longitude":0.12}"#,
    );
    assert_eq!(resp.status, 500);
    assert_eq!(
        resp.json_body()["error"],
        json!("Weather API key not configured")
    );

    let rejected = server_with(
        &db_path,
        Some(StubWeather {
            fail_status: Some(403),
        }),
        Some(json!([3.0])),
    );
    let resp = call(
        &rejected,
        "POST",
        "/api/predict-flood-risk",
        r#"{"latitude":52.2,"longitude":0.12}"#,
    );
    assert_eq!(resp.status, 403);
    assert_eq!(resp.json_body()["error"], json!("Failed to fetch weather data"));

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn elevation_outage_scores_without_elevation() {
    let db_path = temp_db_path("elevation-down");
    let server = server_with(&db_path, Some(StubWeather { fail_status: None }), None);
    let resp = call(
        &server,
        "POST",
        "/api/predict-flood-risk",
        r#"{"latitude":52.2,"longitude":0.12}"#,
    );
    assert_eq!(resp.status, 200);
    let body = resp.json_body();
    assert_eq!(body["risk_factors"]["elevation_risk"], json!(0));
    assert_eq!(body["weather_data"]["elevation"], json!(0.0));
    assert_eq!(body["total_risk_score"], json!(6));
    assert_eq!(body["risk_level"], json!("MEDIUM"));

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn weather_data_is_created_on_demand() {
    let db_path = temp_db_path("weather-data");
    let server = healthy_server(&db_path);
    let id = create_riverside(&server);

    assert_eq!(call(&server, "GET", "/api/weather-data", "").status, 400);
    assert_eq!(call(&server, "GET", "/api/weather-data?location_id=x", "").status, 400);
    assert_eq!(call(&server, "GET", "/api/weather-data?location_id=999", "").status, 404);

    let resp = call(&server, "GET", &format!("/api/weather-data?location_id={id}"), "");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json_body()["location_id"], json!(id));

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn weather_report_summarizes_forecast() {
    let db_path = temp_db_path("weather");
    let server = healthy_server(&db_path);

    let resp = call(&server, "GET", "/api/weather?lat=52.2&lng=0.12", "");
    assert_eq!(resp.status, 200);
    let body = resp.json_body();
    assert_eq!(body["current"]["weather_description"], json!("Heavy rain"));
    assert_eq!(body["forecast"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["water_level"]["status"], json!("MEDIUM"));

    assert_eq!(call(&server, "GET", "/api/weather?lat=52.2", "").status, 400);

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn share_location_composes_payload() {
    let db_path = temp_db_path("share");
    let server = healthy_server(&db_path);
    let id = create_riverside(&server);

    let resp = call(&server, "GET", &format!("/api/share-location/{id}"), "");
    assert_eq!(resp.status, 200);
    let body = resp.json_body();
    assert_eq!(body["location"]["name"], json!("Riverside"));
    assert_eq!(body["weather"]["condition"], json!("Heavy rain"));
    assert_eq!(body["risk"]["risk_level"], json!("HIGH"));
    assert_eq!(body["app_name"], json!("floodwatch"));
    assert!(body["timestamp"].as_str().is_some());

    let history = call(
        &server,
        "GET",
        &format!("/api/locations/{id}/risk-assessments"),
        "",
    )
    .json_body();
    assert_eq!(history["count"], json!(1));
    assert_eq!(call(&server, "GET", "/api/share-location/404", "").status, 404);

    let keyless = server_with(&db_path, None, Some(json!([3.0])));
    let degraded = call(&keyless, "GET", &format!("/api/share-location/{id}"), "").json_body();
    assert_eq!(degraded["weather"], json!({}));
    assert_eq!(degraded["risk"], json!({}));

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn history_write_failures_do_not_fail_scoring() {
    let db_path = temp_db_path("history-fails");
    let store = PersistentStore::open(&db_path).expect("open store");
    let server = FloodServer::with_parts(
        Box::new(HistoryWriteFails(store)),
        Some(Arc::new(StubWeather { fail_status: None }) as Arc<dyn WeatherProvider>),
        Arc::new(StubElevation {
            reading: Some(json!([3.0])),
        }),
        RiskScorer::new(ScoringConfig::default(), Box::new(FixedDrainage::new(1))),
    )
    .expect("build server");
    let id = create_riverside(&server);

    let resp = call(
        &server,
        "POST",
        "/api/predict-flood-risk",
        &format!(r#"{{"location_id":{id},"latitude":52.2,"longitude":0.12}}"#),
    );
    assert_eq!(resp.status, 200);
    let body = resp.json_body();
    assert_eq!(body["risk_level"], json!("HIGH"));
    assert_eq!(body["total_risk_score"], json!(9));
    assert_eq!(body["water_level"], json!(6.07));

    let shared = call(&server, "GET", &format!("/api/share-location/{id}"), "");
    assert_eq!(shared.status, 200);
    let shared = shared.json_body();
    assert_eq!(shared["risk"]["risk_level"], json!("HIGH"));
    assert_eq!(shared["weather"]["condition"], json!("Heavy rain"));

    let history = call(
        &server,
        "GET",
        &format!("/api/locations/{id}/risk-assessments"),
        "",
    )
    .json_body();
    assert_eq!(history["count"], json!(0));
    assert_eq!(
        call(&server, "GET", "/api/locations", "").json_body()[0]["risk_level"],
        Value::Null
    );

    let _ = std::fs::remove_file(db_path);
}

#[test]
fn current_only_forecast_echoes_unsigned_zero_total() {
    let db_path = temp_db_path("current-only");
    let store = PersistentStore::open(&db_path).expect("open store");
    let server = FloodServer::with_parts(
        Box::new(store),
        Some(Arc::new(CurrentOnlyWeather) as Arc<dyn WeatherProvider>),
        Arc::new(StubElevation { reading: None }),
        RiskScorer::new(ScoringConfig::default(), Box::new(FixedDrainage::new(0))),
    )
    .expect("build server");

    let resp = call(
        &server,
        "POST",
        "/api/predict-flood-risk",
        r#"{"latitude":52.2,"longitude":0.12}"#,
    );
    assert_eq!(resp.status, 200);
    let text = String::from_utf8(resp.body).expect("utf8 body");
    assert!(text.contains(r#""forecast_rainfall":0.0"#), "{text}");
    assert!(!text.contains("-0.0"), "{text}");

    let _ = std::fs::remove_file(db_path);
}
