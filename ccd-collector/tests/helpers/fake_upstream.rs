//! Fake government APIs for integration tests
//!
//! Serves Census, FEMA, BLS and PLACES look-alike endpoints on an ephemeral
//! local port. Responses come from a [`Scenario`]; every request is recorded
//! so tests can assert on call order and batch sizes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ccd_common::config::CollectorConfig;
use ccd_common::Region;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Canned upstream data
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// State FIPS → (county code, county name)
    pub counties: HashMap<String, Vec<(String, String)>>,
    /// State FIPS codes whose Census request returns 500
    pub census_failing: HashSet<String>,
    /// Postal code → designated areas; missing states answer 404
    pub fema: HashMap<String, Vec<String>>,
    /// 1-based BLS POST numbers answered with REQUEST_NOT_PROCESSED
    pub bls_rejected: HashSet<usize>,
    /// Postal code → raw PLACES records
    pub places: HashMap<String, Vec<Value>>,
}

impl Scenario {
    pub fn with_counties(mut self, state_fips: &str, counties: &[(&str, &str)]) -> Self {
        self.counties.insert(
            state_fips.to_string(),
            counties
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        );
        self
    }

    /// `count` synthetic counties named `County 001`, `County 003`, ...
    pub fn with_generated_counties(mut self, state_fips: &str, count: usize) -> Self {
        let counties = (0..count)
            .map(|i| {
                let code = format!("{:03}", i * 2 + 1);
                let name = format!("County {}", code);
                (code, name)
            })
            .collect();
        self.counties.insert(state_fips.to_string(), counties);
        self
    }
}

/// Requests seen by the fake server, in arrival order
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    pub census_states: Vec<String>,
    pub census_variables: Vec<String>,
    pub fema_filters: Vec<String>,
    pub bls_batches: Vec<usize>,
    pub places_states: Vec<String>,
}

#[derive(Clone)]
struct Shared {
    scenario: Arc<Scenario>,
    log: Arc<Mutex<RequestLog>>,
}

/// Running fake upstream
pub struct FakeUpstream {
    pub base_url: String,
    log: Arc<Mutex<RequestLog>>,
}

impl FakeUpstream {
    pub async fn start(scenario: Scenario) -> Self {
        let shared = Shared {
            scenario: Arc::new(scenario),
            log: Arc::new(Mutex::new(RequestLog::default())),
        };
        let log = Arc::clone(&shared.log);

        let app = Router::new()
            .route("/data/2021/acs/acs5", get(census))
            .route("/fema", get(fema))
            .route("/bls", post(bls))
            .route("/places", get(places))
            .with_state(shared);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            log,
        }
    }

    pub fn log(&self) -> RequestLog {
        self.log.lock().unwrap().clone()
    }

    /// Collector configuration pointed at this server, with short delays
    pub fn config(&self) -> CollectorConfig {
        let mut config = CollectorConfig::default();
        config.census.base_url = format!("{}/data", self.base_url);
        config.census.export_delay_ms = 0;
        config.fema.base_url = format!("{}/fema", self.base_url);
        config.bls.base_url = format!("{}/bls", self.base_url);
        config.bls.registration_key = "test-key".to_string();
        config.bls.batch_delay_ms = 20;
        config.places.base_url = format!("{}/places", self.base_url);
        config.run.region_delay_ms = 0;
        config.http.timeout_secs = 5;
        config
    }
}

fn state_name(fips: &str) -> String {
    Region::all()
        .into_iter()
        .find(|r| r.fips == fips)
        .map(|r| r.name)
        .unwrap_or_else(|| "Puerto Rico".to_string())
}

async fn census(State(shared): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Response {
    let fips = params
        .get("in")
        .and_then(|v| v.strip_prefix("state:"))
        .unwrap_or_default()
        .to_string();
    let variables: Vec<String> = params
        .get("get")
        .map(|g| g.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    {
        let mut log = shared.log.lock().unwrap();
        log.census_states.push(fips.clone());
        log.census_variables = variables.clone();
    }

    if shared.scenario.census_failing.contains(&fips) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    let mut header = variables.clone();
    header.push("state".to_string());
    header.push("county".to_string());
    let mut rows = vec![json!(header)];

    let state = state_name(&fips);
    for (code, name) in shared.scenario.counties.get(&fips).into_iter().flatten() {
        let mut row: Vec<Value> = variables
            .iter()
            .map(|v| match v.as_str() {
                "NAME" => json!(format!("{} County, {}", name, state)),
                "B19013_001E" if name.starts_with("Tiny") => json!("-666666666"),
                _ => json!("1000"),
            })
            .collect();
        row.push(json!(fips));
        row.push(json!(code));
        rows.push(Value::Array(row));
    }

    Json(Value::Array(rows)).into_response()
}

async fn fema(State(shared): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Response {
    let filter = params.get("$filter").cloned().unwrap_or_default();
    shared.log.lock().unwrap().fema_filters.push(filter.clone());

    let postal = filter
        .strip_prefix("state eq '")
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or_default();

    match shared.scenario.fema.get(postal) {
        Some(areas) => {
            let summaries: Vec<Value> = areas.iter().map(|a| json!({ "designatedArea": a })).collect();
            Json(json!({ "DisasterDeclarationsSummaries": summaries })).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn bls(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let series: Vec<String> = body["seriesid"]
        .as_array()
        .map(|ids| ids.iter().filter_map(|id| id.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let call = {
        let mut log = shared.log.lock().unwrap();
        log.bls_batches.push(series.len());
        log.bls_batches.len()
    };

    if shared.scenario.bls_rejected.contains(&call) {
        return Json(json!({
            "status": "REQUEST_NOT_PROCESSED",
            "message": ["Daily threshold for total number of requests allocated has been reached."]
        }))
        .into_response();
    }

    let results: Vec<Value> = series
        .iter()
        .map(|id| {
            json!({
                "seriesID": id,
                "data": [
                    { "year": "2023", "period": "M12", "value": "4.5" },
                    { "year": "2023", "period": "M11", "value": "4.7" }
                ]
            })
        })
        .collect();

    Json(json!({ "status": "REQUEST_SUCCEEDED", "message": [], "Results": { "series": results } }))
        .into_response()
}

async fn places(State(shared): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Response {
    let postal = params.get("stateabbr").cloned().unwrap_or_default();
    shared.log.lock().unwrap().places_states.push(postal.clone());

    let records = shared.scenario.places.get(&postal).cloned().unwrap_or_default();
    Json(Value::Array(records)).into_response()
}
