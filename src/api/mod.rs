use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::core::{AggregateResult, Scenario, entropy_seed, run_projection};
use crate::store::{ProjectionRow, ProjectionStore};

const DEFAULT_SIMULATION_COUNT: u32 = 5_000;
const MAX_SIMULATION_COUNT: u32 = 1_000_000;
const DEFAULT_SCENARIO_ID: &str = "default";

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ProjectionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProjectionStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimulatePayload {
    scenario_id: Option<String>,
    simulation_count: Option<u32>,
    seed: Option<u64>,

    projection_years: Option<u32>,
    inflation_rate: Option<f64>,
    equity_return: Option<f64>,
    bond_return: Option<f64>,
    cash_return: Option<f64>,
    risk_score: Option<u8>,
    initial_wealth: Option<f64>,
    withdrawal_rate: Option<f64>,
}

#[derive(Debug)]
struct SimulateRequest {
    scenario_id: String,
    simulation_count: u32,
    seed: u64,
    scenario: Scenario,
}

#[derive(Debug, Serialize)]
struct SimulateEnvelope {
    success: bool,
    data: AggregateResult,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
    message: String,
}

fn request_from_payload(payload: SimulatePayload) -> Result<SimulateRequest, String> {
    let mut scenario = Scenario::default_assumptions();

    if let Some(v) = payload.projection_years {
        scenario.projection_years = v;
    }
    if let Some(v) = payload.inflation_rate {
        scenario.inflation_rate_pct = v;
    }
    if let Some(v) = payload.equity_return {
        scenario.real_equity_return_pct = v;
    }
    if let Some(v) = payload.bond_return {
        scenario.real_bond_return_pct = v;
    }
    if let Some(v) = payload.cash_return {
        scenario.real_cash_return_pct = v;
    }
    if let Some(v) = payload.risk_score {
        scenario.risk_score = v;
    }
    if let Some(v) = payload.initial_wealth {
        scenario.initial_wealth = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        scenario.withdrawal_rate = v;
    }

    let simulation_count = payload.simulation_count.unwrap_or(DEFAULT_SIMULATION_COUNT);
    if simulation_count == 0 {
        return Err("simulation_count must be greater than 0".to_string());
    }
    if simulation_count > MAX_SIMULATION_COUNT {
        return Err(format!(
            "simulation_count must be at most {MAX_SIMULATION_COUNT}"
        ));
    }

    if !scenario.initial_wealth.is_finite() || scenario.initial_wealth <= 0.0 {
        return Err("initial_wealth must be greater than 0".to_string());
    }
    if !scenario.withdrawal_rate.is_finite()
        || scenario.withdrawal_rate <= 0.0
        || scenario.withdrawal_rate >= 1.0
    {
        return Err("withdrawal_rate must be between 0 and 1 exclusive".to_string());
    }
    if !(1..=7).contains(&scenario.risk_score) {
        return Err("risk_score must be between 1 and 7".to_string());
    }
    for (name, rate) in [
        ("inflation_rate", scenario.inflation_rate_pct),
        ("equity_return", scenario.real_equity_return_pct),
        ("bond_return", scenario.real_bond_return_pct),
        ("cash_return", scenario.real_cash_return_pct),
    ] {
        if !rate.is_finite() {
            return Err(format!("{name} must be a finite number"));
        }
    }

    Ok(SimulateRequest {
        scenario_id: payload
            .scenario_id
            .unwrap_or_else(|| DEFAULT_SCENARIO_ID.to_string()),
        simulation_count,
        seed: payload.seed.unwrap_or_else(entropy_seed),
        scenario,
    })
}

pub async fn run_http_server(port: u16, store: Arc<dyn ProjectionStore>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(AppState::new(store));

    let listener = TcpListener::bind(addr).await?;
    info!("projection API listening on http://{addr}");

    axum::serve(listener, app).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/simulate", post(simulate_post_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", "Unknown route")
}

async fn simulate_post_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &rejection.body_text(),
                "Failed to parse simulation request",
            );
        }
    };

    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &msg, "Invalid simulation request");
        }
    };

    let scenario = request.scenario;
    let simulation_count = request.simulation_count;
    let seed = request.seed;

    let result =
        match tokio::task::spawn_blocking(move || run_projection(&scenario, simulation_count, seed))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!("simulation task failed: {e}");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "simulation task failed",
                    "Failed to run simulation",
                );
            }
        };

    let row = ProjectionRow::completed(request.scenario_id.clone(), simulation_count, result.clone());
    if let Err(e) = state.store.append(&row) {
        error!("failed to persist projection result: {e}");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &e.to_string(),
            "Failed to save simulation result",
        );
    }

    info!(
        scenario_id = %request.scenario_id,
        simulation_count,
        duration_ms = result.simulation_duration_ms,
        "projection completed"
    );

    json_response(
        StatusCode::OK,
        SimulateEnvelope {
            success: true,
            data: result,
            message: "Monte Carlo simulation completed".to_string(),
        },
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    json_response(
        status,
        ErrorEnvelope {
            success: false,
            error: error.to_string(),
            message: message.to_string(),
        },
    )
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<SimulateRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid simulate payload: {e}"))?;
    request_from_payload(payload)
}
