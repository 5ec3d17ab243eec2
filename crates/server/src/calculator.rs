//! Public calculator endpoint

use api_types::calculator::{CalculatorRequest, CalculatorResponse};
use axum::{Json, extract::State};

use crate::server::ServerState;

/// Handle calculator requests. No customer is involved and nothing is saved.
pub async fn estimate(
    State(state): State<ServerState>,
    Json(payload): Json<CalculatorRequest>,
) -> Json<CalculatorResponse> {
    let estimate = state.engine.quick_estimate(&payload.into());
    Json(CalculatorResponse::from(&estimate))
}
