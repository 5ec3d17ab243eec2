//! Summary, estimate and review endpoints

use api_types::{
    review::ReviewView,
    summary::{CreditEstimateView, EstimateQuery, QreSummaryView},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::CustomerId;

use crate::{ServerError, server::ServerState};

/// Handle requests for the QRE totals per category
pub async fn summary(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
) -> Result<Json<QreSummaryView>, ServerError> {
    let summary = state.engine.summary(&customer).await?;
    Ok(Json(QreSummaryView::from(&summary)))
}

/// Handle requests for the credit estimate and price
pub async fn estimate(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<CreditEstimateView>, ServerError> {
    let estimate = state
        .engine
        .estimate(&customer, query.additional_years.unwrap_or(0))
        .await?;
    Ok(Json(CreditEstimateView::from(&estimate)))
}

pub async fn review(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
) -> Result<Json<ReviewView>, ServerError> {
    let review = state.engine.review(&customer).await?;
    Ok(Json(ReviewView::from(&review)))
}
