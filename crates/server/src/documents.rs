//! Document generation endpoints

use api_types::documents::DocumentJobView;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{CustomerId, TrackingId};

use crate::{ServerError, server::ServerState};

/// Handle requests for generating the customer's filing documents.
///
/// Answers as soon as the job is accepted; progress is polled in the
/// background and read back through [`get`].
pub async fn submit(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<DocumentJobView>), ServerError> {
    let job = state.engine.submit_documents(&customer).await?;
    Ok((StatusCode::ACCEPTED, Json(DocumentJobView::from(&job))))
}

/// Handle requests for a job's progress
pub async fn get(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<DocumentJobView>, ServerError> {
    let job = state
        .engine
        .document_job(&customer, &TrackingId::new(tracking_id))?;
    Ok(Json(DocumentJobView::from(&job)))
}
