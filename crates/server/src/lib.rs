use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use api_types::ErrorBody;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod calculator;
mod documents;
mod export;
mod ledger;
mod server;
mod summary;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
    /// Failure on our side. The detail is logged, never returned.
    Internal(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidCustomer(_)
        | EngineError::InvalidCategory(_)
        | EngineError::InvalidId(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Store(_) | EngineError::DocumentService(_) => StatusCode::BAD_GATEWAY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Store(store_err) => {
            tracing::error!("record store error: {store_err}");
            "record store unavailable".to_string()
        }
        EngineError::DocumentService(doc_err) => {
            tracing::error!("document service error: {doc_err}");
            "document service unavailable".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Internal(detail) => {
                tracing::error!("internal error: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
