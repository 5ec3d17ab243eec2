//! Ledger API endpoints

use api_types::ledger::{
    CloudSoftwarePatch, ContractorPatch, EntryCreated, LedgerSnapshot, SupplyPatch, WagePatch,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Category, CustomerId, EngineError, EntryId, EntryPatch};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ServerError, server::ServerState};

/// Handle requests for the customer's full ledger
pub async fn get(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerSnapshot>, ServerError> {
    let ledger = state.engine.ledger(&customer).await?;
    Ok(Json(LedgerSnapshot::from(&ledger)))
}

/// Handle requests for appending an empty entry to a category
pub async fn add(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
    Path(category): Path<String>,
) -> Result<(StatusCode, Json<EntryCreated>), ServerError> {
    let category: Category = category.parse()?;
    let id = state.engine.add_entry(&customer, category).await?;

    Ok((
        StatusCode::CREATED,
        Json(EntryCreated { id: id.to_string() }),
    ))
}

/// Handle requests for patching one entry.
///
/// The body is the patch of the category in the path; unknown fields are
/// rejected.
pub async fn update(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
    Path((category, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<LedgerSnapshot>, ServerError> {
    let category: Category = category.parse()?;
    let id: EntryId = id.parse()?;
    let patch = patch_for(category, body)?;

    if !state.engine.update_entry(&customer, &id, patch).await? {
        return Err(EngineError::KeyNotFound(format!("{category}/{id}")).into());
    }

    let ledger = state.engine.ledger(&customer).await?;
    Ok(Json(LedgerSnapshot::from(&ledger)))
}

fn patch_for(category: Category, body: Value) -> Result<EntryPatch, ServerError> {
    fn parse<T: DeserializeOwned>(category: Category, body: Value) -> Result<T, ServerError> {
        serde_json::from_value(body)
            .map_err(|err| ServerError::Generic(format!("invalid {category} patch: {err}")))
    }

    Ok(match category {
        Category::Wages => engine::WagePatch::from(parse::<WagePatch>(category, body)?).into(),
        Category::Contractors => {
            engine::ContractorPatch::from(parse::<ContractorPatch>(category, body)?).into()
        }
        Category::Supplies => {
            engine::SupplyPatch::from(parse::<SupplyPatch>(category, body)?).into()
        }
        Category::CloudSoftware => {
            engine::CloudSoftwarePatch::from(parse::<CloudSoftwarePatch>(category, body)?).into()
        }
    })
}

/// Handle requests for removing an entry. Removing a missing entry succeeds.
pub async fn remove(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
    Path((category, id)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    let category: Category = category.parse()?;
    let id: EntryId = id.parse()?;
    state.engine.remove_entry(&customer, category, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handle requests for saving pending changes right away
pub async fn save(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.flush(&customer).await?;
    if state.engine.is_dirty(&customer).await {
        return Err(EngineError::Store("ledger could not be saved".to_string()).into());
    }

    Ok(StatusCode::NO_CONTENT)
}
