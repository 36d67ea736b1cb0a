//! HTTP request handlers for the fake services

pub mod config;
pub mod devices;
pub mod telemetry;

use axum::http::StatusCode;

use crate::error::ApiError;
use crate::state::{Collection, FakeState};

/// Shared DELETE behaviour: injected failures first, then 200 or 404
pub(crate) fn delete_item(
    state: &FakeState,
    collection: Collection,
    id: &str,
) -> Result<StatusCode, ApiError> {
    state.record_delete(collection);

    if state.options().failing_deletes.contains(&collection) {
        return Err(ApiError::Internal(format!(
            "Injected delete failure for {}",
            collection
        )));
    }

    if state.store().write().remove(collection, id) {
        tracing::info!(%collection, id, "Deleted");
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::not_found(collection.as_str(), id))
    }
}

/// Server-generated identifiers are lower-case UUIDs
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
