//! Config service handlers: device groups and packages

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use itest_client::{package_form, DeviceGroup, ItemList, Package, PackageType};
use serde::Serialize;

use super::{delete_item, new_id};
use crate::error::ApiError;
use crate::state::{Collection, FakeState};

/// The config service spells its envelope in lower case
#[derive(Serialize)]
pub struct DeviceGroupsResponse {
    pub items: Vec<DeviceGroup>,
}

/// GET /v1/devicegroups
pub async fn list_device_groups(
    State(state): State<FakeState>,
) -> Result<Json<DeviceGroupsResponse>, ApiError> {
    if !state.device_groups_available() {
        return Err(ApiError::ServiceUnavailable(
            "Device groups are not loaded yet".to_string(),
        ));
    }

    Ok(Json(DeviceGroupsResponse {
        items: state.options().device_groups.clone(),
    }))
}

/// GET /v1/devicegroups/{id}
pub async fn get_device_group(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceGroup>, ApiError> {
    state
        .options()
        .device_groups
        .iter()
        .find(|g| g.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("device group", &id))
}

/// POST /v1/packages
///
/// Multipart form with a `type` text field and a `package` file field.
pub async fn create_package(
    State(state): State<FakeState>,
    mut multipart: Multipart,
) -> Result<Json<Package>, ApiError> {
    let mut package_type = None;
    let mut content = None;
    let mut file_name = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(package_form::TYPE) => {
                package_type = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                );
            }
            Some(package_form::PACKAGE) => {
                file_name = field.file_name().map(str::to_string);
                content = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let package_type = match package_type.as_deref() {
        Some(t) if t == PackageType::EdgeManifest.as_str() => PackageType::EdgeManifest,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unsupported package type: {}",
                other
            )))
        }
        None => return Err(ApiError::BadRequest("Missing package type".to_string())),
    };
    let content =
        content.ok_or_else(|| ApiError::BadRequest("Missing package content".to_string()))?;
    serde_json::from_str::<serde_json::Value>(&content)
        .map_err(|e| ApiError::BadRequest(format!("Package is not valid JSON: {}", e)))?;

    let package = Package {
        id: new_id(),
        name: file_name.unwrap_or_else(|| package_form::DEFAULT_FILE_NAME.to_string()),
        package_type,
        content,
        date_created: Some(chrono::Utc::now().to_rfc3339()),
    };

    tracing::info!(package_id = %package.id, "Package uploaded");
    state
        .store()
        .write()
        .packages
        .insert(package.id.clone(), package.clone());

    Ok(Json(package))
}

/// GET /v1/packages
pub async fn list_packages(State(state): State<FakeState>) -> Json<ItemList<Package>> {
    Json(ItemList::new(
        state.store().read().packages.values().cloned().collect(),
    ))
}

/// GET /v1/packages/{id}
pub async fn get_package(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<Json<Package>, ApiError> {
    state
        .store()
        .read()
        .packages
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("package", &id))
}

/// DELETE /v1/packages/{id}
pub async fn delete_package(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, Collection::Packages, &id)
}
