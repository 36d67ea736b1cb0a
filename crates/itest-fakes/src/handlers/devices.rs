//! Device-management handlers: devices and deployments

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use itest_client::{
    deployment_id, Authentication, AuthenticationType, Deployment, DeploymentMetrics, Device,
    ItemList, NewDeployment, NewDevice,
};

use super::{delete_item, new_id};
use crate::error::ApiError;
use crate::state::{Collection, FakeState};

/// Base64 of 32 random bytes, the shape of a generated symmetric key
fn generate_key() -> String {
    let mut raw = [0u8; 32];
    raw[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    raw[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    STANDARD.encode(raw)
}

/// Fill in whatever credentials the caller left to the service
fn resolve_authentication(auth: Authentication) -> Result<Authentication, ApiError> {
    match auth.authentication_type {
        AuthenticationType::Sas => Ok(Authentication {
            primary_key: auth.primary_key.or_else(|| Some(generate_key())),
            secondary_key: auth.secondary_key.or_else(|| Some(generate_key())),
            primary_thumbprint: None,
            secondary_thumbprint: None,
            authentication_type: AuthenticationType::Sas,
        }),
        AuthenticationType::SelfSigned | AuthenticationType::CertificateAuthority => {
            if auth.authentication_type == AuthenticationType::SelfSigned
                && auth.primary_thumbprint.is_none()
            {
                return Err(ApiError::BadRequest(
                    "Self-signed authentication requires a primary thumbprint".to_string(),
                ));
            }
            Ok(Authentication {
                primary_key: None,
                secondary_key: None,
                ..auth
            })
        }
    }
}

/// POST /v1/devices
pub async fn create_device(
    State(state): State<FakeState>,
    Json(request): Json<NewDevice>,
) -> Result<Json<Device>, ApiError> {
    let id = if request.id.trim().is_empty() {
        new_id()
    } else {
        request.id
    };

    let device = Device {
        id: id.clone(),
        etag: Some(new_id()),
        is_simulated: request.is_simulated,
        enabled: request.enabled,
        authentication: resolve_authentication(request.authentication)?,
    };

    let mut store = state.store().write();
    if store.devices.contains_key(&id) {
        return Err(ApiError::Conflict(format!("Device already exists: {}", id)));
    }
    store.devices.insert(id.clone(), device.clone());
    drop(store);

    tracing::info!(
        device_id = %id,
        auth = %device.authentication.authentication_type,
        "Device created"
    );
    Ok(Json(device))
}

/// GET /v1/devices
pub async fn list_devices(State(state): State<FakeState>) -> Json<ItemList<Device>> {
    Json(ItemList::new(
        state.store().read().devices.values().cloned().collect(),
    ))
}

/// GET /v1/devices/{id}
pub async fn get_device(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    state
        .store()
        .read()
        .devices
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("device", &id))
}

/// DELETE /v1/devices/{id}
pub async fn delete_device(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, Collection::Devices, &id)
}

/// POST /v1/deployments
pub async fn create_deployment(
    State(state): State<FakeState>,
    Json(request): Json<NewDeployment>,
) -> Result<Json<Deployment>, ApiError> {
    if request.name.is_empty() {
        return Err(ApiError::BadRequest("Deployment name is required".to_string()));
    }
    if request.device_group_id.is_empty() || request.package_id.is_empty() {
        return Err(ApiError::BadRequest(
            "Device group id and package id are required".to_string(),
        ));
    }

    let id = deployment_id(&request.device_group_id, &request.package_id);
    let deployment = Deployment {
        id: id.clone(),
        name: request.name,
        device_group_id: request.device_group_id,
        package_id: request.package_id,
        priority: request.priority,
        deployment_type: request.deployment_type,
        created_date_time_utc: chrono::Utc::now(),
        metrics: Some(DeploymentMetrics::default()),
    };

    let mut store = state.store().write();
    if store.deployments.contains_key(&id) {
        return Err(ApiError::Conflict(format!(
            "Deployment already exists: {}",
            id
        )));
    }
    store.deployments.insert(id.clone(), deployment.clone());
    drop(store);

    tracing::info!(deployment_id = %id, "Deployment created");
    Ok(Json(deployment))
}

/// GET /v1/deployments
pub async fn list_deployments(State(state): State<FakeState>) -> Json<ItemList<Deployment>> {
    Json(ItemList::new(
        state.store().read().deployments.values().cloned().collect(),
    ))
}

/// GET /v1/deployments/{id}
pub async fn get_deployment(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<Json<Deployment>, ApiError> {
    state
        .store()
        .read()
        .deployments
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("deployment", &id))
}

/// DELETE /v1/deployments/{id}
pub async fn delete_deployment(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, Collection::Deployments, &id)
}
