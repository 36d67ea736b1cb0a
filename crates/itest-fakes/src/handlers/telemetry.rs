//! Telemetry handlers: status, rules and messages

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use itest_client::{ItemList, Message, NewRule, Rule, ServiceStatus};

use super::{delete_item, new_id};
use crate::error::ApiError;
use crate::state::{Collection, FakeState};

/// GET /v1/status
pub async fn status(State(state): State<FakeState>, headers: HeaderMap) -> Json<ServiceStatus> {
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            state.record_header(name.as_str(), value);
        }
    }

    Json(ServiceStatus {
        name: "Telemetry".to_string(),
        status: state.options().status.clone(),
        properties: [("Simulation".to_string(), "on".to_string())]
            .into_iter()
            .collect(),
    })
}

fn validate_rule(rule: &NewRule) -> Result<(), ApiError> {
    if rule.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Rule name is required".to_string()));
    }
    if rule.group_id.is_empty() {
        return Err(ApiError::BadRequest("Rule group id is required".to_string()));
    }
    if rule.conditions.is_empty() {
        return Err(ApiError::BadRequest(
            "A rule needs at least one condition".to_string(),
        ));
    }
    Ok(())
}

/// GET /v1/rules
pub async fn list_rules(State(state): State<FakeState>) -> Json<ItemList<Rule>> {
    Json(ItemList::new(
        state.store().read().rules.values().cloned().collect(),
    ))
}

/// POST /v1/rules
pub async fn create_rule(
    State(state): State<FakeState>,
    Json(request): Json<NewRule>,
) -> Result<Json<Rule>, ApiError> {
    validate_rule(&request)?;

    let now = chrono::Utc::now().to_rfc3339();
    let rule = Rule {
        id: new_id(),
        name: request.name,
        description: request.description,
        group_id: request.group_id,
        severity: request.severity,
        enabled: request.enabled,
        calculation: request.calculation,
        time_period: request.time_period,
        conditions: request.conditions,
        e_tag: Some(new_id()),
        date_created: Some(now.clone()),
        date_modified: Some(now),
    };

    tracing::info!(rule_id = %rule.id, "Rule created");
    state
        .store()
        .write()
        .rules
        .insert(rule.id.clone(), rule.clone());

    Ok(Json(rule))
}

/// GET /v1/rules/{id}
pub async fn get_rule(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, ApiError> {
    state
        .store()
        .read()
        .rules
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("rule", &id))
}

/// PUT /v1/rules/{id}
///
/// Updates an existing rule only; an unknown id is a 404.
pub async fn update_rule(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    Json(request): Json<NewRule>,
) -> Result<Json<Rule>, ApiError> {
    validate_rule(&request)?;

    let mut store = state.store().write();
    let existing = store
        .rules
        .get_mut(&id)
        .ok_or_else(|| ApiError::not_found("rule", &id))?;

    if let (Some(sent), Some(current)) = (&request.e_tag, &existing.e_tag) {
        if sent != current {
            return Err(ApiError::Conflict(format!("ETag mismatch for rule {}", id)));
        }
    }

    existing.name = request.name;
    existing.description = request.description;
    existing.group_id = request.group_id;
    existing.severity = request.severity;
    existing.enabled = request.enabled;
    existing.calculation = request.calculation;
    existing.time_period = request.time_period;
    existing.conditions = request.conditions;
    existing.e_tag = Some(new_id());
    existing.date_modified = Some(chrono::Utc::now().to_rfc3339());

    tracing::info!(rule_id = %id, "Rule updated");
    Ok(Json(existing.clone()))
}

/// DELETE /v1/rules/{id}
pub async fn delete_rule(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_item(&state, Collection::Rules, &id)
}

/// GET /v1/messages
pub async fn list_messages(State(state): State<FakeState>) -> Json<ItemList<Message>> {
    let items = if state.messages_available() {
        state.options().messages.clone()
    } else {
        Vec::new()
    };
    Json(ItemList::new(items))
}
