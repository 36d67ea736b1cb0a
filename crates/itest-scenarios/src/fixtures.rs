//! Shared Setup steps and request payloads

use itest_client::{
    package_form, Calculation, Condition, DeploymentType, DeviceGroupList, FormPart,
    HarnessError, ItemList, NewDeployment, NewRule, Operator, Package, PackageType,
    ResourceClient, Result, Severity,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::scenario::ScenarioContext;

/// Edge manifest uploaded as the package body
pub const EDGE_MANIFEST: &str = include_str!("../fixtures/edge_manifest.json");

/// Multipart form for a package upload
pub fn manifest_form() -> Vec<FormPart> {
    vec![
        FormPart::text(package_form::TYPE, PackageType::EdgeManifest.as_str()),
        FormPart::file(
            package_form::PACKAGE,
            package_form::DEFAULT_FILE_NAME,
            EDGE_MANIFEST.as_bytes().to_vec(),
        ),
    ]
}

/// Upload a package and return its id, lower-cased as deployments expect
pub async fn create_package(ctx: &mut ScenarioContext) -> Result<String> {
    let services = ctx.services();
    let package: Package = ctx
        .create_tracked(&services.packages, manifest_form())
        .await?;
    debug!(package_id = %package.id, "Package created");
    Ok(package.id.to_lowercase())
}

/// True when the collection answers 200 with at least one item
async fn has_items(client: ResourceClient) -> bool {
    match client.list().await {
        Ok(response) if response.is_ok() => response
            .json::<ItemList<serde_json::Value>>()
            .map(|list| !list.items.is_empty())
            .unwrap_or(false),
        _ => false,
    }
}

/// Wait until the config service has device groups, then return the first
/// group's id
pub async fn dependent_device_group(ctx: &mut ScenarioContext) -> Result<String> {
    let services = ctx.services();
    ctx.poll_policy()
        .require("device groups", || has_items(services.device_groups.clone()))
        .await?;

    let groups: DeviceGroupList = services.device_groups.list().await?.expect_ok_json()?;
    let group = groups
        .items
        .into_iter()
        .next()
        .ok_or_else(|| HarnessError::PreconditionNotMet {
            what: "device groups".to_string(),
            attempts: 1,
        })?;

    debug!(device_group_id = %group.id, "Using device group");
    Ok(group.id)
}

/// Wait for the seed step that loads device groups and starts the simulation
pub async fn wait_for_seed_data(ctx: &ScenarioContext) -> Result<()> {
    let services = ctx.services();
    ctx.poll_policy()
        .require("seed data", || has_items(services.device_groups.clone()))
        .await?;
    Ok(())
}

/// Wait until the simulation has produced telemetry messages
pub async fn wait_for_messages(ctx: &ScenarioContext) -> Result<()> {
    let services = ctx.services();
    ctx.poll_policy()
        .require("telemetry messages", || has_items(services.messages.clone()))
        .await?;
    Ok(())
}

pub fn new_deployment(name: &str, device_group_id: &str, package_id: &str) -> NewDeployment {
    NewDeployment {
        name: name.to_string(),
        device_group_id: device_group_id.to_string(),
        package_id: package_id.to_string(),
        priority: 10,
        deployment_type: DeploymentType::EdgeManifest,
    }
}

/// Rule with the calculation variant's standard time period and conditions
pub fn new_rule(name: &str, group_id: &str, calculation: Calculation) -> NewRule {
    let (time_period, conditions) = match calculation {
        Calculation::Instant => (
            "0",
            vec![Condition::new("pressure", Operator::GreaterThan, "150")],
        ),
        Calculation::Average => (
            "60000",
            vec![
                Condition::new("temperature", Operator::GreaterThanOrEqual, "80"),
                Condition::new("humidity", Operator::LessThan, "20"),
            ],
        ),
    };

    NewRule {
        name: name.to_string(),
        description: format!("{} rule created by integration tests", name),
        group_id: group_id.to_string(),
        severity: Severity::Critical,
        enabled: true,
        calculation,
        time_period: time_period.to_string(),
        conditions,
        e_tag: None,
    }
}

/// Random device id
pub fn device_id() -> String {
    format!("itest-{}", uuid::Uuid::new_v4())
}

/// Random symmetric key
pub fn symmetric_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Random X.509 thumbprint: upper-case hex digest of a fresh UUID
pub fn thumbprint() -> String {
    let digest = Sha256::digest(uuid::Uuid::new_v4().to_string().as_bytes());
    hex::encode_upper(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_is_json() {
        let manifest: serde_json::Value = serde_json::from_str(EDGE_MANIFEST).unwrap();
        assert_eq!(manifest["id"], "tempid");
    }

    #[test]
    fn test_package_form_fields() {
        let form = manifest_form();
        let names: Vec<&str> = form.iter().map(FormPart::name).collect();
        assert_eq!(names, vec!["type", "package"]);
    }

    #[test]
    fn test_thumbprint_shape() {
        let a = thumbprint();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(a, thumbprint());
    }

    #[test]
    fn test_rule_variants() {
        let instant = new_rule("r", "g", Calculation::Instant);
        assert_eq!(instant.time_period, "0");
        assert_eq!(instant.conditions.len(), 1);

        let average = new_rule("r", "g", Calculation::Average);
        assert_eq!(average.time_period, "60000");
        assert_eq!(average.conditions.len(), 2);
    }
}
