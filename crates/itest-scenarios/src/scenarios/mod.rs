//! The scenario catalogue, grouped by service

pub mod deployments;
pub mod devices;
pub mod telemetry;

use std::sync::Arc;

use itest_client::Calculation;

use crate::scenario::Scenario;
use deployments::{CreateDeployment, DeleteDeployment, ListDeployments, RetrieveDeployment};
use devices::{CreateDevice, Credentials, DeviceRoundTrip, IdSource};
use telemetry::{
    CreateRule, DeleteRule, ListMessages, ListRules, RuleRoundTrip, TelemetryStatus, UpdateRule,
};

/// Every scenario, in reporting order
pub fn catalogue() -> Vec<Arc<dyn Scenario>> {
    vec![
        Arc::new(CreateDevice::new(
            "device_auto_id_auto_auth",
            IdSource::Generated,
            Credentials::GeneratedKeys,
        )),
        Arc::new(CreateDevice::new(
            "device_custom_id_auto_auth",
            IdSource::Custom,
            Credentials::GeneratedKeys,
        )),
        Arc::new(CreateDevice::new(
            "device_custom_id_custom_auth",
            IdSource::Custom,
            Credentials::CustomKeys,
        )),
        Arc::new(CreateDevice::new(
            "device_auto_id_custom_auth",
            IdSource::Generated,
            Credentials::CustomKeys,
        )),
        Arc::new(CreateDevice::new(
            "device_custom_id_x509_auth",
            IdSource::Custom,
            Credentials::X509,
        )),
        Arc::new(CreateDevice::new(
            "device_auto_id_x509_auth",
            IdSource::Generated,
            Credentials::X509,
        )),
        Arc::new(DeviceRoundTrip),
        Arc::new(CreateDeployment),
        Arc::new(RetrieveDeployment),
        Arc::new(ListDeployments),
        Arc::new(DeleteDeployment),
        Arc::new(TelemetryStatus),
        Arc::new(CreateRule::new("rule_instant", Calculation::Instant)),
        Arc::new(CreateRule::new("rule_average", Calculation::Average)),
        Arc::new(RuleRoundTrip),
        Arc::new(UpdateRule),
        Arc::new(ListRules),
        Arc::new(DeleteRule),
        Arc::new(ListMessages),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_names_are_unique() {
        let scenarios = catalogue();
        let names: HashSet<&str> = scenarios.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), scenarios.len());
        assert_eq!(scenarios.len(), 19);
    }
}
