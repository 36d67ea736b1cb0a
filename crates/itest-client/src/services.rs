//! Resource wrappers for every collection the harness touches

use url::Url;

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::poll::PollPolicy;
use crate::resource::{Endpoint, ResourceClient};
use crate::transport::Transport;
use crate::types::paths;

/// Wrappers for all three services, sharing one transport
///
/// Constructed once per run and passed to every scenario.
#[derive(Debug, Clone)]
pub struct Services {
    pub device_groups: ResourceClient,
    pub packages: ResourceClient,
    pub devices: ResourceClient,
    pub deployments: ResourceClient,
    pub status: ResourceClient,
    pub rules: ResourceClient,
    pub messages: ResourceClient,
    poll: PollPolicy,
}

impl Services {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        config.validate()?;
        let transport = Transport::with_config(
            config.request_timeout(),
            config.connect_timeout(),
            config.headers.clone(),
        )?;

        let config_base = Url::parse(&config.services.config)?;
        let devices_base = Url::parse(&config.services.device_management)?;
        let telemetry_base = Url::parse(&config.services.telemetry)?;

        let bind = |base: &Url, path: &str| -> Result<ResourceClient> {
            Ok(ResourceClient::new(
                transport.clone(),
                Endpoint::new(base, path)?,
            ))
        };

        Ok(Self {
            device_groups: bind(&config_base, paths::DEVICE_GROUPS)?,
            packages: bind(&config_base, paths::PACKAGES)?,
            devices: bind(&devices_base, paths::DEVICES)?,
            deployments: bind(&devices_base, paths::DEPLOYMENTS)?,
            status: bind(&telemetry_base, paths::STATUS)?,
            rules: bind(&telemetry_base, paths::RULES)?,
            messages: bind(&telemetry_base, paths::MESSAGES)?,
            poll: config.poll_policy(),
        })
    }

    /// Polling policy for cross-service dependencies
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_bind_paths() {
        let config = HarnessConfig::builder()
            .telemetry_url("http://localhost:9004/v1")
            .build();
        let services = Services::new(&config).unwrap();

        assert_eq!(
            services.rules.endpoint().url().as_str(),
            "http://localhost:9004/v1/rules"
        );
        assert_eq!(
            services.deployments.endpoint().url().as_str(),
            "http://127.0.0.1:9002/v1/deployments"
        );
        assert_eq!(
            services.device_groups.endpoint().url().as_str(),
            "http://127.0.0.1:9005/v1/devicegroups"
        );
    }

    #[test]
    fn test_default_config_matches_bare_transport() {
        let services = Services::new(&HarnessConfig::default()).unwrap();
        let bare = Transport::new().unwrap();
        assert_eq!(services.rules.transport().timeout(), bare.timeout());
    }

    #[test]
    fn test_invalid_service_url() {
        let config = HarnessConfig::builder().config_url("::nope::").build();
        assert!(Services::new(&config).is_err());
    }
}
