//! Device-management: device creation matrix and round trip

use async_trait::async_trait;
use itest_client::{Authentication, AuthenticationType, Body, Device, NewDevice, Result};

use crate::assertions::{ensure_eq, ensure_non_empty};
use crate::fixtures;
use crate::scenario::{Fixture, Scenario, ScenarioContext, Service};

/// Who picks the device id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    Generated,
    Custom,
}

/// Which credentials the request carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Symmetric, keys generated by the service
    GeneratedKeys,
    /// Symmetric, keys supplied by the caller
    CustomKeys,
    /// Self-signed X.509 thumbprints supplied by the caller
    X509,
}

impl Credentials {
    fn authentication(&self) -> Authentication {
        match self {
            Credentials::GeneratedKeys => Authentication::generated_keys(),
            Credentials::CustomKeys => {
                Authentication::symmetric(fixtures::symmetric_key(), fixtures::symmetric_key())
            }
            Credentials::X509 => {
                Authentication::x509(fixtures::thumbprint(), fixtures::thumbprint())
            }
        }
    }
}

/// Create one device and check id, credentials and flags
pub struct CreateDevice {
    name: &'static str,
    id: IdSource,
    credentials: Credentials,
}

impl CreateDevice {
    pub const fn new(name: &'static str, id: IdSource, credentials: Credentials) -> Self {
        Self {
            name,
            id,
            credentials,
        }
    }
}

fn check_credentials(
    credentials: Credentials,
    sent: &Authentication,
    returned: &Authentication,
) -> Result<()> {
    match credentials {
        Credentials::GeneratedKeys => {
            ensure_eq(
                "AuthenticationType",
                AuthenticationType::Sas,
                returned.authentication_type,
            )?;
            ensure_non_empty("PrimaryKey", returned.primary_key.as_deref())?;
            ensure_non_empty("SecondaryKey", returned.secondary_key.as_deref())
        }
        Credentials::CustomKeys => {
            ensure_eq(
                "AuthenticationType",
                AuthenticationType::Sas,
                returned.authentication_type,
            )?;
            ensure_eq("PrimaryKey", &sent.primary_key, &returned.primary_key)?;
            ensure_eq("SecondaryKey", &sent.secondary_key, &returned.secondary_key)
        }
        Credentials::X509 => {
            ensure_eq(
                "AuthenticationType",
                AuthenticationType::SelfSigned,
                returned.authentication_type,
            )?;
            ensure_eq(
                "PrimaryThumbprint",
                &sent.primary_thumbprint,
                &returned.primary_thumbprint,
            )?;
            ensure_eq(
                "SecondaryThumbprint",
                &sent.secondary_thumbprint,
                &returned.secondary_thumbprint,
            )
        }
    }
}

#[async_trait]
impl Scenario for CreateDevice {
    fn name(&self) -> &'static str {
        self.name
    }

    fn service(&self) -> Service {
        Service::DeviceManagement
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, _fixture: &Fixture) -> Result<()> {
        let requested_id = match self.id {
            IdSource::Generated => String::new(),
            IdSource::Custom => fixtures::device_id(),
        };
        let request = NewDevice::new(requested_id.clone(), self.credentials.authentication());

        let services = ctx.services();
        let device: Device = ctx
            .create_tracked(&services.devices, Body::json(&request)?)
            .await?;

        match self.id {
            IdSource::Generated => ensure_non_empty("Id", Some(device.id.as_str()))?,
            IdSource::Custom => ensure_eq("Id", &requested_id, &device.id)?,
        }
        ensure_eq("IsSimulated", false, device.is_simulated)?;
        ensure_eq("Enabled", true, device.enabled)?;
        check_credentials(
            self.credentials,
            &request.authentication,
            &device.authentication,
        )
    }
}

/// Create a device, read it back by id and compare
pub struct DeviceRoundTrip;

#[async_trait]
impl Scenario for DeviceRoundTrip {
    fn name(&self) -> &'static str {
        "device_round_trip"
    }

    fn service(&self) -> Service {
        Service::DeviceManagement
    }

    async fn exercise(&self, ctx: &mut ScenarioContext, _fixture: &Fixture) -> Result<()> {
        let request = NewDevice::new(
            fixtures::device_id(),
            Credentials::CustomKeys.authentication(),
        );

        let services = ctx.services();
        let created: Device = ctx
            .create_tracked(&services.devices, Body::json(&request)?)
            .await?;

        let fetched: Device = services
            .devices
            .get(&created.id, None)
            .await?
            .expect_ok_json()?;

        ensure_eq("Id", &request.id, &fetched.id)?;
        ensure_eq("IsSimulated", request.is_simulated, fetched.is_simulated)?;
        ensure_eq("Enabled", request.enabled, fetched.enabled)?;
        ensure_eq(
            "Authentication",
            &request.authentication,
            &fetched.authentication,
        )
    }
}
