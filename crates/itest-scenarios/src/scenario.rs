//! Scenario state machine: Setup, then Act/Assert, then Teardown
//!
//! Teardown always runs. A failing Setup skips Act entirely and is reported
//! apart from assertion failures; cleanup problems are attached to the report
//! as warnings and never change the verdict.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use itest_client::{
    Body, CleanupFailure, CleanupReport, HarnessError, LifecycleTracker, PollPolicy,
    ResourceClient, Result, Services, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn, Instrument};

/// Service a scenario exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Config,
    DeviceManagement,
    Telemetry,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Config => "config",
            Service::DeviceManagement => "device-management",
            Service::Telemetry => "telemetry",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values Setup hands to Act
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub device_group_id: Option<String>,
    pub package_ids: Vec<String>,
}

impl Fixture {
    pub fn device_group_id(&self) -> Result<&str> {
        self.device_group_id
            .as_deref()
            .ok_or_else(|| HarnessError::assertion("setup provided no device group"))
    }

    /// The first package created during setup
    pub fn package_id(&self) -> Result<&str> {
        self.package_ids
            .first()
            .map(String::as_str)
            .ok_or_else(|| HarnessError::assertion("setup provided no package"))
    }
}

/// One test case against the live (or fake) services
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    fn service(&self) -> Service;

    /// Wait for preconditions and create upstream dependencies
    async fn setup(&self, _ctx: &mut ScenarioContext) -> Result<Fixture> {
        Ok(Fixture::default())
    }

    /// Perform the call under test and check what came back
    async fn exercise(&self, ctx: &mut ScenarioContext, fixture: &Fixture) -> Result<()>;
}

/// Per-scenario state: the shared service wrappers plus this scenario's tracker
pub struct ScenarioContext {
    name: &'static str,
    services: Arc<Services>,
    tracker: LifecycleTracker,
}

impl ScenarioContext {
    pub fn new(name: &'static str, services: Arc<Services>) -> Self {
        Self {
            name,
            services,
            tracker: LifecycleTracker::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Shared handle to the service wrappers
    pub fn services(&self) -> Arc<Services> {
        self.services.clone()
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.services.poll_policy()
    }

    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    pub fn track(&mut self, client: &ResourceClient, id: impl Into<String>) {
        self.tracker.track(client, id);
    }

    /// Forget a resource the scenario deleted itself
    pub fn untrack(&mut self, client: &ResourceClient, id: &str) -> bool {
        self.tracker.untrack(client, id)
    }

    /// POST, track the returned `Id`, require 200, then parse the body
    ///
    /// Any 2xx answer is tracked before its status is checked or its body is
    /// parsed into `T`, so a resource created with an unexpected status or
    /// shape still gets cleaned up.
    pub async fn create_tracked<T: DeserializeOwned>(
        &mut self,
        client: &ResourceClient,
        body: impl Into<Body>,
    ) -> Result<T> {
        let response = client.post(body).await?;

        if response.is_success() {
            let id = response
                .json::<serde_json::Value>()
                .ok()
                .and_then(|value| value.get("Id")?.as_str().map(str::to_string));
            match id {
                Some(id) if !id.is_empty() => self.tracker.track(client, id),
                _ => warn!(endpoint = %client.endpoint(), "Created resource has no Id; not tracked"),
            }
        }

        response.expect_status(StatusCode::OK)?;
        Ok(response.json()?)
    }

    /// Name unique to this run, for resources other runs might also create
    pub fn unique_name(&self, prefix: &str) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", prefix, &suffix[..8])
    }
}

/// Outcome of a scenario, independent of cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// Setup failed; Act was not attempted. `kind` is `precondition` when
    /// the poller ran out of attempts, `panic` when Setup panicked and
    /// `setup` otherwise.
    SetupFailed { kind: &'static str, message: String },
    /// Act or Assert failed
    Failed { kind: &'static str, message: String },
    /// Act or Assert panicked
    Panicked { message: String },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "passed",
            Verdict::SetupFailed { .. } => "setup-failed",
            Verdict::Failed { .. } => "failed",
            Verdict::Panicked { .. } => "panicked",
        }
    }

    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Verdict::SetupFailed { kind, .. } | Verdict::Failed { kind, .. } => Some(*kind),
            Verdict::Panicked { .. } => Some("panic"),
            Verdict::Passed => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Verdict::Passed => None,
            Verdict::SetupFailed { message, .. }
            | Verdict::Failed { message, .. }
            | Verdict::Panicked { message } => Some(message.as_str()),
        }
    }

    fn setup_failed(err: &HarnessError) -> Self {
        Verdict::SetupFailed {
            kind: if err.is_precondition() {
                "precondition"
            } else {
                "setup"
            },
            message: err.to_string(),
        }
    }

    fn failed(err: &HarnessError) -> Self {
        Verdict::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    fn panicked(payload: Box<dyn Any + Send>) -> Self {
        Verdict::Panicked {
            message: panic_message(payload),
        }
    }

    fn setup_panicked(payload: Box<dyn Any + Send>) -> Self {
        Verdict::SetupFailed {
            kind: "panic",
            message: panic_message(payload),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.label(), message),
            None => f.write_str(self.label()),
        }
    }
}

/// Report for one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub service: Service,
    pub verdict: Verdict,
    pub cleanup: CleanupReport,
    pub elapsed: Duration,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.verdict.is_pass()
    }

    pub fn cleanup_warnings(&self) -> &[CleanupFailure] {
        &self.cleanup.failures
    }
}

/// Run one scenario through Setup, Act/Assert and Teardown
pub async fn run_scenario(scenario: &dyn Scenario, services: Arc<Services>) -> ScenarioReport {
    let span = tracing::info_span!("scenario", name = scenario.name());

    async move {
        let started = Instant::now();
        let mut ctx = ScenarioContext::new(scenario.name(), services);

        let setup = AssertUnwindSafe(scenario.setup(&mut ctx))
            .catch_unwind()
            .await;
        let verdict = match setup {
            Ok(Ok(fixture)) => {
                let exercise = AssertUnwindSafe(scenario.exercise(&mut ctx, &fixture))
                    .catch_unwind()
                    .await;
                match exercise {
                    Ok(Ok(())) => Verdict::Passed,
                    Ok(Err(e)) => Verdict::failed(&e),
                    Err(payload) => Verdict::panicked(payload),
                }
            }
            Ok(Err(e)) => Verdict::setup_failed(&e),
            Err(payload) => Verdict::setup_panicked(payload),
        };

        let cleanup = ctx.tracker.drain().await;
        for failure in &cleanup.failures {
            warn!(resource = %failure.resource, reason = %failure.reason, "Cleanup warning");
        }

        let elapsed = started.elapsed();
        info!(
            verdict = verdict.label(),
            deleted = cleanup.deleted.len(),
            cleanup_failures = cleanup.failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Scenario finished"
        );

        ScenarioReport {
            name: scenario.name(),
            service: scenario.service(),
            verdict,
            cleanup,
            elapsed,
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failure_kind() {
        let precondition = HarnessError::PreconditionNotMet {
            what: "device groups".into(),
            attempts: 5,
        };
        assert_eq!(
            Verdict::setup_failed(&precondition).kind(),
            Some("precondition")
        );
        assert_eq!(
            Verdict::setup_failed(&HarnessError::assertion("x")).kind(),
            Some("setup")
        );
    }

    #[test]
    fn test_panic_message_extraction() {
        let verdict = Verdict::panicked(Box::new("boom"));
        assert_eq!(verdict.message(), Some("boom"));

        let verdict = Verdict::panicked(Box::new(String::from("bang")));
        assert_eq!(verdict.to_string(), "panicked: bang");
    }

    #[test]
    fn test_setup_panic_is_setup_failure() {
        let verdict = Verdict::setup_panicked(Box::new("no fixture"));
        assert_eq!(verdict.label(), "setup-failed");
        assert_eq!(verdict.kind(), Some("panic"));
        assert_eq!(verdict.message(), Some("no fixture"));
    }

    #[test]
    fn test_fixture_accessors() {
        let fixture = Fixture::default();
        assert!(fixture.device_group_id().is_err());
        assert!(fixture.package_id().is_err());

        let fixture = Fixture {
            device_group_id: Some("g".into()),
            package_ids: vec!["p1".into(), "p2".into()],
        };
        assert_eq!(fixture.package_id().unwrap(), "p1");
    }
}
