//! itest-fakes - in-memory fakes of the remote-monitoring services
//!
//! Three axum routers that mimic the config, device-management and
//! telemetry services closely enough to exercise the harness without live
//! infrastructure. Knobs in [`FakeOptions`] simulate eventual consistency
//! (device groups and messages that appear late) and cleanup faults.
//!
//! # Usage
//!
//! ```ignore
//! use itest_client::Services;
//! use itest_fakes::{FakeOptions, FakeStack};
//!
//! let stack = FakeStack::start(FakeOptions::default()).await?;
//! let services = Services::new(&stack.harness_config())?;
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::{Collection, FakeOptions, FakeState};

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use itest_client::testing::TestServer;
use itest_client::HarnessConfig;
use tower_http::trace::TraceLayer;

/// Config service: device groups and packages
pub fn config_router(state: FakeState) -> Router {
    use handlers::config::*;

    Router::new()
        .route("/v1/devicegroups", get(list_device_groups))
        .route("/v1/devicegroups/{id}", get(get_device_group))
        .route("/v1/packages", get(list_packages).post(create_package))
        .route("/v1/packages/{id}", get(get_package).delete(delete_package))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Device-management service: devices and deployments
pub fn device_management_router(state: FakeState) -> Router {
    use handlers::devices::*;

    Router::new()
        .route("/v1/devices", get(list_devices).post(create_device))
        .route("/v1/devices/{id}", get(get_device).delete(delete_device))
        .route(
            "/v1/deployments",
            get(list_deployments).post(create_deployment),
        )
        .route(
            "/v1/deployments/{id}",
            get(get_deployment).delete(delete_deployment),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Telemetry service: status, rules and messages
pub fn telemetry_router(state: FakeState) -> Router {
    use handlers::telemetry::*;

    Router::new()
        .route("/v1/status", get(status))
        .route("/v1/rules", get(list_rules).post(create_rule))
        .route(
            "/v1/rules/{id}",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/v1/messages", get(list_messages))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Poll interval used by [`FakeStack::harness_config`]
pub const FAKE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The three fake services, each on its own ephemeral port
///
/// Shuts down when dropped.
pub struct FakeStack {
    pub state: FakeState,
    pub config: TestServer,
    pub device_management: TestServer,
    pub telemetry: TestServer,
}

impl FakeStack {
    pub async fn start(options: FakeOptions) -> itest_client::Result<Self> {
        let state = FakeState::new(options);

        let config = TestServer::start(config_router(state.clone())).await?;
        let device_management = TestServer::start(device_management_router(state.clone())).await?;
        let telemetry = TestServer::start(telemetry_router(state.clone())).await?;

        tracing::debug!(
            config = %config.addr,
            device_management = %device_management.addr,
            telemetry = %telemetry.addr,
            "Fake stack started"
        );

        Ok(Self {
            state,
            config,
            device_management,
            telemetry,
        })
    }

    /// Harness configuration pointing at this stack
    ///
    /// Keeps the default attempt budget but polls quickly so tests that
    /// exhaust it stay fast.
    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig::builder()
            .config_url(self.config.url("/v1"))
            .device_management_url(self.device_management.url("/v1"))
            .telemetry_url(self.telemetry.url("/v1"))
            .polling(
                itest_client::PollPolicy::DEPENDENCY.max_attempts,
                FAKE_POLL_INTERVAL,
            )
            .build()
    }

    pub async fn shutdown(self) {
        self.config.shutdown().await;
        self.device_management.shutdown().await;
        self.telemetry.shutdown().await;
    }
}
