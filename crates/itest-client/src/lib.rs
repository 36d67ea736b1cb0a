//! itest client library
//!
//! The core of the remote-monitoring integration tests: a transport that
//! performs exactly one HTTP exchange per call, resource wrappers bound to
//! one collection each, a bounded poller for eventually consistent
//! preconditions, and a tracker that deletes whatever a test created.
//!
//! # Example
//!
//! ```rust,no_run
//! use itest_client::{HarnessConfig, LifecycleTracker, Services};
//!
//! #[tokio::main]
//! async fn main() -> itest_client::Result<()> {
//!     let services = Services::new(&HarnessConfig::default())?;
//!     let mut tracker = LifecycleTracker::new();
//!
//!     // Wait until the config service has device groups
//!     let groups = services.device_groups.clone();
//!     services
//!         .poll_policy()
//!         .require("device groups", || {
//!             let groups = groups.clone();
//!             async move { matches!(groups.list().await, Ok(r) if r.is_ok()) }
//!         })
//!         .await?;
//!
//!     let response = services.rules.post(serde_json::json!({"Name": "demo"})).await?;
//!     let rule: itest_client::Rule = response.expect_ok_json()?;
//!     tracker.track(&services.rules, rule.id);
//!
//!     let report = tracker.drain().await;
//!     assert!(report.is_clean());
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module serves axum routers on ephemeral ports:
//!
//! ```rust,ignore
//! use itest_client::testing::TestServer;
//!
//! let server = TestServer::start(router).await?;
//! let endpoint = Endpoint::parse(&server.url("/v1"), "/rules")?;
//! ```

mod config;
mod error;
pub mod poll;
mod request;
mod resource;
mod services;
pub mod testing;
mod tracker;
mod transport;
mod types;

pub use config::{
    HarnessConfig, HarnessConfigBuilder, PollingConfig, ServicesConfig, SuiteConfig,
    TimeoutsConfig,
};
pub use error::{HarnessError, ParseError, Result, TransportError, TransportErrorKind};
pub use poll::{poll_until, PollAttempt, PollPolicy, PollReport};
pub use request::{Body, FormPart, Request, Response};
pub use resource::{Endpoint, ResourceClient};
pub use services::Services;
pub use tracker::{CleanupFailure, CleanupReport, LifecycleTracker, TrackedResource};
pub use transport::{Transport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
pub use types::*;

// Re-exported so callers can name status codes and methods without a direct
// reqwest dependency
pub use reqwest::{Method, StatusCode};
