//! Integration scenarios for the remote-monitoring services
//!
//! Each scenario runs Setup (wait for preconditions, create dependencies),
//! Act/Assert (the call under test) and Teardown (delete everything the
//! scenario created, in reverse order). Scenarios are independent and the
//! suite runs them concurrently against one shared [`Services`].
//!
//! # Running
//!
//! Against the in-process fakes:
//!
//! ```bash
//! cargo test -p itest-scenarios
//! ```
//!
//! Against deployed services:
//!
//! ```bash
//! itest run --config-url http://localhost:9005/v1 \
//!     --devices-url http://localhost:9002/v1 \
//!     --telemetry-url http://localhost:9004/v1
//! ```
//!
//! [`Services`]: itest_client::Services

pub mod assertions;
pub mod fixtures;
pub mod scenario;
pub mod scenarios;
pub mod suite;

pub use scenario::{
    run_scenario, Fixture, Scenario, ScenarioContext, ScenarioReport, Service, Verdict,
};
pub use suite::{Suite, SuiteReport, DEFAULT_WORKERS};
