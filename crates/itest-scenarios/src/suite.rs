//! Suite runner: filter the catalogue and run scenarios with bounded
//! concurrency

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use itest_client::Services;
use tracing::info;

use crate::scenario::{run_scenario, Scenario, ScenarioReport, Verdict};
use crate::scenarios;

/// Default number of scenarios in flight
pub const DEFAULT_WORKERS: usize = 4;

pub struct Suite {
    scenarios: Vec<Arc<dyn Scenario>>,
    workers: usize,
}

impl Suite {
    pub fn new(scenarios: Vec<Arc<dyn Scenario>>) -> Self {
        Self {
            scenarios,
            workers: DEFAULT_WORKERS,
        }
    }

    /// The full catalogue
    pub fn catalogue() -> Self {
        Self::new(scenarios::catalogue())
    }

    /// Keep scenarios whose name or service contains any of `patterns`.
    /// An empty pattern list keeps everything.
    pub fn filter<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        if !patterns.is_empty() {
            self.scenarios.retain(|scenario| {
                patterns.iter().any(|p| {
                    let p = p.as_ref();
                    scenario.name().contains(p) || scenario.service().as_str().contains(p)
                })
            });
        }
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn scenarios(&self) -> &[Arc<dyn Scenario>] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Run every scenario. Scenarios share nothing but `services`, so they
    /// may run in any order; reports come back in catalogue order.
    pub async fn run(&self, services: Arc<Services>) -> SuiteReport {
        let started = Instant::now();
        info!(
            scenarios = self.scenarios.len(),
            workers = self.workers,
            "Starting suite"
        );

        let mut indexed: Vec<(usize, ScenarioReport)> =
            stream::iter(self.scenarios.iter().enumerate())
                .map(|(index, scenario)| {
                    let services = services.clone();
                    async move { (index, run_scenario(scenario.as_ref(), services).await) }
                })
                .buffer_unordered(self.workers)
                .collect()
                .await;
        indexed.sort_by_key(|(index, _)| *index);

        let report = SuiteReport {
            reports: indexed.into_iter().map(|(_, report)| report).collect(),
            elapsed: started.elapsed(),
        };
        info!(
            passed = report.passed(),
            failed = report.failed(),
            setup_failed = report.setup_failed(),
            cleanup_warnings = report.cleanup_warnings(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Suite finished"
        );
        report
    }
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub reports: Vec<ScenarioReport>,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    /// Failed in Act/Assert or panicked
    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.verdict, Verdict::Failed { .. } | Verdict::Panicked { .. }))
            .count()
    }

    pub fn setup_failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.verdict, Verdict::SetupFailed { .. }))
            .count()
    }

    pub fn cleanup_warnings(&self) -> usize {
        self.reports.iter().map(|r| r.cleanup.failures.len()).sum()
    }

    /// True when every scenario passed; cleanup warnings do not count
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(ScenarioReport::passed)
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioReport> {
        self.reports.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(suite: &Suite) -> Vec<&'static str> {
        suite.scenarios().iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_filter_by_name() {
        let suite = Suite::catalogue().filter(&["rule_"]);
        assert_eq!(
            names(&suite),
            vec![
                "rule_instant",
                "rule_average",
                "rule_round_trip",
                "rule_update",
                "rule_list",
                "rule_delete",
            ]
        );
    }

    #[test]
    fn test_filter_by_service() {
        let suite = Suite::catalogue().filter(&["device-management"]);
        assert_eq!(suite.len(), 11);

        let suite = Suite::catalogue().filter(&["telemetry"]);
        assert_eq!(suite.len(), 8);
    }

    #[test]
    fn test_empty_filter_keeps_all() {
        let patterns: [&str; 0] = [];
        assert_eq!(Suite::catalogue().filter(&patterns).len(), 19);
    }

    #[test]
    fn test_workers_at_least_one() {
        let suite = Suite::catalogue().workers(0);
        assert_eq!(suite.workers, 1);
    }
}
