//! Output formatting for itest (table, json)

use clap::ValueEnum;
use colored::Colorize;
use itest_scenarios::{ScenarioReport, SuiteReport, Verdict};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }

    /// Print a suite report: one row per scenario, then cleanup warnings and
    /// totals on stderr
    pub fn print_suite(&self, report: &SuiteReport) {
        let rows: Vec<ScenarioRow> = report.reports.iter().map(ScenarioRow::from).collect();
        self.print(&rows);

        if self.format == OutputFormat::Json {
            return;
        }

        for scenario in &report.reports {
            for failure in scenario.cleanup_warnings() {
                self.warn(&format!("cleanup {}: {}", scenario.name, failure));
            }
        }

        let summary = format!(
            "{} passed, {} failed, {} setup failed, {} cleanup warning(s) in {:.1}s",
            report.passed(),
            report.failed(),
            report.setup_failed(),
            report.cleanup_warnings(),
            report.elapsed.as_secs_f64()
        );
        if report.is_success() {
            self.success(&summary);
        } else {
            self.error(&summary);
        }
    }
}

fn colored_verdict(verdict: &Verdict) -> String {
    let label = verdict.label();
    match verdict {
        Verdict::Passed => label.green().to_string(),
        Verdict::SetupFailed { .. } => label.yellow().to_string(),
        Verdict::Failed { .. } | Verdict::Panicked { .. } => label.red().to_string(),
    }
}

// =============================================================================
// Display types for each command
// =============================================================================

/// Scenario display for list command
#[derive(Debug, Tabled, Serialize)]
pub struct CatalogueRow {
    #[tabled(rename = "Scenario")]
    pub name: String,
    #[tabled(rename = "Service")]
    pub service: String,
}

/// Service display for probe command
#[derive(Debug, Tabled, Serialize)]
pub struct ProbeRow {
    #[tabled(rename = "Service")]
    pub service: String,
    #[tabled(rename = "URL")]
    pub url: String,
    #[tabled(rename = "Ready")]
    pub ready: String,
    #[tabled(rename = "Attempts")]
    pub attempts: u32,
    #[tabled(rename = "Elapsed (ms)")]
    pub elapsed_ms: u64,
}

/// Scenario result display for run command
#[derive(Debug, Tabled, Serialize)]
pub struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    pub name: String,
    #[tabled(rename = "Service")]
    pub service: String,
    #[tabled(rename = "Verdict")]
    pub verdict: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
    #[tabled(rename = "Cleaned")]
    pub cleaned: usize,
    #[tabled(rename = "Leaked")]
    pub leaked: usize,
    #[tabled(rename = "Elapsed (ms)")]
    pub elapsed_ms: u64,
}

impl From<&ScenarioReport> for ScenarioRow {
    fn from(report: &ScenarioReport) -> Self {
        Self {
            name: report.name.to_string(),
            service: report.service.to_string(),
            verdict: colored_verdict(&report.verdict),
            detail: report.verdict.message().unwrap_or_default().to_string(),
            cleaned: report.cleanup.deleted.len(),
            leaked: report.cleanup.failures.len(),
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itest_client::{CleanupFailure, CleanupReport};
    use itest_scenarios::Service;
    use std::time::Duration;

    #[test]
    fn test_scenario_row_from_report() {
        colored::control::set_override(false);
        let report = ScenarioReport {
            name: "rule_update",
            service: Service::Telemetry,
            verdict: Verdict::Failed {
                kind: "assertion",
                message: "Name: expected \"a\", got \"b\"".to_string(),
            },
            cleanup: CleanupReport {
                deleted: vec!["http://t/v1/rules/1".to_string()],
                failures: vec![CleanupFailure {
                    resource: "http://t/v1/rules/2".to_string(),
                    reason: "status 500".to_string(),
                }],
            },
            elapsed: Duration::from_millis(42),
        };

        let row = ScenarioRow::from(&report);
        assert_eq!(row.service, "telemetry");
        assert_eq!(row.verdict, "failed");
        assert!(row.detail.starts_with("Name:"));
        assert_eq!((row.cleaned, row.leaked), (1, 1));
        assert_eq!(row.elapsed_ms, 42);
    }
}
