//! itest - integration tests for the remote-monitoring services
//!
//! Runs the scenario catalogue against deployed config, device-management
//! and telemetry services.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itest_client::{PollPolicy, Services};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Overrides;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "itest")]
#[command(author, version, about = "Remote-monitoring integration tests")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ITEST_CONFIG")]
    config: Option<PathBuf>,

    /// Config service base URL
    #[arg(long, env = "ITEST_CONFIG_URL")]
    config_url: Option<String>,

    /// Device-management service base URL
    #[arg(long, env = "ITEST_DEVICES_URL")]
    devices_url: Option<String>,

    /// Telemetry service base URL
    #[arg(long, env = "ITEST_TELEMETRY_URL")]
    telemetry_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenarios in the catalogue
    List {
        /// Only scenarios whose name or service contains one of these
        filters: Vec<String>,
    },

    /// Check that all three services answer
    Probe {
        /// Attempts per service before giving up
        #[arg(long, default_value_t = PollPolicy::READINESS.max_attempts)]
        attempts: u32,
    },

    /// Run scenarios
    Run {
        /// Only scenarios whose name or service contains one of these
        filters: Vec<String>,

        /// Scenarios in flight at once
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            config_url: self.config_url.clone(),
            devices_url: self.devices_url.clone(),
            telemetry_url: self.telemetry_url.clone(),
            workers: match &self.command {
                Commands::Run { workers, .. } => *workers,
                _ => None,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);

    if let Commands::List { filters } = &cli.command {
        return commands::list(filters, &ctx);
    }

    let harness = config::merge(config::load(cli.config.as_deref())?, &cli.overrides())?;
    tracing::debug!(
        config = %harness.services.config,
        device_management = %harness.services.device_management,
        telemetry = %harness.services.telemetry,
        "Resolved service addresses"
    );
    let services = Services::new(&harness).context("Failed to create service clients")?;

    match &cli.command {
        Commands::List { .. } => Ok(()),
        Commands::Probe { attempts } => {
            let policy = PollPolicy::new(*attempts, PollPolicy::READINESS.interval);
            commands::probe(&services, policy, &ctx).await
        }
        Commands::Run { filters, .. } => {
            commands::run(services, filters, harness.suite.workers, &ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "itest",
            "--telemetry-url",
            "http://t.test/v1",
            "run",
            "rule_",
            "messages",
            "-w",
            "2",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.telemetry_url.as_deref(), Some("http://t.test/v1"));
        assert_eq!(overrides.workers, Some(2));
        match cli.command {
            Commands::Run { filters, .. } => assert_eq!(filters, vec!["rule_", "messages"]),
            _ => panic!("expected run"),
        }
    }

    #[test]
    #[serial]
    fn test_urls_from_environment() {
        std::env::set_var("ITEST_DEVICES_URL", "http://dm.env/v1");
        let cli = Cli::try_parse_from(["itest", "probe"]);
        std::env::remove_var("ITEST_DEVICES_URL");

        let cli = cli.unwrap();
        assert_eq!(cli.devices_url.as_deref(), Some("http://dm.env/v1"));
        assert_eq!(cli.overrides().workers, None);
        match cli.command {
            Commands::Probe { attempts } => assert_eq!(attempts, 30),
            _ => panic!("expected probe"),
        }
    }

    #[test]
    #[serial]
    fn test_flag_beats_environment() {
        std::env::set_var("ITEST_CONFIG_URL", "http://cfg.env/v1");
        let cli = Cli::try_parse_from(["itest", "--config-url", "http://cfg.flag/v1", "list"]);
        std::env::remove_var("ITEST_CONFIG_URL");

        assert_eq!(
            cli.unwrap().config_url.as_deref(),
            Some("http://cfg.flag/v1")
        );
    }
}
