//! Run command - execute the scenario suite

use std::sync::Arc;

use anyhow::{bail, Result};
use itest_client::Services;
use itest_scenarios::Suite;

use crate::output::OutputContext;

/// Run scenarios matching `filters` and fail unless all of them pass
pub async fn run(
    services: Services,
    filters: &[String],
    workers: usize,
    ctx: &OutputContext,
) -> Result<()> {
    let suite = Suite::catalogue().filter(filters).workers(workers);
    if suite.is_empty() {
        bail!("No scenarios match {:?}", filters);
    }

    let report = suite.run(Arc::new(services)).await;
    ctx.print_suite(&report);

    if !report.is_success() {
        bail!(
            "{} of {} scenario(s) did not pass",
            report.reports.len() - report.passed(),
            report.reports.len()
        );
    }
    Ok(())
}
