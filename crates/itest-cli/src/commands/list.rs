//! List command - show the scenario catalogue

use anyhow::Result;
use itest_scenarios::Suite;

use crate::output::{CatalogueRow, OutputContext};

/// List scenarios matching `filters`
pub fn list(filters: &[String], ctx: &OutputContext) -> Result<()> {
    let suite = Suite::catalogue().filter(filters);

    let rows: Vec<CatalogueRow> = suite
        .scenarios()
        .iter()
        .map(|s| CatalogueRow {
            name: s.name().to_string(),
            service: s.service().to_string(),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}
