//! Probe command - wait for each service to answer

use anyhow::{bail, Result};
use itest_client::{PollPolicy, ResourceClient, Services};

use crate::output::{OutputContext, ProbeRow};

async fn answers(client: ResourceClient) -> bool {
    match client.list().await {
        Ok(response) => response.is_success(),
        Err(e) => {
            tracing::debug!(endpoint = %client.endpoint(), error = %e, "Probe failed");
            false
        }
    }
}

async fn probe_one(service: &str, client: &ResourceClient, policy: PollPolicy) -> ProbeRow {
    let report = policy.run(|| answers(client.clone())).await;

    ProbeRow {
        service: service.to_string(),
        url: client.endpoint().url().to_string(),
        ready: if report.satisfied { "yes" } else { "no" }.to_string(),
        attempts: report.attempt_count(),
        elapsed_ms: report.elapsed.as_millis() as u64,
    }
}

/// Poll config, device management and telemetry concurrently
pub async fn probe(services: &Services, policy: PollPolicy, ctx: &OutputContext) -> Result<()> {
    let (config, devices, telemetry) = futures::join!(
        probe_one("config", &services.device_groups, policy),
        probe_one("device-management", &services.devices, policy),
        probe_one("telemetry", &services.status, policy),
    );
    let rows = [config, devices, telemetry];
    ctx.print(&rows);

    let down: Vec<&str> = rows
        .iter()
        .filter(|r| r.ready != "yes")
        .map(|r| r.service.as_str())
        .collect();
    if !down.is_empty() {
        bail!("Services not ready: {}", down.join(", "));
    }

    ctx.success("All services ready");
    Ok(())
}
