//! Per-test record of created resources, drained at teardown

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::resource::ResourceClient;

/// A resource registered for guaranteed cleanup
#[derive(Debug, Clone)]
pub struct TrackedResource {
    pub client: ResourceClient,
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for TrackedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.client.endpoint(), self.id)
    }
}

/// A delete issued during drain that did not succeed
#[derive(Debug, Clone)]
pub struct CleanupFailure {
    /// `endpoint/id` of the leaked resource
    pub resource: String,
    pub reason: String,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.reason)
    }
}

/// Outcome of draining a tracker
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Resources confirmed deleted (or already absent)
    pub deleted: Vec<String>,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// Number of delete calls issued
    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Accumulates resources a test case created
///
/// Owned by exactly one test case. [`drain`](Self::drain) deletes everything
/// in reverse creation order so dependents go before what they depend on.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    resources: Vec<TrackedResource>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created resource
    pub fn track(&mut self, client: &ResourceClient, id: impl Into<String>) {
        let resource = TrackedResource {
            client: client.clone(),
            id: id.into(),
            created_at: Utc::now(),
        };
        debug!(resource = %resource, "Tracking resource");
        self.resources.push(resource);
    }

    /// Forget a resource the test deleted on its own
    ///
    /// Returns false when nothing matched.
    pub fn untrack(&mut self, client: &ResourceClient, id: &str) -> bool {
        let before = self.resources.len();
        self.resources
            .retain(|r| !(r.id == id && r.client.endpoint() == client.endpoint()));
        before != self.resources.len()
    }

    pub fn tracked(&self) -> &[TrackedResource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Delete every tracked resource
    ///
    /// One DELETE per resource. 2xx and 404 count as deleted; anything else
    /// is recorded as a failure and the remaining deletes still run.
    pub async fn drain(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        while let Some(resource) = self.resources.pop() {
            let label = resource.to_string();
            match resource.client.delete(&resource.id).await {
                Ok(response)
                    if response.is_success() || response.status() == StatusCode::NOT_FOUND =>
                {
                    debug!(resource = %label, status = response.status().as_u16(), "Deleted");
                    report.deleted.push(label);
                }
                Ok(response) => {
                    let reason = format!("DELETE returned HTTP {}", response.status().as_u16());
                    warn!(resource = %label, %reason, "Cleanup failed");
                    report.failures.push(CleanupFailure {
                        resource: label,
                        reason,
                    });
                }
                Err(err) => {
                    warn!(resource = %label, error = %err, "Cleanup failed");
                    report.failures.push(CleanupFailure {
                        resource: label,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if report.attempted() > 0 {
            info!(
                deleted = report.deleted.len(),
                failed = report.failures.len(),
                "Cleanup finished"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Endpoint;
    use crate::transport::Transport;

    fn client(path: &str) -> ResourceClient {
        ResourceClient::new(
            Transport::new().unwrap(),
            Endpoint::parse("http://127.0.0.1:9/v1", path).unwrap(),
        )
    }

    #[test]
    fn test_track_and_untrack() {
        let rules = client("/rules");
        let devices = client("/devices");
        let mut tracker = LifecycleTracker::new();

        tracker.track(&rules, "r1");
        tracker.track(&devices, "r1");
        assert_eq!(tracker.len(), 2);

        assert!(tracker.untrack(&rules, "r1"));
        assert!(!tracker.untrack(&rules, "r1"));
        assert_eq!(tracker.tracked()[0].client.endpoint().path(), "/devices");
    }

    #[tokio::test]
    async fn test_drain_empty_tracker() {
        let mut tracker = LifecycleTracker::new();
        let report = tracker.drain().await;
        assert_eq!(report.attempted(), 0);
        assert!(report.is_clean());
    }
}
