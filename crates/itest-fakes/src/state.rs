//! Application state for the fake services

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use itest_client::{Deployment, Device, DeviceGroup, GroupCondition, Message, Package, Rule};
use parking_lot::{Mutex, RwLock};

/// Collections that accept DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Packages,
    Devices,
    Deployments,
    Rules,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Packages => "packages",
            Collection::Devices => "devices",
            Collection::Deployments => "deployments",
            Collection::Rules => "rules",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour knobs for a fake stack
///
/// The defaults give a warmed-up deployment: one device group, a few
/// simulated messages and no injected faults.
#[derive(Debug, Clone)]
pub struct FakeOptions {
    /// Groups served by `GET /devicegroups`
    pub device_groups: Vec<DeviceGroup>,
    /// `GET /devicegroups` answers 503 for this many requests first
    pub device_groups_unavailable_for: u32,
    /// Messages served by `GET /messages`
    pub messages: Vec<Message>,
    /// `GET /messages` answers an empty list for this many requests first
    pub messages_delayed_for: u32,
    /// Collections whose DELETE answers 500
    pub failing_deletes: HashSet<Collection>,
    /// Status string reported by `GET /status`
    pub status: String,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            device_groups: vec![default_device_group()],
            device_groups_unavailable_for: 0,
            messages: default_messages(),
            messages_delayed_for: 0,
            failing_deletes: HashSet::new(),
            status: "OK:Alive and well".to_string(),
        }
    }
}

impl FakeOptions {
    /// No device groups and no messages, as on a fresh deployment
    pub fn unseeded() -> Self {
        Self {
            device_groups: Vec::new(),
            messages: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_device_groups_unavailable_for(mut self, requests: u32) -> Self {
        self.device_groups_unavailable_for = requests;
        self
    }

    pub fn with_messages_delayed_for(mut self, requests: u32) -> Self {
        self.messages_delayed_for = requests;
        self
    }

    pub fn with_failing_deletes(mut self, collection: Collection) -> Self {
        self.failing_deletes.insert(collection);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

fn default_device_group() -> DeviceGroup {
    DeviceGroup {
        id: "default_chillers".to_string(),
        display_name: "Chillers".to_string(),
        conditions: vec![GroupCondition {
            key: "Tags.DeviceType".to_string(),
            operator: "EQ".to_string(),
            value: serde_json::Value::String("Chiller".to_string()),
        }],
    }
}

fn default_messages() -> Vec<Message> {
    (1..=3)
        .map(|n| Message {
            device_id: format!("chiller-{:02}.0", n),
            message_schema: "chiller-sensors;v1".to_string(),
            time: Some(chrono::Utc::now().to_rfc3339()),
            data: serde_json::json!({
                "temperature": 70 + n,
                "humidity": 40 + n,
                "pressure": 150 + n,
            }),
        })
        .collect()
}

/// Stored resources
#[derive(Debug, Default)]
pub struct Store {
    pub packages: BTreeMap<String, Package>,
    pub devices: BTreeMap<String, Device>,
    pub deployments: BTreeMap<String, Deployment>,
    pub rules: BTreeMap<String, Rule>,
}

impl Store {
    fn len(&self, collection: Collection) -> usize {
        match collection {
            Collection::Packages => self.packages.len(),
            Collection::Devices => self.devices.len(),
            Collection::Deployments => self.deployments.len(),
            Collection::Rules => self.rules.len(),
        }
    }

    fn contains(&self, collection: Collection, id: &str) -> bool {
        match collection {
            Collection::Packages => self.packages.contains_key(id),
            Collection::Devices => self.devices.contains_key(id),
            Collection::Deployments => self.deployments.contains_key(id),
            Collection::Rules => self.rules.contains_key(id),
        }
    }

    /// Remove an item; true when it existed
    pub fn remove(&mut self, collection: Collection, id: &str) -> bool {
        match collection {
            Collection::Packages => self.packages.remove(id).is_some(),
            Collection::Devices => self.devices.remove(id).is_some(),
            Collection::Deployments => self.deployments.remove(id).is_some(),
            Collection::Rules => self.rules.remove(id).is_some(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    device_group_requests: u32,
    message_requests: u32,
    deletes: HashMap<Collection, u32>,
    headers_seen: Vec<(String, String)>,
}

/// State shared across the three fake routers
#[derive(Clone)]
pub struct FakeState {
    options: Arc<FakeOptions>,
    store: Arc<RwLock<Store>>,
    counters: Arc<Mutex<Counters>>,
}

impl FakeState {
    pub fn new(options: FakeOptions) -> Self {
        Self {
            options: Arc::new(options),
            store: Arc::new(RwLock::new(Store::default())),
            counters: Arc::new(Mutex::new(Counters::default())),
        }
    }

    pub fn options(&self) -> &FakeOptions {
        &self.options
    }

    pub fn store(&self) -> &RwLock<Store> {
        &self.store
    }

    /// Count a device-group list request; false while the groups are hidden
    pub fn device_groups_available(&self) -> bool {
        let mut counters = self.counters.lock();
        counters.device_group_requests += 1;
        counters.device_group_requests > self.options.device_groups_unavailable_for
    }

    /// Count a message list request; false while messages are held back
    pub fn messages_available(&self) -> bool {
        let mut counters = self.counters.lock();
        counters.message_requests += 1;
        counters.message_requests > self.options.messages_delayed_for
    }

    pub fn record_delete(&self, collection: Collection) {
        *self.counters.lock().deletes.entry(collection).or_default() += 1;
    }

    pub fn record_header(&self, name: &str, value: &str) {
        self.counters
            .lock()
            .headers_seen
            .push((name.to_string(), value.to_string()));
    }

    /// Number of DELETE requests received for a collection
    pub fn delete_calls(&self, collection: Collection) -> u32 {
        self.counters
            .lock()
            .deletes
            .get(&collection)
            .copied()
            .unwrap_or(0)
    }

    pub fn device_group_requests(&self) -> u32 {
        self.counters.lock().device_group_requests
    }

    pub fn message_requests(&self) -> u32 {
        self.counters.lock().message_requests
    }

    /// Whether a `GET /status` arrived carrying this header
    pub fn saw_status_header(&self, name: &str, value: &str) -> bool {
        self.counters
            .lock()
            .headers_seen
            .iter()
            .any(|(n, v)| n.eq_ignore_ascii_case(name) && v == value)
    }

    /// Number of live items in a collection
    pub fn live_count(&self, collection: Collection) -> usize {
        self.store.read().len(collection)
    }

    pub fn contains(&self, collection: Collection, id: &str) -> bool {
        self.store.read().contains(collection, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_groups_hidden_for_first_requests() {
        let state = FakeState::new(FakeOptions::default().with_device_groups_unavailable_for(2));
        assert!(!state.device_groups_available());
        assert!(!state.device_groups_available());
        assert!(state.device_groups_available());
        assert_eq!(state.device_group_requests(), 3);
    }

    #[test]
    fn test_delete_counters() {
        let state = FakeState::new(FakeOptions::default());
        state.record_delete(Collection::Rules);
        state.record_delete(Collection::Rules);
        assert_eq!(state.delete_calls(Collection::Rules), 2);
        assert_eq!(state.delete_calls(Collection::Devices), 0);
    }

    #[test]
    fn test_unseeded_has_no_groups_or_messages() {
        let options = FakeOptions::unseeded();
        assert!(options.device_groups.is_empty());
        assert!(options.messages.is_empty());
    }
}
