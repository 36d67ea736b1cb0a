//! Wire models for the services under test
//!
//! Only the fields the harness reads or writes are modelled. Field names on
//! the wire are PascalCase.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Collection Paths
// =============================================================================

pub mod paths {
    pub const DEVICE_GROUPS: &str = "/devicegroups";
    pub const PACKAGES: &str = "/packages";
    pub const DEVICES: &str = "/devices";
    pub const DEPLOYMENTS: &str = "/deployments";
    pub const STATUS: &str = "/status";
    pub const RULES: &str = "/rules";
    pub const MESSAGES: &str = "/messages";
}

/// Generic `{"Items": [...]}` envelope. Device groups use lowercase `items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(rename = "Items", alias = "items", default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ItemList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

// =============================================================================
// Config Service
// =============================================================================

/// Device group condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupCondition {
    pub key: String,
    pub operator: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceGroup {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub conditions: Vec<GroupCondition>,
}

pub type DeviceGroupList = ItemList<DeviceGroup>;

/// Package type accepted by the config service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageType {
    EdgeManifest,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EdgeManifest => "EdgeManifest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub package_type: PackageType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub date_created: Option<String>,
}

/// Multipart field names for package upload
pub mod package_form {
    pub const TYPE: &str = "type";
    pub const PACKAGE: &str = "package";
    pub const DEFAULT_FILE_NAME: &str = "default package";
}

// =============================================================================
// Device Management
// =============================================================================

/// Device authentication type
///
/// Serialized as the integer the device-management service uses; names are
/// accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationType {
    /// Symmetric keys
    Sas,
    /// Self-signed X.509 thumbprints
    SelfSigned,
    CertificateAuthority,
}

impl AuthenticationType {
    pub fn code(&self) -> u8 {
        match self {
            Self::Sas => 0,
            Self::SelfSigned => 1,
            Self::CertificateAuthority => 2,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Sas),
            1 => Some(Self::SelfSigned),
            2 => Some(Self::CertificateAuthority),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sas" | "symmetric" | "symmetrickey" => Some(Self::Sas),
            "selfsigned" | "x509" => Some(Self::SelfSigned),
            "certificateauthority" | "ca" => Some(Self::CertificateAuthority),
            _ => None,
        }
    }
}

impl fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sas => write!(f, "symmetric"),
            Self::SelfSigned => write!(f, "x509"),
            Self::CertificateAuthority => write!(f, "certificate-authority"),
        }
    }
}

impl Serialize for AuthenticationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for AuthenticationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u64),
            Name(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Self::from_code(code),
            Raw::Name(name) => Self::from_name(&name),
        };
        parsed.ok_or_else(|| serde::de::Error::custom("unknown authentication type"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Authentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_thumbprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_thumbprint: Option<String>,
    pub authentication_type: AuthenticationType,
}

impl Authentication {
    /// Symmetric auth with server-generated keys
    pub fn generated_keys() -> Self {
        Self {
            primary_key: None,
            secondary_key: None,
            primary_thumbprint: None,
            secondary_thumbprint: None,
            authentication_type: AuthenticationType::Sas,
        }
    }

    pub fn symmetric(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary_key: Some(primary.into()),
            secondary_key: Some(secondary.into()),
            ..Self::generated_keys()
        }
    }

    pub fn x509(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary_key: None,
            secondary_key: None,
            primary_thumbprint: Some(primary.into()),
            secondary_thumbprint: Some(secondary.into()),
            authentication_type: AuthenticationType::SelfSigned,
        }
    }
}

/// Device as returned by the device-management service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub etag: Option<String>,
    pub is_simulated: bool,
    pub enabled: bool,
    pub authentication: Authentication,
}

/// Device creation payload. An empty id asks the service to generate one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewDevice {
    pub id: String,
    pub is_simulated: bool,
    pub enabled: bool,
    pub authentication: Authentication,
}

impl NewDevice {
    pub fn new(id: impl Into<String>, authentication: Authentication) -> Self {
        Self {
            id: id.into(),
            is_simulated: false,
            enabled: true,
            authentication,
        }
    }
}

pub type DeviceList = ItemList<Device>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentType {
    EdgeManifest,
}

/// Rollout counters reported for a deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentMetrics {
    #[serde(default)]
    pub applied_count: i64,
    #[serde(default)]
    pub failed_count: i64,
    #[serde(default)]
    pub succeeded_count: i64,
    #[serde(default)]
    pub targeted_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub device_group_id: String,
    pub package_id: String,
    pub priority: i32,
    #[serde(rename = "Type")]
    pub deployment_type: DeploymentType,
    pub created_date_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DeploymentMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewDeployment {
    pub name: String,
    pub device_group_id: String,
    pub package_id: String,
    pub priority: i32,
    #[serde(rename = "Type")]
    pub deployment_type: DeploymentType,
}

impl NewDeployment {
    /// The id the service derives for this deployment
    pub fn expected_id(&self) -> String {
        deployment_id(&self.device_group_id, &self.package_id)
    }
}

/// Deployments are keyed by `{group}--{package}`, lower-cased
pub fn deployment_id(device_group_id: &str, package_id: &str) -> String {
    format!("{}--{}", device_group_id, package_id).to_lowercase()
}

pub type DeploymentList = ItemList<Deployment>;

// =============================================================================
// Telemetry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Calculation {
    Instant,
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub group_id: String,
    pub severity: Severity,
    pub enabled: bool,
    pub calculation: Calculation,
    pub time_period: String,
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
}

/// Rule creation/update payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewRule {
    pub name: String,
    pub description: String,
    pub group_id: String,
    pub severity: Severity,
    pub enabled: bool,
    pub calculation: Calculation,
    pub time_period: String,
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
}

pub type RuleList = ItemList<Rule>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    pub device_id: String,
    #[serde(default)]
    pub message_schema: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

pub type MessageList = ItemList<Message>;

/// Service `/status` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceStatus {
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ServiceStatus {
    /// Status strings start with `OK` when the service is healthy
    pub fn is_healthy(&self) -> bool {
        self.status.starts_with("OK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deployment_id_is_lowercase() {
        assert_eq!(deployment_id("Group-A", "PKG1"), "group-a--pkg1");
    }

    #[test]
    fn test_authentication_type_accepts_code_and_name() {
        let from_code: AuthenticationType = serde_json::from_str("1").unwrap();
        assert_eq!(from_code, AuthenticationType::SelfSigned);
        let from_name: AuthenticationType = serde_json::from_str("\"sas\"").unwrap();
        assert_eq!(from_name, AuthenticationType::Sas);
        assert!(serde_json::from_str::<AuthenticationType>("7").is_err());
        assert_eq!(serde_json::to_string(&AuthenticationType::Sas).unwrap(), "0");
    }

    #[test]
    fn test_rule_wire_format() {
        let json = r#"{
            "Id": "r1",
            "Name": "Pressure",
            "Description": "",
            "GroupId": "g1",
            "Severity": "critical",
            "Enabled": true,
            "Calculation": "Instant",
            "TimePeriod": "0",
            "Conditions": [{"Field": "pressure", "Operator": "GreaterThan", "Value": "150"}]
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(
            rule.conditions[0],
            Condition::new("pressure", Operator::GreaterThan, "150")
        );
        assert_eq!(rule.severity, Severity::Critical);
    }

    #[test]
    fn test_item_list_accepts_lowercase_items() {
        let json = r#"{"items": [{"Id": "g1", "DisplayName": "Chillers"}]}"#;
        let groups: DeviceGroupList = serde_json::from_str(json).unwrap();
        assert_eq!(groups.items[0].id, "g1");
    }

    #[test]
    fn test_new_device_omits_absent_credentials() {
        let device = NewDevice::new("", Authentication::generated_keys());
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["Id"], "");
        assert_eq!(value["Authentication"]["AuthenticationType"], 0);
        assert!(value["Authentication"].get("PrimaryKey").is_none());
    }
}
