//! Blueprint entity - the durable record and its transfer view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::BlueprintId;

/// Lifecycle status of a blueprint record
///
/// `Active` moves to `Deleted` exactly once; there is no way back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum Status {
    #[default]
    Active,
    Deleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Status::Active),
            "DELETED" => Ok(Status::Deleted),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Connection protocols a blueprint can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionType {
    /// Interactive command line (SSH/telnet)
    Cli,
    /// gRPC Network Management Interface
    Gnmi,
    Netconf,
    Snmp,
    /// HTTP/RESTCONF style APIs
    Rest,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Cli => "CLI",
            ConnectionType::Gnmi => "GNMI",
            ConnectionType::Netconf => "NETCONF",
            ConnectionType::Snmp => "SNMP",
            ConnectionType::Rest => "REST",
        }
    }

    pub fn all() -> &'static [ConnectionType] {
        &[
            ConnectionType::Cli,
            ConnectionType::Gnmi,
            ConnectionType::Netconf,
            ConnectionType::Snmp,
            ConnectionType::Rest,
        ]
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CLI" => Ok(ConnectionType::Cli),
            "GNMI" => Ok(ConnectionType::Gnmi),
            "NETCONF" => Ok(ConnectionType::Netconf),
            "SNMP" => Ok(ConnectionType::Snmp),
            "REST" => Ok(ConnectionType::Rest),
            _ => Err(format!("Unknown connection type: {}", s)),
        }
    }
}

/// The user-settable view of a blueprint
///
/// Used as input to create/update and as output of reads. Ids, status and
/// timestamps are owned by the lifecycle engine and never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintData {
    pub name: String,

    pub connection_type: ConnectionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_pattern: Option<String>,

    /// JSON document with `{{<TYPE> name}}` placeholders
    pub template: String,
}

impl BlueprintData {
    pub fn new(
        name: impl Into<String>,
        connection_type: ConnectionType,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            connection_type,
            vendor_pattern: None,
            model_pattern: None,
            version_pattern: None,
            template: template.into(),
        }
    }

    pub fn with_vendor_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.vendor_pattern = Some(pattern.into());
        self
    }

    pub fn with_model_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.model_pattern = Some(pattern.into());
        self
    }

    pub fn with_version_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.version_pattern = Some(pattern.into());
        self
    }

    /// Build the insert shape for a fresh ACTIVE record stamped at `now`
    pub fn to_new_record(&self, now: DateTime<Utc>) -> NewBlueprint {
        NewBlueprint {
            name: self.name.clone(),
            connection_type: self.connection_type,
            vendor_pattern: self.vendor_pattern.clone(),
            model_pattern: self.model_pattern.clone(),
            version_pattern: self.version_pattern.clone(),
            template: self.template.clone(),
            status: Status::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A record that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlueprint {
    pub name: String,
    pub connection_type: ConnectionType,
    pub vendor_pattern: Option<String>,
    pub model_pattern: Option<String>,
    pub version_pattern: Option<String>,
    pub template: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewBlueprint {
    /// Attach the id the store assigned
    pub fn with_id(self, id: i64) -> BlueprintRecord {
        BlueprintRecord {
            id,
            name: self.name,
            connection_type: self.connection_type,
            vendor_pattern: self.vendor_pattern,
            model_pattern: self.model_pattern,
            version_pattern: self.version_pattern,
            template: self.template,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// The durable blueprint record as held by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintRecord {
    pub id: i64,
    pub name: String,
    pub connection_type: ConnectionType,
    pub vendor_pattern: Option<String>,
    pub model_pattern: Option<String>,
    pub version_pattern: Option<String>,
    pub template: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlueprintRecord {
    /// External identifier for this record
    pub fn blueprint_id(&self) -> BlueprintId {
        BlueprintId::from_row_id(self.id)
    }

    pub fn is_deleted(&self) -> bool {
        self.status == Status::Deleted
    }

    /// Project the record onto its transfer view
    pub fn to_data(&self) -> BlueprintData {
        BlueprintData {
            name: self.name.clone(),
            connection_type: self.connection_type,
            vendor_pattern: self.vendor_pattern.clone(),
            model_pattern: self.model_pattern.clone(),
            version_pattern: self.version_pattern.clone(),
            template: self.template.clone(),
        }
    }

    /// Overwrite every user-settable field except the name
    pub fn apply(&mut self, data: &BlueprintData) {
        self.connection_type = data.connection_type;
        self.vendor_pattern = data.vendor_pattern.clone();
        self.model_pattern = data.model_pattern.clone();
        self.version_pattern = data.version_pattern.clone();
        self.template = data.template.clone();
    }
}
