use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::{Error, Result};

/// Known compute provider backends.
///
/// Only [`ProviderKind::Ecloud`] ships with a built-in adapter; the other
/// tags exist so factory lookups and error messages can name them before
/// their adapters land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ecloud,
    Aliyun,
    Tencent,
    Aws,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecloud => "ecloud",
            Self::Aliyun => "aliyun",
            Self::Tencent => "tencent",
            Self::Aws => "aws",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ecloud" => Ok(Self::Ecloud),
            "aliyun" => Ok(Self::Aliyun),
            "tencent" => Ok(Self::Tencent),
            "aws" => Ok(Self::Aws),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// API credentials for a provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
}

/// Configuration handed to [`crate::ResourceProvider::initialize`].
///
/// Treated as immutable once passed in; providers copy what they need and
/// never write back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub credentials: Credentials,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Provider-specific settings (zone ids, network ids, ...).
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, credentials: Credentials) -> Self {
        Self {
            kind,
            credentials,
            region: None,
            endpoint: None,
            options: HashMap::new(),
        }
    }

    /// Get an option value as a specific type.
    pub fn option<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Build a config from env vars: `{KIND}_ACCESS_KEY_ID` and
    /// `{KIND}_ACCESS_KEY_SECRET` (required), `{KIND}_REGION` and
    /// `{KIND}_ENDPOINT` (optional), e.g. `ECLOUD_ACCESS_KEY_ID`.
    pub fn from_env(kind: ProviderKind) -> Result<Self> {
        dotenvy::dotenv().ok();

        let prefix = kind.as_str().to_uppercase();
        let var = |suffix: &str| -> Result<String> {
            let name = format!("{prefix}_{suffix}");
            std::env::var(&name).map_err(|_| Error::MissingEnv(name))
        };

        Ok(Self {
            kind,
            credentials: Credentials {
                access_key_id: var("ACCESS_KEY_ID")?,
                access_key_secret: var("ACCESS_KEY_SECRET")?,
            },
            region: std::env::var(format!("{prefix}_REGION")).ok(),
            endpoint: std::env::var(format!("{prefix}_ENDPOINT")).ok(),
            options: HashMap::new(),
        })
    }
}

/// Vendor-agnostic resource request from the calling layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU cores.
    pub cpu: u32,
    /// Memory in GB.
    pub memory: u32,
    /// Disk in GB.
    pub disk: u32,
    #[serde(default)]
    pub region: Option<String>,
    /// Generic OS image name (e.g. `ubuntu-22.04`).
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub network: Option<NetworkConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
}

/// Unified resource status every provider maps into.
///
/// `Deleted` and `Error` are terminal: a deleted resource permits no
/// further operations, and an errored one only deletion/diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Creating,
    Running,
    Stopped,
    Starting,
    Stopping,
    Restarting,
    Deleting,
    Deleted,
    Error,
    Unknown,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "CREATING",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Stopping => "STOPPING",
            Self::Restarting => "RESTARTING",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Provider-specific details attached to a [`ResourceInfo`].
///
/// Known fields are typed; everything else the vendor reports passes
/// through `extra` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceMetadata {
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ResourceMetadata {
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.extra.insert(key.into(), value);
    }

    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Point-in-time snapshot of a provider-managed resource.
///
/// Never cached by the core; two calls may observe different snapshots for
/// the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: String,
    pub status: ResourceStatus,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub private_ip: Option<String>,
    pub ssh_port: u16,
    pub ssh_user: String,
    /// Initial password, present only in the creation result.
    #[serde(default)]
    pub ssh_password: Option<String>,
    #[serde(default)]
    pub ssh_key_path: Option<String>,
    #[serde(default)]
    pub metadata: ResourceMetadata,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Options for [`crate::ResourceProvider::wait_for_status`].
#[derive(Debug, Clone)]
pub struct WaitForStatusOptions {
    pub target: ResourceStatus,
    pub timeout: Duration,
    pub interval: Duration,
    /// Optional abort signal; notifying it rejects the wait with
    /// [`Error::Cancelled`].
    pub cancel: Option<Arc<Notify>>,
}

impl WaitForStatusOptions {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(target: ResourceStatus) -> Self {
        Self {
            target,
            timeout: Self::DEFAULT_TIMEOUT,
            interval: Self::DEFAULT_INTERVAL,
            cancel: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<Notify>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Result of [`crate::ResourceProvider::health_check`]. Point-in-time only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealthStatus {
    pub healthy: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub last_checked: DateTime<Utc>,
}

impl ProviderHealthStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: Some(message.into()),
            last_checked: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            last_checked: Utc::now(),
        }
    }
}
