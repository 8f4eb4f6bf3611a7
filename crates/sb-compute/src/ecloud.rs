//! ECloud ECS provider implementation.
//!
//! Delegates all HTTP calls to [`ecloud_api::EcloudClient`] and owns the
//! translation between the vendor's vocabulary (status strings, flavor
//! catalog, image ids) and the unified model.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use tracing::{info, warn};

use ecloud_api::{
    BootVolume, ChargeMode, CreateInstanceRequest, EcloudClient, FlavorInfo, InstanceDetails,
    InstancePort, PrivateNetwork, VolumeType,
};

use crate::types::{
    ProviderConfig, ProviderKind, ResourceInfo, ResourceMetadata, ResourceSpec, ResourceStatus,
};
use crate::{Error, ResourceProvider, Result};

const DEFAULT_ZONE: &str = "cn-jiangsu-1a";
const DEFAULT_IMAGE: &str = "ubuntu-22.04";
const SSH_PORT: u16 = 22;
const SSH_USER: &str = "root";

const PASSWORD_LENGTH: usize = 16;
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Public key published in the vendor's API documentation; initial instance
/// passwords must be RSA-encrypted with it before transmission.
const VENDOR_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQC/VpRysi0bPRLS7sbgQDJHo1MA
t9/bK+nwK5Pe3z0/O4cH5I/8kFNYy4yFsLMM+zyFvVw9C4wzjHaRcmEuF3ziJMC9
PD5ufUWgfO5nSGgZW1cmgjqnhcWJ3i+Azj72RnhKQRCn9DgJduEC9MiKfbyTICGd
6FXf9cxb21nkxI7vtwIDAQAB
-----END PUBLIC KEY-----";

/// ECloud ECS provider.
///
/// Holds no per-resource state; every query goes straight to the vendor.
#[derive(Debug)]
pub struct EcloudProvider {
    client: Option<EcloudClient>,
    default_zone: String,
    default_network_id: Option<String>,
}

impl EcloudProvider {
    /// Uninitialized provider; [`ResourceProvider::initialize`] must run
    /// before any other operation.
    pub fn new() -> Self {
        Self {
            client: None,
            default_zone: DEFAULT_ZONE.to_string(),
            default_network_id: None,
        }
    }

    fn client(&self) -> Result<&EcloudClient> {
        self.client
            .as_ref()
            .ok_or(Error::NotInitialized(ProviderKind::Ecloud))
    }

    fn validate_config(config: &ProviderConfig) -> Result<()> {
        if config.kind != ProviderKind::Ecloud {
            return Err(Error::InvalidParameter {
                provider: ProviderKind::Ecloud,
                parameter: "kind".into(),
                message: format!("expected kind 'ecloud', got '{}'", config.kind),
            });
        }
        if config.credentials.access_key_id.is_empty() {
            return Err(Error::InvalidParameter {
                provider: ProviderKind::Ecloud,
                parameter: "credentials.access_key_id".into(),
                message: "access key id is required".into(),
            });
        }
        if config.credentials.access_key_secret.is_empty() {
            return Err(Error::InvalidParameter {
                provider: ProviderKind::Ecloud,
                parameter: "credentials.access_key_secret".into(),
                message: "access key secret is required".into(),
            });
        }
        Ok(())
    }

    fn validate_spec(spec: &ResourceSpec) -> Result<()> {
        for (parameter, value) in [("cpu", spec.cpu), ("memory", spec.memory), ("disk", spec.disk)]
        {
            if value == 0 {
                return Err(Error::InvalidParameter {
                    provider: ProviderKind::Ecloud,
                    parameter: parameter.into(),
                    message: format!("{parameter} must be at least 1"),
                });
            }
        }
        Ok(())
    }

    /// Resolve the flavor name for a spec: live catalog first, static
    /// mapping when the catalog cannot be fetched.
    async fn resolve_flavor(&self, client: &EcloudClient, spec: &ResourceSpec) -> Result<String> {
        match client.list_flavors().await {
            Ok(flavors) if !flavors.is_empty() => match select_flavor(spec, &flavors) {
                Some(flavor) => Ok(flavor.flavor_name.clone()),
                None => Err(Error::InvalidParameter {
                    provider: ProviderKind::Ecloud,
                    parameter: "cpu/memory".into(),
                    message: format!(
                        "no flavor offers {} cores and {} GB memory",
                        spec.cpu, spec.memory
                    ),
                }),
            },
            Ok(_) => {
                warn!("ecloud: flavor catalog is empty, using static mapping");
                Ok(default_flavor_name(spec.cpu, spec.memory))
            }
            Err(error) => {
                warn!(error = %error, "ecloud: flavor catalog unavailable, using static mapping");
                Ok(default_flavor_name(spec.cpu, spec.memory))
            }
        }
    }

    fn resource_info(details: InstanceDetails) -> ResourceInfo {
        let mut metadata = ResourceMetadata::default();
        if !details.flavor_name.is_empty() {
            metadata.instance_type = Some(details.flavor_name.clone());
        }
        if !details.zone_id.is_empty() {
            metadata.region = Some(details.zone_id.clone());
        }
        if !details.image_id.is_empty() {
            metadata.image_id = Some(details.image_id.clone());
        }
        metadata.set("instance_name", serde_json::json!(details.instance_name));
        metadata.set("image_name", serde_json::json!(details.image_name));
        metadata.set("charge_mode", serde_json::json!(details.charge_mode));
        metadata.set("cpu", serde_json::json!(details.cpu));
        metadata.set("memory_mb", serde_json::json!(details.memory));
        metadata.set("disk_gb", serde_json::json!(details.disk));
        metadata.set("boot_volume_id", serde_json::json!(details.boot_volume_id));
        metadata.set(
            "boot_volume_type",
            serde_json::json!(details.boot_volume_type),
        );
        if let Ok(ports) = serde_json::to_value(&details.ports) {
            metadata.set("ports", ports);
        }

        ResourceInfo {
            id: details.id,
            status: map_status(&details.status),
            ip_address: extract_public_ip(&details.ports),
            private_ip: extract_private_ip(&details.ports),
            ssh_port: SSH_PORT,
            ssh_user: SSH_USER.to_string(),
            ssh_password: None,
            ssh_key_path: None,
            metadata,
            created_at: parse_vendor_time(&details.created_time).unwrap_or_else(Utc::now),
            updated_at: parse_vendor_time(&details.modified_time),
        }
    }

    /// First entry of a single-instance batch response, as a Result.
    fn check_batch(
        response: ecloud_api::BatchOperationResponse,
        action: &str,
        resource_id: &str,
    ) -> Result<()> {
        let result = response
            .instance_batch_result
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!(
                    "{action} {resource_id}: empty batch result"
                ))
            })?;

        if !result.result {
            return Err(Error::UnexpectedResponse(format!(
                "{action} {resource_id}: {}",
                result.message
            )));
        }
        Ok(())
    }
}

impl Default for EcloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProvider for EcloudProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ecloud
    }

    fn name(&self) -> &str {
        "ECloud ECS"
    }

    async fn initialize(&mut self, config: ProviderConfig) -> Result<()> {
        Self::validate_config(&config)?;

        let client = match &config.endpoint {
            Some(endpoint) => EcloudClient::with_endpoint(
                config.credentials.access_key_id.clone(),
                config.credentials.access_key_secret.clone(),
                endpoint.clone(),
            ),
            None => EcloudClient::new(
                config.credentials.access_key_id.clone(),
                config.credentials.access_key_secret.clone(),
            ),
        };

        if let Some(zone) = config.option::<String>("zone_id") {
            self.default_zone = zone;
        } else if let Some(region) = &config.region {
            self.default_zone = region.clone();
        }
        self.default_network_id = config.option::<String>("network_id");

        self.client = Some(client);
        info!(zone = %self.default_zone, "ecloud: provider initialized");
        Ok(())
    }

    async fn create_resource(&self, spec: &ResourceSpec) -> Result<ResourceInfo> {
        let client = self.client()?;
        Self::validate_spec(spec)?;

        let flavor_name = self.resolve_flavor(client, spec).await?;
        let image_id = map_image_name(spec.image.as_deref().unwrap_or(DEFAULT_IMAGE));

        let network_id = spec
            .network
            .as_ref()
            .and_then(|n| n.vpc_id.clone())
            .or_else(|| self.default_network_id.clone())
            .ok_or_else(|| Error::InvalidParameter {
                provider: ProviderKind::Ecloud,
                parameter: "network_id".into(),
                message: "network id is required, set options.network_id or spec.network.vpc_id"
                    .into(),
            })?;

        let zone_id = spec
            .region
            .clone()
            .unwrap_or_else(|| self.default_zone.clone());

        let password = generate_password();
        let encrypted_password = encrypt_password(&password)?;

        let instance_name = spec
            .tags
            .get("name")
            .cloned()
            .unwrap_or_else(|| format!("instance-{}", Utc::now().timestamp_millis()));

        let request = CreateInstanceRequest {
            zone_id: zone_id.clone(),
            charge_mode: ChargeMode::Hour,
            flavor_name: flavor_name.clone(),
            boot_volume: BootVolume {
                size: spec.disk,
                volume_type: VolumeType::HighPerformance,
            },
            image_id: image_id.clone(),
            private_network: PrivateNetwork {
                network_id,
                port_type: 0,
            },
            instance_name,
            password: encrypted_password,
            quantity: 1,
        };

        let response = match client.create_instances(&request).await {
            Ok(response) => response,
            Err(error) if error.is_quota_exhausted() => {
                return Err(Error::InsufficientQuota {
                    provider: ProviderKind::Ecloud,
                    message: error.to_string(),
                });
            }
            Err(error) => return Err(error.into()),
        };

        let instance_id = response.instance_ids.into_iter().next().ok_or_else(|| {
            Error::UnexpectedResponse("create instances returned no instance id".into())
        })?;

        info!(
            instance_id = %instance_id,
            order_id = %response.order_id,
            flavor = %flavor_name,
            "ecloud: instance creation initiated"
        );

        let mut metadata = ResourceMetadata {
            instance_type: Some(flavor_name),
            region: Some(zone_id),
            image_id: Some(image_id),
            ..Default::default()
        };
        metadata.set("order_id", serde_json::json!(response.order_id));

        // Status starts as CREATING; callers poll for RUNNING. The plaintext
        // password is returned exactly once, here.
        Ok(ResourceInfo {
            id: instance_id,
            status: ResourceStatus::Creating,
            ip_address: None,
            private_ip: None,
            ssh_port: SSH_PORT,
            ssh_user: SSH_USER.to_string(),
            ssh_password: Some(password),
            ssh_key_path: None,
            metadata,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    async fn get_resource_info(&self, resource_id: &str) -> Result<ResourceInfo> {
        let client = self.client()?;

        match client.describe_instance(resource_id).await {
            Ok(details) => Ok(Self::resource_info(details)),
            Err(error) if error.is_not_found() => Err(Error::ResourceNotFound {
                provider: ProviderKind::Ecloud,
                resource_id: resource_id.to_string(),
            }),
            Err(error) => Err(error.into()),
        }
    }

    async fn start_resource(&self, resource_id: &str) -> Result<()> {
        let client = self.client()?;
        let response = client.start_instances(&[resource_id.to_string()]).await?;
        Self::check_batch(response, "start instance", resource_id)?;
        info!(instance_id = %resource_id, "ecloud: instance start requested");
        Ok(())
    }

    async fn stop_resource(&self, resource_id: &str) -> Result<()> {
        let client = self.client()?;
        let response = client.stop_instances(&[resource_id.to_string()]).await?;
        Self::check_batch(response, "stop instance", resource_id)?;
        info!(instance_id = %resource_id, "ecloud: instance stop requested");
        Ok(())
    }

    async fn restart_resource(&self, resource_id: &str) -> Result<()> {
        let client = self.client()?;
        let response = client.reboot_instances(&[resource_id.to_string()]).await?;
        Self::check_batch(response, "reboot instance", resource_id)?;
        info!(instance_id = %resource_id, "ecloud: instance reboot requested");
        Ok(())
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<()> {
        let client = self.client()?;
        let response = client
            .delete_instances(&ecloud_api::DeleteInstancesRequest {
                instance_ids: vec![resource_id.to_string()],
                delete_public_network: true,
                delete_data_volumes: true,
            })
            .await?;
        Self::check_batch(response, "delete instance", resource_id)?;
        info!(instance_id = %resource_id, "ecloud: instance deletion requested");
        Ok(())
    }

    async fn probe_health(&self) -> Result<bool> {
        let client = self.client()?;

        // A well-formed API error (e.g. not-found for a bogus id) still
        // proves the endpoint is reachable and answering.
        match client.describe_instance("health-check-probe").await {
            Ok(_) => Ok(true),
            Err(ecloud_api::Error::Api { .. }) => Ok(true),
            Err(ecloud_api::Error::Request(_)) => Ok(false),
        }
    }
}

// ── Status & spec mapping ────────────────────────────────────────────

/// Map a vendor status string to the unified enum.
///
/// Case-insensitive; unrecognized strings map to `Unknown` so vendor API
/// drift never breaks a polling loop.
pub(crate) fn map_status(vendor_status: &str) -> ResourceStatus {
    match vendor_status.to_ascii_lowercase().as_str() {
        "active" | "in-use" => ResourceStatus::Running,
        "building" | "creating" | "pending" => ResourceStatus::Creating,
        "stopped" | "shutoff" | "shutdown" => ResourceStatus::Stopped,
        "starting" | "power-on" => ResourceStatus::Starting,
        "stopping" | "power-off" => ResourceStatus::Stopping,
        "rebooting" | "reboot" => ResourceStatus::Restarting,
        "deleting" => ResourceStatus::Deleting,
        "deleted" => ResourceStatus::Deleted,
        "error" | "failed" => ResourceStatus::Error,
        _ => ResourceStatus::Unknown,
    }
}

/// Smallest catalog flavor satisfying the spec's cpu and memory minimums,
/// scored by cpu + memory ascending. `None` when nothing qualifies.
pub(crate) fn select_flavor<'a>(
    spec: &ResourceSpec,
    flavors: &'a [FlavorInfo],
) -> Option<&'a FlavorInfo> {
    flavors
        .iter()
        .filter(|flavor| flavor.cpu >= spec.cpu && flavor.ram >= spec.memory * 1024)
        .min_by_key(|flavor| u64::from(flavor.cpu) * 1024 + u64::from(flavor.ram))
}

/// Static flavor mapping for common (cpu, memory) pairs, used when the live
/// catalog is unavailable. Flavor names follow the vendor's
/// `{series}.{size}.{ratio}` scheme where ratio is memory GB per core.
pub(crate) fn default_flavor_name(cpu: u32, memory: u32) -> String {
    match (cpu, memory) {
        (2, 4) => "s1.large.2".to_string(),
        (2, 8) => "c5.large.4".to_string(),
        (4, 8) => "s1.xlarge.2".to_string(),
        (4, 16) => "c5.xlarge.4".to_string(),
        (8, 16) => "s1.2xlarge.2".to_string(),
        (8, 32) => "c5.2xlarge.4".to_string(),
        _ => format!("s1.large.{}", memory / cpu.max(1)),
    }
}

/// Generic OS image alias → vendor image id. Unmapped names pass through
/// unchanged; the vendor may still accept them.
pub(crate) fn map_image_name(image: &str) -> String {
    match image {
        "ubuntu-22.04" => "ubuntu-22.04-base",
        "ubuntu-20.04" => "ubuntu-20.04-base",
        "centos-7" => "centos-7-base",
        "centos-8" => "centos-8-base",
        "debian-11" => "debian-11-base",
        other => other,
    }
    .to_string()
}

pub(crate) fn extract_public_ip(ports: &[InstancePort]) -> Option<String> {
    ports
        .iter()
        .filter_map(|port| port.public_ip.as_ref())
        .flat_map(|ips| ips.iter())
        .next()
        .cloned()
}

pub(crate) fn extract_private_ip(ports: &[InstancePort]) -> Option<String> {
    ports
        .iter()
        .flat_map(|port| port.private_ip.iter())
        .next()
        .cloned()
}

/// Lenient vendor timestamp parsing; malformed values become `None` rather
/// than failing a poll.
fn parse_vendor_time(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// ── Password provisioning ────────────────────────────────────────────

fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSWORD_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..PASSWORD_ALPHABET.len());
            PASSWORD_ALPHABET[idx] as char
        })
        .collect()
}

/// RSA-encrypt the plaintext password with the vendor's public key,
/// base64-encoding the ciphertext for transmission.
fn encrypt_password(password: &str) -> Result<String> {
    let key = RsaPublicKey::from_public_key_pem(VENDOR_PUBLIC_KEY_PEM)
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, password.as_bytes())
        .map_err(|e| Error::Encryption(e.to_string()))?;

    Ok(BASE64.encode(ciphertext))
}
