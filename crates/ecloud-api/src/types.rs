use serde::{Deserialize, Serialize};

// ── Response envelope ────────────────────────────────────────────────

/// Top-level state every ECloud response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ResponseState {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "EXCEPTION")]
    Exception,
    #[serde(rename = "ALARM")]
    Alarm,
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
}

/// Standard ECloud response envelope wrapping every API body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub request_id: Option<String>,
    pub state: ResponseState,
    #[serde(default)]
    pub body: Option<T>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ── Instance types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChargeMode {
    #[serde(rename = "HOUR")]
    Hour,
    #[serde(rename = "MONTH")]
    Month,
    #[serde(rename = "YEAR")]
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeType {
    HighPerformance,
    Ssd,
    Normal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootVolume {
    pub size: u32,
    pub volume_type: VolumeType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNetwork {
    pub network_id: String,
    pub port_type: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub zone_id: String,
    pub charge_mode: ChargeMode,
    pub flavor_name: String,
    pub boot_volume: BootVolume,
    pub image_id: String,
    pub private_network: PrivateNetwork,
    pub instance_name: String,
    /// RSA-encrypted, base64-encoded initial root password.
    pub password: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceResponse {
    pub order_id: String,
    #[serde(default)]
    pub instance_ids: Vec<String>,
}

/// One network port attached to an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePort {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub private_ip: Vec<String>,
    #[serde(default)]
    pub public_ip: Option<Vec<String>>,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub vpc_name: String,
    #[serde(default)]
    pub subnet_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u32,
    #[serde(default, rename = "type")]
    pub volume_type: String,
    #[serde(default)]
    pub status: String,
}

/// Instance details from the describe-instance endpoint.
///
/// Fields default individually so new or missing vendor fields never break
/// deserialization mid-poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDetails {
    pub id: String,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub flavor_name: String,
    #[serde(default)]
    pub cpu: u32,
    /// Memory in MB.
    #[serde(default)]
    pub memory: u32,
    /// Disk in GB.
    #[serde(default)]
    pub disk: u32,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub image_name: String,
    #[serde(default)]
    pub charge_mode: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub modified_time: String,
    #[serde(default)]
    pub ports: Vec<InstancePort>,
    #[serde(default)]
    pub boot_volume_id: String,
    #[serde(default)]
    pub boot_volume_type: String,
    #[serde(default)]
    pub volumes: Option<Vec<VolumeInfo>>,
    #[serde(default)]
    pub recycle: bool,
}

// ── Batch operations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInstancesRequest {
    pub instance_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteInstancesRequest {
    pub instance_ids: Vec<String>,
    pub delete_public_network: bool,
    pub delete_data_volumes: bool,
}

/// Per-instance outcome of a batch start/stop/reboot/delete call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperationResult {
    #[serde(default)]
    pub instance_id: String,
    pub result: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperationResponse {
    #[serde(default)]
    pub instance_batch_result: Vec<BatchOperationResult>,
}

// ── Flavors ──────────────────────────────────────────────────────────

/// A fixed-size compute offering from the vendor catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlavorInfo {
    pub flavor_name: String,
    #[serde(default)]
    pub flavor_type: String,
    pub cpu: u32,
    /// RAM in MB.
    pub ram: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeFlavorsResponse {
    #[serde(default)]
    pub flavors: Vec<FlavorInfo>,
}
