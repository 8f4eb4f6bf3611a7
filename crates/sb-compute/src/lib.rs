//! Vendor-agnostic compute provider abstraction.
//!
//! One contract — [`ResourceProvider`] — for creating, querying, and
//! controlling virtual compute instances across cloud vendors, plus the
//! shared machinery every adapter builds on: status polling with a bounded
//! deadline ([`wait`]), opt-in exponential-backoff retry ([`retry`]), and a
//! registry/factory for obtaining ready-to-use providers ([`factory`]).
//!
//! The calling layer (HTTP routes, persistence, auth) lives outside this
//! crate and consumes only [`ProviderFactory::create`] and the trait.
//!
//! ```text
//! caller ──► ProviderFactory::create(config) ──► Box<dyn ResourceProvider>
//!    │                                                │
//!    ├── create_resource(spec) ── mapping ── vendor client ──► CREATING
//!    └── wait_for_status(id, RUNNING) ── polls get_resource_info
//!                                         until target / ERROR / deadline
//! ```

pub mod ecloud;
pub mod error;
pub mod factory;
pub mod retry;
pub mod types;
pub mod wait;

use async_trait::async_trait;

pub use error::{Error, Result};
pub use factory::ProviderFactory;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use types::{
    Credentials, NetworkConfig, ProviderConfig, ProviderHealthStatus, ProviderKind, ResourceInfo,
    ResourceMetadata, ResourceSpec, ResourceStatus, WaitForStatusOptions,
};

/// Contract every vendor adapter implements.
///
/// A provider is a stateless façade over a stateful remote system: it holds
/// credentials and a vendor client, never per-resource state, and may be
/// called concurrently for distinct resource ids. Operations on the same id
/// are not serialized here; callers needing exactly-once semantics add
/// their own coordination.
#[async_trait]
pub trait ResourceProvider: Send + Sync + std::fmt::Debug {
    /// Provider type tag, as used by the factory registry.
    fn kind(&self) -> ProviderKind;

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Validate the config and construct the vendor client.
    ///
    /// Must complete before any other operation; everything else fails with
    /// [`Error::NotInitialized`] until it does. Create one instance per
    /// config — a second call is not supported.
    async fn initialize(&mut self, config: ProviderConfig) -> Result<()>;

    /// Create a new resource from a vendor-agnostic spec.
    ///
    /// Returns a snapshot whose status is `CREATING` (or `RUNNING` where the
    /// vendor provisions synchronously); callers poll [`Self::wait_for_status`]
    /// for readiness.
    async fn create_resource(&self, spec: &ResourceSpec) -> Result<ResourceInfo>;

    /// Fresh vendor query for the resource's current state.
    async fn get_resource_info(&self, resource_id: &str) -> Result<ResourceInfo>;

    /// Ask the vendor to start a stopped resource. Returns once the command
    /// is accepted, not once it completes.
    async fn start_resource(&self, resource_id: &str) -> Result<()>;

    /// Ask the vendor to stop a running resource. Returns on acceptance.
    async fn stop_resource(&self, resource_id: &str) -> Result<()>;

    /// Ask the vendor to restart a resource. Returns on acceptance.
    async fn restart_resource(&self, resource_id: &str) -> Result<()>;

    /// Delete the resource permanently. Irreversible; the id is invalid for
    /// further operations once this succeeds.
    async fn delete_resource(&self, resource_id: &str) -> Result<()>;

    /// Poll until the resource reaches `options.target`, fails, or the
    /// deadline passes. See [`wait::wait_for_status`] for exact semantics.
    async fn wait_for_status(
        &self,
        resource_id: &str,
        options: &WaitForStatusOptions,
    ) -> Result<ResourceInfo> {
        wait::wait_for_status(self, resource_id, options).await
    }

    /// Vendor-specific health probe backing [`Self::health_check`].
    async fn probe_health(&self) -> Result<bool>;

    /// Structured health status; never returns an error, so it is always
    /// safe to call from monitoring loops.
    async fn health_check(&self) -> ProviderHealthStatus {
        match self.probe_health().await {
            Ok(true) => ProviderHealthStatus::ok("provider is healthy"),
            Ok(false) => ProviderHealthStatus::failed("provider is unhealthy"),
            Err(error) => ProviderHealthStatus::failed(error.to_string()),
        }
    }
}
