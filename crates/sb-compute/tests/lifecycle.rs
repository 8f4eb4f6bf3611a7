//! End-to-end lifecycle of a factory-created provider against an in-memory
//! vendor double: create, poll to RUNNING, stop/start, delete, and the
//! timeout path when provisioning never finishes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use sb_compute::{
    Credentials, Error, ProviderConfig, ProviderFactory, ProviderKind, ResourceInfo,
    ResourceMetadata, ResourceProvider, ResourceSpec, ResourceStatus, WaitForStatusOptions,
};

/// One simulated instance: a current status plus an optional pending
/// transition that completes after `polls_left` more observations.
#[derive(Clone, Debug)]
struct FakeInstance {
    status: ResourceStatus,
    pending: Option<(ResourceStatus, u32)>,
}

/// Vendor double whose control plane finishes transitions only while being
/// observed, like a real cloud that is polled for progress.
#[derive(Debug)]
struct FakeVendorProvider {
    instances: Arc<Mutex<HashMap<String, FakeInstance>>>,
    initialized: bool,
    /// Polls a fresh instance needs before CREATING flips to RUNNING.
    provision_polls: u32,
    /// When set, provisioning never completes (for the timeout path).
    stuck: bool,
}

impl FakeVendorProvider {
    fn new(provision_polls: u32, stuck: bool) -> Self {
        Self {
            instances: Arc::new(Mutex::new(HashMap::new())),
            initialized: false,
            provision_polls,
            stuck,
        }
    }

    fn snapshot(id: &str, status: ResourceStatus) -> ResourceInfo {
        ResourceInfo {
            id: id.to_string(),
            status,
            ip_address: Some("203.0.113.10".into()),
            private_ip: Some("10.0.0.10".into()),
            ssh_port: 22,
            ssh_user: "root".into(),
            ssh_password: None,
            ssh_key_path: None,
            metadata: ResourceMetadata::default(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn ensure_initialized(&self) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized(ProviderKind::Tencent));
        }
        Ok(())
    }

    async fn schedule(&self, id: &str, target: ResourceStatus, transitional: ResourceStatus) {
        let mut instances = self.instances.lock().await;
        if let Some(instance) = instances.get_mut(id) {
            instance.status = transitional;
            instance.pending = Some((target, 1));
        }
    }
}

#[async_trait]
impl ResourceProvider for FakeVendorProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tencent
    }

    fn name(&self) -> &str {
        "fake vendor"
    }

    async fn initialize(&mut self, config: ProviderConfig) -> Result<(), Error> {
        if config.credentials.access_key_id.is_empty() {
            return Err(Error::InvalidParameter {
                provider: ProviderKind::Tencent,
                parameter: "credentials.access_key_id".into(),
                message: "access key id is required".into(),
            });
        }
        self.initialized = true;
        Ok(())
    }

    async fn create_resource(&self, _spec: &ResourceSpec) -> Result<ResourceInfo, Error> {
        self.ensure_initialized()?;

        let id = format!("i-{:04}", self.instances.lock().await.len() + 1);
        let pending = if self.stuck {
            None
        } else {
            Some((ResourceStatus::Running, self.provision_polls))
        };
        self.instances.lock().await.insert(
            id.clone(),
            FakeInstance {
                status: ResourceStatus::Creating,
                pending,
            },
        );

        let mut info = Self::snapshot(&id, ResourceStatus::Creating);
        info.ssh_password = Some("Fak3!Passw0rd#ab".into());
        Ok(info)
    }

    async fn get_resource_info(&self, resource_id: &str) -> Result<ResourceInfo, Error> {
        self.ensure_initialized()?;

        let mut instances = self.instances.lock().await;
        let instance = instances
            .get_mut(resource_id)
            .ok_or_else(|| Error::ResourceNotFound {
                provider: ProviderKind::Tencent,
                resource_id: resource_id.to_string(),
            })?;

        if let Some((target, polls_left)) = instance.pending {
            if polls_left <= 1 {
                instance.status = target;
                instance.pending = None;
            } else {
                instance.pending = Some((target, polls_left - 1));
            }
        }

        Ok(Self::snapshot(resource_id, instance.status))
    }

    async fn start_resource(&self, resource_id: &str) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.schedule(resource_id, ResourceStatus::Running, ResourceStatus::Starting)
            .await;
        Ok(())
    }

    async fn stop_resource(&self, resource_id: &str) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.schedule(resource_id, ResourceStatus::Stopped, ResourceStatus::Stopping)
            .await;
        Ok(())
    }

    async fn restart_resource(&self, resource_id: &str) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.schedule(
            resource_id,
            ResourceStatus::Running,
            ResourceStatus::Restarting,
        )
        .await;
        Ok(())
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<(), Error> {
        self.ensure_initialized()?;
        self.instances.lock().await.remove(resource_id);
        Ok(())
    }

    async fn probe_health(&self) -> Result<bool, Error> {
        Ok(self.initialized)
    }
}

fn factory_with_fake(provision_polls: u32, stuck: bool) -> ProviderFactory {
    let mut factory = ProviderFactory::new();
    factory.register(ProviderKind::Tencent, move || {
        Box::new(FakeVendorProvider::new(provision_polls, stuck))
    });
    factory
}

fn config() -> ProviderConfig {
    ProviderConfig::new(
        ProviderKind::Tencent,
        Credentials {
            access_key_id: "AK".into(),
            access_key_secret: "SK".into(),
        },
    )
}

fn spec() -> ResourceSpec {
    ResourceSpec {
        cpu: 2,
        memory: 4,
        disk: 20,
        region: None,
        image: Some("ubuntu-22.04".into()),
        tags: HashMap::new(),
        network: None,
    }
}

fn wait_options(target: ResourceStatus) -> WaitForStatusOptions {
    WaitForStatusOptions::new(target)
        .with_timeout(Duration::from_secs(60))
        .with_interval(Duration::from_secs(5))
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle_reaches_each_target_status() {
    let factory = factory_with_fake(3, false);
    let provider = factory.create(config()).await.unwrap();

    let created = provider.create_resource(&spec()).await.unwrap();
    assert_eq!(created.status, ResourceStatus::Creating);
    assert!(created.ssh_password.is_some());

    let started = Instant::now();
    let running = provider
        .wait_for_status(&created.id, &wait_options(ResourceStatus::Running))
        .await
        .unwrap();
    assert_eq!(running.status, ResourceStatus::Running);
    // Three polls to finish provisioning: two 5s sleeps in between.
    assert_eq!(started.elapsed(), Duration::from_secs(10));

    provider.stop_resource(&created.id).await.unwrap();
    let stopped = provider
        .wait_for_status(&created.id, &wait_options(ResourceStatus::Stopped))
        .await
        .unwrap();
    assert_eq!(stopped.status, ResourceStatus::Stopped);

    provider.start_resource(&created.id).await.unwrap();
    let running_again = provider
        .wait_for_status(&created.id, &wait_options(ResourceStatus::Running))
        .await
        .unwrap();
    assert_eq!(running_again.status, ResourceStatus::Running);

    let health = provider.health_check().await;
    assert!(health.healthy);

    provider.delete_resource(&created.id).await.unwrap();
    let err = provider.get_resource_info(&created.id).await.unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn stuck_provisioning_times_out_at_the_deadline() {
    let factory = factory_with_fake(3, true);
    let provider = factory.create(config()).await.unwrap();

    let created = provider.create_resource(&spec()).await.unwrap();

    let started = Instant::now();
    let err = provider
        .wait_for_status(&created.id, &wait_options(ResourceStatus::Running))
        .await
        .unwrap_err();

    match err {
        Error::OperationTimeout { operation, timeout, .. } => {
            assert_eq!(operation, "wait_for_status(RUNNING)");
            assert_eq!(timeout, Duration::from_secs(60));
        }
        other => panic!("expected OperationTimeout, got {other}"),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(60));
}

#[tokio::test]
async fn factory_rejects_unregistered_kind_with_inventory() {
    let factory = ProviderFactory::new();
    let err = factory
        .create(ProviderConfig::new(
            ProviderKind::Aws,
            Credentials {
                access_key_id: "AK".into(),
                access_key_secret: "SK".into(),
            },
        ))
        .await
        .unwrap_err();

    match err {
        Error::ProviderNotFound { requested, registered } => {
            assert_eq!(requested, "aws");
            assert!(registered.contains("ecloud"));
        }
        other => panic!("expected ProviderNotFound, got {other}"),
    }
}

#[tokio::test]
async fn factory_wraps_initialize_failures() {
    let factory = factory_with_fake(1, false);

    let mut bad = config();
    bad.credentials.access_key_id = String::new();

    let err = factory.create(bad).await.unwrap_err();
    assert_eq!(err.code(), "PROVIDER_CREATION_FAILED");
    assert!(err.to_string().contains("access key id is required"));
}
