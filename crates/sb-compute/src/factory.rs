//! Provider registry and construction.
//!
//! The factory is the single entry point the calling layer uses to obtain a
//! ready-to-use provider. Built-in adapters are registered from an explicit
//! list in [`ProviderFactory::new`], so the registry contents never depend
//! on module-load side effects.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ecloud::EcloudProvider;
use crate::types::{ProviderConfig, ProviderKind};
use crate::{Error, ResourceProvider, Result};

type ProviderBuilder = Box<dyn Fn() -> Box<dyn ResourceProvider> + Send + Sync>;

/// Registry mapping a provider kind to a constructor for its adapter.
pub struct ProviderFactory {
    builders: HashMap<ProviderKind, ProviderBuilder>,
}

impl ProviderFactory {
    /// Factory with all built-in providers registered.
    pub fn new() -> Self {
        let mut factory = Self {
            builders: HashMap::new(),
        };
        factory.register(ProviderKind::Ecloud, || Box::new(EcloudProvider::new()));
        factory
    }

    /// Empty factory, mainly for tests that control registration themselves.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Register a provider constructor for `kind`.
    ///
    /// Re-registering an existing kind overwrites it; this is the designed
    /// extension point for vendor upgrades and test doubles.
    pub fn register<B>(&mut self, kind: ProviderKind, builder: B)
    where
        B: Fn() -> Box<dyn ResourceProvider> + Send + Sync + 'static,
    {
        if self.builders.insert(kind, Box::new(builder)).is_some() {
            warn!(provider = %kind, "provider already registered, overwriting");
        } else {
            debug!(provider = %kind, "provider registered");
        }
    }

    /// Construct and initialize a provider for `config.kind`.
    ///
    /// Unknown kinds reject with [`Error::ProviderNotFound`] listing what IS
    /// registered; initialization failures are wrapped as
    /// [`Error::CreationFailed`] with the original error as source.
    pub async fn create(&self, config: ProviderConfig) -> Result<Box<dyn ResourceProvider>> {
        let kind = config.kind;
        let builder = self.builders.get(&kind).ok_or_else(|| {
            let registered: Vec<&str> = self.list().iter().map(|k| k.as_str()).collect();
            Error::ProviderNotFound {
                requested: kind.to_string(),
                registered: registered.join(", "),
            }
        })?;

        let mut provider = builder();
        if let Err(source) = provider.initialize(config).await {
            return Err(Error::CreationFailed {
                kind,
                source: Box::new(source),
            });
        }

        Ok(provider)
    }

    /// Registered kinds, sorted by tag for stable output.
    pub fn list(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = self.builders.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub fn is_registered(&self, kind: ProviderKind) -> bool {
        self.builders.contains_key(&kind)
    }

    /// Remove a registration, returning whether one existed.
    pub fn unregister(&mut self, kind: ProviderKind) -> bool {
        self.builders.remove(&kind).is_some()
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}
