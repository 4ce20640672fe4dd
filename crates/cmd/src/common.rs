// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use archive::{Crypter, Extractor, NoCrypter, SealedCrypter, TarInterpreter};
use remote::{BackupStorage, ObjectStorage, RemoteConfig, StorageLayout, build_object_store};
use retention::StoreCatalog;

/// Where a command finds its configuration
#[derive(Debug, Clone, Default)]
pub struct BackupContext {
    pub config_path: Option<PathBuf>,
}

impl BackupContext {
    #[must_use]
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// The explicit `--config` path, or `$BASEKEEPER_CONFIG`
    pub fn resolve_config_path(&self) -> Result<PathBuf> {
        Ok(remote::resolve_config_path(self.config_path.clone())?)
    }

    /// Load the configuration and connect to the store it names
    pub async fn open(&self) -> Result<Backend> {
        let path = self.resolve_config_path()?;
        let config = RemoteConfig::load(&path)
            .await
            .with_context(|| format!("Loading configuration {}", path.display()))?;
        Backend::from_config(config)
    }
}

/// A connected backup store plus the settings commands need
pub struct Backend {
    pub config: RemoteConfig,
    pub storage: Arc<dyn BackupStorage>,
    pub layout: StorageLayout,
}

impl Backend {
    pub fn from_config(config: RemoteConfig) -> Result<Self> {
        config.validate()?;
        let store = build_object_store(&config)?;
        let layout = config.layout();
        Ok(Self {
            config,
            storage: Arc::new(ObjectStorage::new(store)),
            layout,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> StoreCatalog {
        StoreCatalog::new(self.storage.clone(), self.layout.clone())
    }

    /// Sealed decryption when a key is configured, otherwise passthrough
    pub fn crypter(&self) -> Result<Arc<dyn Crypter>> {
        let crypter: Arc<dyn Crypter> = match self.config.encryption_key_bytes()? {
            Some(key) => Arc::new(SealedCrypter::new(&key)),
            None => Arc::new(NoCrypter),
        };
        Ok(crypter)
    }

    pub fn extractor(&self, interpreter: Arc<dyn TarInterpreter>) -> Result<Extractor> {
        Ok(Extractor::new(interpreter)
            .with_crypter(self.crypter()?)
            .with_max_concurrency(self.config.download_concurrency))
    }
}
