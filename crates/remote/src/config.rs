// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Storage configuration and object store construction

use crate::layout::StorageLayout;
use crate::{RemoteError, Result};
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the configuration file when `--config` is absent
pub const CONFIG_ENV: &str = "BASEKEEPER_CONFIG";

/// Default ceiling on concurrent member extractions
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 10;

/// Length of a decoded encryption key in bytes
pub const ENCRYPTION_KEY_LEN: usize = 32;

fn default_download_concurrency() -> usize {
    DEFAULT_DOWNLOAD_CONCURRENCY
}

/// Backup storage configuration
///
/// ```yaml
/// url: s3://backups
/// region: us-east-1
/// access_key: AKIA...
/// secret_key: ...
/// server: db-primary
/// download_concurrency: 4
/// encryption_key: 000102...1f
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Store URL ("s3://bucket", "file:///path/to/store" or a plain directory)
    pub url: String,

    /// AWS region (for S3)
    #[serde(default)]
    pub region: String,

    /// AWS access key
    #[serde(default)]
    pub access_key: String,

    /// AWS secret key
    #[serde(default)]
    pub secret_key: String,

    /// Custom S3 endpoint (for MinIO, R2, etc.)
    #[serde(default)]
    pub endpoint: String,

    /// Key prefix under which this server's backups and WAL live
    #[serde(default)]
    pub server: String,

    /// Upper bound on members extracted at once during a restore
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,

    /// Hex-encoded 256-bit key; archives are decrypted when present
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl RemoteConfig {
    /// Configuration for a plain local directory, mostly useful in tests
    #[must_use]
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            url: path.into(),
            region: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            endpoint: String::new(),
            server: String::new(),
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            encryption_key: None,
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: RemoteConfig = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the YAML file at `path`
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            RemoteError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(RemoteError::Configuration("url field is required".to_string()));
        }
        if self.download_concurrency == 0 {
            return Err(RemoteError::Configuration(
                "download_concurrency must be at least 1".to_string(),
            ));
        }
        _ = self.encryption_key_bytes()?;
        Ok(())
    }

    /// Decode the encryption key, if one is configured
    pub fn encryption_key_bytes(&self) -> Result<Option<[u8; ENCRYPTION_KEY_LEN]>> {
        let Some(encoded) = self.encryption_key.as_deref() else {
            return Ok(None);
        };
        let decoded = hex::decode(encoded.trim())
            .map_err(|e| RemoteError::Configuration(format!("Invalid encryption_key: {}", e)))?;
        let key: [u8; ENCRYPTION_KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            RemoteError::Configuration(format!(
                "encryption_key must be {} bytes, got {}",
                ENCRYPTION_KEY_LEN,
                v.len()
            ))
        })?;
        Ok(Some(key))
    }

    #[must_use]
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.server)
    }
}

/// Pick the configuration file: an explicit path wins, then `$BASEKEEPER_CONFIG`
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }
    std::env::var(CONFIG_ENV).map(PathBuf::from).map_err(|_| {
        RemoteError::Configuration(format!(
            "No configuration given: pass --config or set {}",
            CONFIG_ENV
        ))
    })
}

/// Build the object store described by `config`
pub fn build_object_store(config: &RemoteConfig) -> Result<Arc<dyn ObjectStore>> {
    if config.url.starts_with("s3://") {
        let url = url::Url::parse(&config.url).map_err(|source| RemoteError::Url {
            url: config.url.clone(),
            source,
        })?;
        let bucket = url
            .host_str()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| RemoteError::Configuration(format!("No bucket in {}", config.url)))?;

        log::info!("   Bucket: {}", bucket);
        log::info!("   Region: {}", config.region);

        let mut builder = object_store::aws::AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&config.region);

        if !config.access_key.is_empty() {
            builder = builder.with_access_key_id(&config.access_key);
        }
        if !config.secret_key.is_empty() {
            builder = builder.with_secret_access_key(&config.secret_key);
        }
        if !config.endpoint.is_empty() {
            builder = builder
                .with_endpoint(&config.endpoint)
                .with_allow_http(config.endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| RemoteError::Configuration(format!("Failed to build S3 store: {}", e)))?;

        Ok(Arc::new(store))
    } else {
        let path = config.url.strip_prefix("file://").unwrap_or(&config.url);
        log::info!("   Local path: {}", path);
        // Empty member directories are removed so a backup's folder key can be deleted
        let store = object_store::local::LocalFileSystem::new_with_prefix(path)
            .map_err(|e| RemoteError::Configuration(format!("Failed to build local store: {}", e)))?
            .with_automatic_cleanup(true);
        Ok(Arc::new(store))
    }
}
