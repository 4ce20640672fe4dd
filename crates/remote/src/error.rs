// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for remote storage operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Invalid URL {url}: {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RemoteError {
    /// True when the store reported the object as absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::ObjectStore(object_store::Error::NotFound { .. }))
    }
}
