// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::target::DELETE_USAGE;
use remote::RemoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("{0}\n{usage}", usage = DELETE_USAGE)]
    Usage(String),

    #[error("{name} is incremental and its predecessors cannot be deleted. Consider FIND_FULL option.")]
    IncrementalTarget { name: String },

    #[error("{name} is not a full backup")]
    TargetNotFull { name: String },

    #[error("Failed to fetch sentinel of {name}: {source}")]
    Sentinel { name: String, source: RemoteError },

    #[error("Malformed sentinel for {name}: {reason}")]
    MalformedSentinel { name: String, reason: String },

    #[error("Unable to delete {what}: {source}")]
    Deletion { what: String, source: RemoteError },

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl RetentionError {
    /// Whether the error is a problem with the command line rather than the store
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            RetentionError::Usage(_)
                | RetentionError::IncrementalTarget { .. }
                | RetentionError::TargetNotFull { .. }
        )
    }
}
