// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Per-backup sentinel metadata

use serde::{Deserialize, Serialize};

/// Contents of `<name>.sentinel`
///
/// Only the increment fields matter for retention; other keys written by
/// the backup tool are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackupSentinelDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_count: Option<u32>,
}

impl BackupSentinelDto {
    /// Sentinel of a full backup
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    /// Sentinel of an incremental backup taken on top of `from`
    #[must_use]
    pub fn incremental(from: &str, full_name: &str, count: u32) -> Self {
        Self {
            increment_from: Some(from.to_string()),
            increment_full_name: Some(full_name.to_string()),
            increment_count: Some(count),
        }
    }

    #[must_use]
    pub fn is_incremental(&self) -> bool {
        self.increment_from.is_some()
    }

    #[must_use]
    pub fn full_ancestor(&self) -> Option<&str> {
        self.increment_full_name.as_deref()
    }
}
