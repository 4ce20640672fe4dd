// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The `delete` argument grammar

use crate::{Result, RetentionError};
use chrono::{DateTime, Utc};

pub const DELETE_USAGE: &str = "delete requires at least 2 parameters
        retain 5                      keep 5 backups
        retain FULL 5                 keep 5 full backups and all deltas of them
        retain FIND_FULL 5            find necessary full for 5th and keep everything after it
        before base_0123              keep everything after base_0123 including itself
        before FIND_FULL base_0123    keep everything after the base of base_0123
        before 2024-01-02T03:04:05Z   keep everything taken at or after the newest backup before that time
    append --confirm to actually delete; without it the plan is only logged";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Retain,
    Before,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteModifier {
    #[default]
    None,
    /// The target must be (or count only) full backups
    Full,
    /// An incremental target is replaced by its full ancestor
    FindFull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Count(usize),
    Name(String),
    Time(DateTime<Utc>),
}

/// A parsed `delete` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteArguments {
    pub mode: DeleteMode,
    pub modifier: DeleteModifier,
    pub target: DeleteTarget,
    /// True unless `--confirm` was given
    pub dry_run: bool,
}

impl DeleteArguments {
    /// Parse the parameters following `delete`
    pub fn parse<S: AsRef<str>>(params: &[S]) -> Result<Self> {
        Self::parse_at(params, Utc::now())
    }

    /// Parse as if the current time were `now`
    pub fn parse_at<S: AsRef<str>>(params: &[S], now: DateTime<Utc>) -> Result<Self> {
        let params: Vec<&str> = params.iter().map(AsRef::as_ref).collect();
        if params.len() < 2 {
            return Err(usage("not enough parameters"));
        }

        let mode = match params[0] {
            "retain" => DeleteMode::Retain,
            "before" => DeleteMode::Before,
            other => return Err(usage(format!("unknown delete mode {:?}", other))),
        };
        let mut rest = &params[1..];

        let modifier = match rest.first() {
            Some(&"FULL") => DeleteModifier::Full,
            Some(&"FIND_FULL") => DeleteModifier::FindFull,
            _ => DeleteModifier::None,
        };
        if modifier != DeleteModifier::None {
            rest = &rest[1..];
        }

        let Some((&target, rest)) = rest.split_first() else {
            return Err(usage("backup name not specified"));
        };

        let dry_run = match rest {
            [] => true,
            ["--confirm" | "-confirm"] => false,
            extra => return Err(usage(format!("unexpected parameters {:?}", extra))),
        };

        let target = match mode {
            DeleteMode::Retain => {
                let count: usize = target
                    .parse()
                    .map_err(|_| usage(format!("cannot parse target number {:?}", target)))?;
                if count == 0 {
                    return Err(usage("cannot retain 0 backups"));
                }
                DeleteTarget::Count(count)
            }
            DeleteMode::Before => match DateTime::parse_from_rfc3339(target) {
                Ok(time) => {
                    let time = time.with_timezone(&Utc);
                    if time > now {
                        return Err(usage("cannot delete before future date"));
                    }
                    DeleteTarget::Time(time)
                }
                Err(_) => DeleteTarget::Name(target.to_string()),
            },
        };

        Ok(Self {
            mode,
            modifier,
            target,
            dry_run,
        })
    }

    #[must_use]
    pub fn full(&self) -> bool {
        self.modifier == DeleteModifier::Full
    }

    #[must_use]
    pub fn find_full(&self) -> bool {
        self.modifier == DeleteModifier::FindFull
    }
}

fn usage(message: impl Into<String>) -> RetentionError {
    RetentionError::Usage(message.into())
}
