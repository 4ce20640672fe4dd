// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Concurrent extraction of many members with adaptive retry
//!
//! Each member gets a producer task (decrypt and decompress into a pipe)
//! and a consumer task (untar from the pipe). A pass runs every member of
//! the current set under a semaphore; members that fail on either side are
//! retried in the next pass with half the concurrency. Once concurrency is
//! down to one and a pass fails for every member it was given, the last
//! pass's error is returned.

use crate::codec::CodecRegistry;
use crate::crypto::{Crypter, NoCrypter};
use crate::interpreter::TarInterpreter;
use crate::member::ReaderMaker;
use crate::stage::{EmptyWriteIgnorer, decrypt_and_decompress_tar, extract_one};
use crate::{ArchiveError, Result};
use remote::DEFAULT_DOWNLOAD_CONCURRENCY;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

/// Upper bound on members extracted at once, before configuration
pub const MAX_EXTRACT_CONCURRENCY: usize = 10;

/// Buffer size of the pipe between a member's producer and consumer
pub const PIPE_CAPACITY: usize = 64 * 1024;

pub struct Extractor {
    codecs: Arc<CodecRegistry>,
    crypter: Arc<dyn Crypter>,
    interpreter: Arc<dyn TarInterpreter>,
    max_concurrency: usize,
}

/// Outcome of one pass: the members to retry and the first error seen
struct Pass {
    failed: Vec<Arc<dyn ReaderMaker>>,
    error: Option<ArchiveError>,
}

impl Extractor {
    #[must_use]
    pub fn new(interpreter: Arc<dyn TarInterpreter>) -> Self {
        Self {
            codecs: Arc::new(CodecRegistry::default()),
            crypter: Arc::new(NoCrypter),
            interpreter,
            max_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Arc::new(codecs);
        self
    }

    #[must_use]
    pub fn with_crypter(mut self, crypter: Arc<dyn Crypter>) -> Self {
        self.crypter = crypter;
        self
    }

    /// Configured ceiling on concurrent members; zero is treated as one
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Concurrency of the first pass over `members` members
    #[must_use]
    pub fn initial_concurrency(&self, members: usize) -> usize {
        members
            .min(MAX_EXTRACT_CONCURRENCY)
            .min(self.max_concurrency)
            .max(1)
    }

    /// Extract every member, retrying failures at decreasing concurrency
    pub async fn extract_all(&self, members: Vec<Arc<dyn ReaderMaker>>) -> Result<()> {
        if members.is_empty() {
            return Err(ArchiveError::NoMembers);
        }

        let mut concurrency = self.initial_concurrency(members.len());
        let mut current = members;
        let mut exhausted = None;

        while !current.is_empty() {
            log::info!(
                "Extracting {} member(s) with concurrency {}",
                current.len(),
                concurrency
            );
            let pass = self.try_extract(&current, concurrency).await;

            if concurrency > 1 {
                concurrency /= 2;
            } else if pass.failed.len() == current.len() {
                exhausted = Some((pass.failed.len(), pass.error));
                break;
            }

            if !pass.failed.is_empty() {
                log::warn!(
                    "{} member(s) failed, retrying with concurrency {}",
                    pass.failed.len(),
                    concurrency
                );
            }
            current = pass.failed;
        }

        match exhausted {
            None => Ok(()),
            Some((failed, error)) => Err(ArchiveError::Exhausted {
                failed,
                source: Box::new(error.unwrap_or(ArchiveError::TaskFailed {
                    path: String::new(),
                    reason: "members failed without reporting an error".to_string(),
                })),
            }),
        }
    }

    /// Run one pass over `members` with at most `concurrency` extracting at once
    async fn try_extract(&self, members: &[Arc<dyn ReaderMaker>], concurrency: usize) -> Pass {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        let mut owners: HashMap<Id, usize> = HashMap::new();
        let mut failed = BTreeSet::new();
        let mut first_error = None;

        for (index, member) in members.iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    failed.insert(index);
                    first_error.get_or_insert(ArchiveError::TaskFailed {
                        path: member.path().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let (mut reader, writer) = tokio::io::duplex(PIPE_CAPACITY);

            let producer = {
                let member = member.clone();
                let codecs = self.codecs.clone();
                let crypter = self.crypter.clone();
                async move {
                    let mut writer = EmptyWriteIgnorer::new(writer);
                    let result = decrypt_and_decompress_tar(
                        &mut writer,
                        member.as_ref(),
                        &codecs,
                        crypter.as_ref(),
                    )
                    .await;
                    drop(writer);
                    log::info!("Finished decompression of {}", member.path());
                    result
                }
            };

            let consumer = {
                let member = member.clone();
                let interpreter = self.interpreter.clone();
                async move {
                    let result = extract_one(interpreter.as_ref(), &mut reader, member.path()).await;
                    drop(reader);
                    drop(permit);
                    log::info!("Finished extraction of {}", member.path());
                    result.map(|_| ())
                }
            };

            owners.insert(tasks.spawn(producer).id(), index);
            owners.insert(tasks.spawn(consumer).id(), index);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_error) => {
                    let id = join_error.id();
                    let reason = join_error.to_string();
                    let path = owners
                        .get(&id)
                        .map(|&index| members[index].path().to_string())
                        .unwrap_or_default();
                    (id, Err(ArchiveError::TaskFailed { path, reason }))
                }
            };

            let Err(error) = result else {
                continue;
            };
            log::warn!("{}", error);
            match owners.get(&id) {
                Some(&index) => {
                    failed.insert(index);
                }
                None => log::error!("Extraction task {} has no member", id),
            }
            first_error.get_or_insert(error);
        }

        Pass {
            failed: failed.into_iter().map(|index| members[index].clone()).collect(),
            error: first_error,
        }
    }
}
