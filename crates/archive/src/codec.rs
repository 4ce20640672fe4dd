// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Decompression codecs, selected by file extension
//!
//! Every codec streams: `src` is decoded through an `async-compression`
//! decoder straight into `dst` without buffering the archive in memory.

use async_compression::tokio::bufread::{
    BrotliDecoder, GzipDecoder, Lz4Decoder, LzmaDecoder, ZstdDecoder,
};
use async_trait::async_trait;
use remote::BoxedReader;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Extension of an uncompressed bundle, copied through unchanged
pub const RAW_BUNDLE_EXTENSION: &str = "tar";

/// Extension of test members that produce no bytes at all
pub const NOP_EXTENSION: &str = "nop";

/// Codecs that archives may use but that this build cannot decode
pub const UNLINKED_EXTENSIONS: &[&str] = &["lzo"];

/// Capability to decode one compressed stream
#[async_trait]
pub trait Decompressor: Send + Sync {
    fn file_extension(&self) -> &'static str;

    /// Decode all of `src` into `dst`, returning the decoded byte count
    async fn decompress(
        &self,
        dst: &mut (dyn AsyncWrite + Send + Unpin),
        src: BoxedReader,
    ) -> std::io::Result<u64>;
}

/// The codecs compiled into this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Lz4,
    Lzma,
    Zstd,
    Brotli,
    Gzip,
}

impl Codec {
    pub const ALL: [Codec; 5] = [
        Codec::Lz4,
        Codec::Lzma,
        Codec::Zstd,
        Codec::Brotli,
        Codec::Gzip,
    ];

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Lz4 => "lz4",
            Codec::Lzma => "lzma",
            Codec::Zstd => "zst",
            Codec::Brotli => "br",
            Codec::Gzip => "gz",
        }
    }
}

async fn copy_decoded<R>(
    mut decoder: R,
    dst: &mut (dyn AsyncWrite + Send + Unpin),
) -> std::io::Result<u64>
where
    R: AsyncRead + Send + Unpin,
{
    tokio::io::copy(&mut decoder, dst).await
}

#[async_trait]
impl Decompressor for Codec {
    fn file_extension(&self) -> &'static str {
        self.extension()
    }

    async fn decompress(
        &self,
        dst: &mut (dyn AsyncWrite + Send + Unpin),
        src: BoxedReader,
    ) -> std::io::Result<u64> {
        let buf_reader = BufReader::new(src);
        match self {
            Codec::Lz4 => copy_decoded(Lz4Decoder::new(buf_reader), dst).await,
            Codec::Lzma => copy_decoded(LzmaDecoder::new(buf_reader), dst).await,
            Codec::Zstd => copy_decoded(ZstdDecoder::new(buf_reader), dst).await,
            Codec::Brotli => copy_decoded(BrotliDecoder::new(buf_reader), dst).await,
            Codec::Gzip => copy_decoded(GzipDecoder::new(buf_reader), dst).await,
        }
    }
}

/// Maps file extensions to decompressors
#[derive(Clone)]
pub struct CodecRegistry {
    decompressors: Vec<Arc<dyn Decompressor>>,
}

impl CodecRegistry {
    /// A registry with nothing registered
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decompressors: Vec::new(),
        }
    }

    #[must_use]
    pub fn register(mut self, decompressor: Arc<dyn Decompressor>) -> Self {
        self.decompressors.push(decompressor);
        self
    }

    #[must_use]
    pub fn find(&self, extension: &str) -> Option<&Arc<dyn Decompressor>> {
        self.decompressors
            .iter()
            .find(|d| d.file_extension() == extension)
    }

    #[must_use]
    pub fn extensions(&self) -> Vec<&'static str> {
        self.decompressors.iter().map(|d| d.file_extension()).collect()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Codec::ALL
            .into_iter()
            .fold(Self::empty(), |registry, codec| registry.register(Arc::new(codec)))
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Extension tag of a member path: the text after the last `.` of its
/// final component, or empty when there is none
#[must_use]
pub fn file_extension(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, extension)) => extension,
        None => "",
    }
}
