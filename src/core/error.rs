// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Error types for the spill serialization layer

use std::collections::TryReserveError;
use thiserror::Error;

/// Result alias used throughout the spill layer
pub type Result<T> = std::result::Result<T, SpillError>;

/// Errors surfaced by serde strategies, block managers and the factory.
///
/// Nothing in this crate retries or swallows these; they go straight back to
/// the spilling operator.
#[derive(Error, Debug)]
pub enum SpillError {
    /// Unsupported type or a chunk invariant violated while encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Block read/write failure
    #[error("Block I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header/body inconsistency found while decoding a record
    #[error("Corrupted spill record: {0}")]
    CorruptedData(String),

    /// Codec failed to expand a compressed body
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Scratch buffer growth failed or exceeded its cap
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Requested serde kind, codec or option is not implemented
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

impl SpillError {
    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        Self::CorruptedData(msg.into())
    }

    pub(crate) fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// True for errors that mean the record bytes themselves are bad
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::CorruptedData(_) | Self::Decompression(_))
    }
}

impl From<TryReserveError> for SpillError {
    fn from(err: TryReserveError) -> Self {
        Self::ResourceExhausted(format!("scratch buffer growth failed: {}", err))
    }
}
