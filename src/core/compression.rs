// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Compression codec identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SpillError;

/// Whole-body compression codec for spill records.
///
/// The discriminant doubles as the compression flag in the record header:
/// `None` (0) marks an uncompressed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CompressionCodec {
    /// No compression
    None = 0,
    /// LZ4 block format, fastest round trip for hot spill paths
    #[default]
    Lz4 = 1,
    /// Snappy raw format
    Snappy = 2,
    /// Zstandard frame with configurable level
    Zstd = 3,
    /// GZIP stream with configurable level
    Gzip = 4,
}

impl CompressionCodec {
    pub const ALL: [CompressionCodec; 5] = [
        Self::None,
        Self::Lz4,
        Self::Snappy,
        Self::Zstd,
        Self::Gzip,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Snappy => "snappy",
            Self::Zstd => "zstd",
            Self::Gzip => "gzip",
        }
    }

    /// Whether a `compression_level` means anything for this codec
    pub fn supports_level(self) -> bool {
        matches!(self, Self::Zstd | Self::Gzip)
    }

    /// Accepted `compression_level` range, if the codec takes one
    pub fn level_range(self) -> Option<(i32, i32)> {
        match self {
            Self::Zstd => Some((1, 22)),
            Self::Gzip => Some((0, 9)),
            _ => None,
        }
    }

    pub fn default_level(self) -> Option<i32> {
        match self {
            Self::Zstd => Some(3),
            Self::Gzip => Some(6),
            _ => None,
        }
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CompressionCodec {
    type Err = SpillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "lz4" => Ok(Self::Lz4),
            "snappy" | "snap" => Ok(Self::Snappy),
            "zstd" | "zstandard" => Ok(Self::Zstd),
            "gzip" | "gz" => Ok(Self::Gzip),
            other => Err(SpillError::UnsupportedConfiguration(format!(
                "unknown compression codec '{}'",
                other
            ))),
        }
    }
}
