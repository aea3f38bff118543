// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Spill serde configuration with smart defaults

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::compression::CompressionCodec;
use super::error::{Result, SpillError};

/// Physical layout strategy used to spill chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SerdeKind {
    /// Per-column layout: null bitmap then values, column after column
    #[default]
    ByColumn,
}

impl SerdeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::ByColumn => "by_column",
        }
    }
}

impl fmt::Display for SerdeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SerdeKind {
    type Err = SpillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "by_column" | "columnar" => Ok(Self::ByColumn),
            other => Err(SpillError::UnsupportedConfiguration(format!(
                "unknown serde kind '{}'",
                other
            ))),
        }
    }
}

/// Options handed to the serde factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpillOptions {
    /// Strategy to build
    pub serde_kind: SerdeKind,

    /// Codec applied to the whole record body
    pub compression_codec: CompressionCodec,

    /// Codec-specific level (zstd 1-22, gzip 0-9); `None` uses the codec default
    pub compression_level: Option<i32>,

    /// Bodies smaller than this are written uncompressed (bytes)
    pub min_compress_size: usize,

    /// Cap on the uncompressed record body (bytes), enforced on serialize and
    /// deserialize. The compression buffer may grow past it by the codec's
    /// worst-case overhead. `None` is unbounded
    pub max_buffer_bytes: Option<usize>,

    /// Capacity contexts pre-allocate for their scratch buffers (bytes)
    pub initial_buffer_capacity: usize,
}

impl Default for SpillOptions {
    fn default() -> Self {
        Self {
            serde_kind: SerdeKind::default(),
            compression_codec: CompressionCodec::default(),
            compression_level: None,
            min_compress_size: 128,
            max_buffer_bytes: None,
            initial_buffer_capacity: 64 * 1024,
        }
    }
}

impl SpillOptions {
    /// Uncompressed options, handy for debugging spill files
    pub fn uncompressed() -> Self {
        Self {
            compression_codec: CompressionCodec::None,
            ..Self::default()
        }
    }

    pub fn with_codec(codec: CompressionCodec, level: Option<i32>) -> Self {
        Self {
            compression_codec: codec,
            compression_level: level,
            ..Self::default()
        }
    }

    /// Level actually passed to the codec
    pub fn effective_compression_level(&self) -> Option<i32> {
        if self.compression_codec.supports_level() {
            self.compression_level
                .or_else(|| self.compression_codec.default_level())
        } else {
            None
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let (Some(level), Some((min, max))) =
            (self.compression_level, self.compression_codec.level_range())
        {
            if !(min..=max).contains(&level) {
                return Err(SpillError::UnsupportedConfiguration(format!(
                    "compression level {} out of range {}..={} for {}",
                    level, min, max, self.compression_codec
                )));
            }
        }
        if let Some(cap) = self.max_buffer_bytes {
            if cap == 0 {
                return Err(SpillError::UnsupportedConfiguration(
                    "max_buffer_bytes must be greater than zero".to_string(),
                ));
            }
            if self.initial_buffer_capacity > cap {
                return Err(SpillError::UnsupportedConfiguration(format!(
                    "initial_buffer_capacity {} exceeds max_buffer_bytes {}",
                    self.initial_buffer_capacity, cap
                )));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            SpillError::UnsupportedConfiguration(format!("TOML parsing error: {}", e))
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            SpillError::UnsupportedConfiguration(format!("JSON parsing error: {}", e))
        })
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(SpillError::UnsupportedConfiguration(format!(
                "unrecognized config file extension: {}",
                path.display()
            ))),
        }
    }
}
