// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Serde Factory - builds shared serde instances from spill options

use std::sync::Arc;

use super::columnar::ColumnarSerde;
use super::{Serde, SerdePtr};
use crate::core::{CompressionCodec, Result, SerdeKind, SpillOptions};

/// Factory for serde strategies
pub struct SerdeFactory;

impl SerdeFactory {
    /// Validate `options` and build the strategy they select
    pub fn create_serde(options: &SpillOptions) -> Result<SerdePtr> {
        options.validate()?;
        if options.compression_level.is_some() && !options.compression_codec.supports_level() {
            tracing::warn!(
                "⚠️ compression_level {:?} ignored: {} has no levels",
                options.compression_level,
                options.compression_codec
            );
        }

        let serde = match options.serde_kind {
            SerdeKind::ByColumn => Serde::Columnar(ColumnarSerde::new(options)),
        };
        tracing::info!(
            "✅ Created {} serde (codec: {}, level: {:?}, min_compress_size: {})",
            options.serde_kind,
            options.compression_codec,
            options.effective_compression_level(),
            options.min_compress_size
        );
        Ok(Arc::new(serde))
    }

    /// Build from textual kind and codec names, e.g. from a command line
    pub fn create_from_str(kind: &str, codec: &str) -> Result<SerdePtr> {
        let options = SpillOptions {
            serde_kind: kind.parse()?,
            compression_codec: codec.parse()?,
            ..SpillOptions::default()
        };
        Self::create_serde(&options)
    }

    pub fn available_kinds() -> Vec<SerdeKind> {
        vec![SerdeKind::ByColumn]
    }

    pub fn available_codecs() -> Vec<CompressionCodec> {
        CompressionCodec::ALL.to_vec()
    }

    pub fn serde_info(kind: SerdeKind) -> SerdeInfo {
        match kind {
            SerdeKind::ByColumn => SerdeInfo {
                name: "by_column",
                description: "Per-column null bitmap and data body, whole-record compression",
                features: vec![
                    "Fixed-width and variable-length columns",
                    "Optional lz4/snappy/zstd/gzip body compression",
                    "CRC32 header and body checksums",
                    "Scratch buffer reuse across calls",
                ],
            },
        }
    }
}

/// Strategy description for tooling
#[derive(Debug, Clone)]
pub struct SerdeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub features: Vec<&'static str>,
}

/// Shorthand for [`SerdeFactory::create_serde`]
pub fn create_serde(options: &SpillOptions) -> Result<SerdePtr> {
    SerdeFactory::create_serde(options)
}
