// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Logical column types and their wire tags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SpillError;

/// Logical type of a spilled column.
///
/// The discriminant is the one-byte type tag written into every record
/// header, so existing values must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LogicalType {
    Boolean = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    UInt8 = 6,
    UInt16 = 7,
    UInt32 = 8,
    UInt64 = 9,
    Float32 = 10,
    Float64 = 11,
    /// Variable-length UTF-8 string
    Utf8 = 12,
    /// Variable-length byte string
    Binary = 13,
}

impl LogicalType {
    pub const ALL: [LogicalType; 13] = [
        Self::Boolean,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::Utf8,
        Self::Binary,
    ];

    /// Wire tag for this type
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Resolve a wire tag; `None` for unknown or future tags
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Width in bytes of one encoded value, `None` for variable-length types
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::Utf8 | Self::Binary => None,
        }
    }

    pub fn is_variable_length(self) -> bool {
        self.fixed_width().is_none()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Utf8 => "utf8",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LogicalType {
    type Err = SpillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "bool" => return Ok(Self::Boolean),
            "string" | "str" => return Ok(Self::Utf8),
            "bytes" => return Ok(Self::Binary),
            _ => {}
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| {
                SpillError::UnsupportedConfiguration(format!("unknown column type '{}'", s))
            })
    }
}
