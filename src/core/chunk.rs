// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! In-memory columnar chunk model
//!
//! A [`Chunk`] is an ordered list of [`Column`]s that all hold the same number
//! of rows. Columns are addressed by position only. Each column carries a dense
//! value vector plus an optional [`NullBitmap`]; an all-valid bitmap is always
//! normalized away so that equality follows the logical null pattern.

use super::error::{Result, SpillError};
use super::types::LogicalType;

/// Packed null indicator, one bit per row, bit set means the row is null.
///
/// Bits past `len` in the last byte are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NullBitmap {
    bits: Vec<u8>,
    len: usize,
}

impl NullBitmap {
    /// Number of bytes needed to hold `rows` bits
    pub fn byte_len(rows: usize) -> usize {
        rows.div_ceil(8)
    }

    /// Bitmap with every row valid
    pub fn new_valid(len: usize) -> Self {
        Self {
            bits: vec![0; Self::byte_len(len)],
            len,
        }
    }

    /// Build from per-row null flags
    pub fn from_nulls<I: IntoIterator<Item = bool>>(nulls: I) -> Self {
        let mut bitmap = Self::default();
        for is_null in nulls {
            bitmap.push(is_null);
        }
        bitmap
    }

    /// Rebuild from packed bytes read off the wire
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self> {
        if bytes.len() != Self::byte_len(len) {
            return Err(SpillError::corrupted(format!(
                "null bitmap holds {} bytes, {} rows need {}",
                bytes.len(),
                len,
                Self::byte_len(len)
            )));
        }
        let tail_bits = len % 8;
        if tail_bits != 0 {
            let last = bytes[bytes.len() - 1];
            if last >> tail_bits != 0 {
                return Err(SpillError::corrupted(
                    "null bitmap has bits set past the last row",
                ));
            }
        }
        Ok(Self {
            bits: bytes.to_vec(),
            len,
        })
    }

    pub fn push(&mut self, is_null: bool) {
        if self.len % 8 == 0 {
            self.bits.push(0);
        }
        if is_null {
            self.bits[self.len / 8] |= 1 << (self.len % 8);
        }
        self.len += 1;
    }

    pub fn is_null(&self, row: usize) -> bool {
        row < self.len && self.bits[row / 8] & (1 << (row % 8)) != 0
    }

    pub fn null_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn all_valid(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

/// Offsets plus concatenated payload for variable-length values.
///
/// `offsets` always starts with 0 and has one more entry than there are values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarLenData {
    offsets: Vec<usize>,
    bytes: Vec<u8>,
}

impl Default for VarLenData {
    fn default() -> Self {
        Self::new()
    }
}

impl VarLenData {
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            bytes: Vec::new(),
        }
    }

    pub fn with_capacity(values: usize, bytes: usize) -> Self {
        let mut offsets = Vec::with_capacity(values + 1);
        offsets.push(0);
        Self {
            offsets,
            bytes: Vec::with_capacity(bytes),
        }
    }

    /// Rebuild from decoded parts, checking the offset invariants
    pub(crate) fn from_parts(offsets: Vec<usize>, bytes: Vec<u8>) -> Result<Self> {
        if offsets.first() != Some(&0) {
            return Err(SpillError::corrupted("variable-length offsets must start at 0"));
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(SpillError::corrupted(
                "variable-length offsets are not monotonically non-decreasing",
            ));
        }
        let last = offsets[offsets.len() - 1];
        if last != bytes.len() {
            return Err(SpillError::corrupted(format!(
                "last offset {} does not match payload length {}",
                last,
                bytes.len()
            )));
        }
        Ok(Self { offsets, bytes })
    }

    pub fn push(&mut self, value: &[u8]) {
        self.bytes.extend_from_slice(value);
        self.offsets.push(self.bytes.len());
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> &[u8] {
        &self.bytes[self.offsets[index]..self.offsets[index + 1]]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.offsets.windows(2).map(move |w| &self.bytes[w[0]..w[1]])
    }
}

/// Typed value storage of one column
#[derive(Debug, Clone)]
pub enum ColumnData {
    Boolean(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Utf8(VarLenData),
    Binary(VarLenData),
}

impl ColumnData {
    /// Empty storage for the given type
    pub fn empty(ty: LogicalType) -> Self {
        match ty {
            LogicalType::Boolean => Self::Boolean(Vec::new()),
            LogicalType::Int8 => Self::Int8(Vec::new()),
            LogicalType::Int16 => Self::Int16(Vec::new()),
            LogicalType::Int32 => Self::Int32(Vec::new()),
            LogicalType::Int64 => Self::Int64(Vec::new()),
            LogicalType::UInt8 => Self::UInt8(Vec::new()),
            LogicalType::UInt16 => Self::UInt16(Vec::new()),
            LogicalType::UInt32 => Self::UInt32(Vec::new()),
            LogicalType::UInt64 => Self::UInt64(Vec::new()),
            LogicalType::Float32 => Self::Float32(Vec::new()),
            LogicalType::Float64 => Self::Float64(Vec::new()),
            LogicalType::Utf8 => Self::Utf8(VarLenData::new()),
            LogicalType::Binary => Self::Binary(VarLenData::new()),
        }
    }

    pub fn logical_type(&self) -> LogicalType {
        match self {
            Self::Boolean(_) => LogicalType::Boolean,
            Self::Int8(_) => LogicalType::Int8,
            Self::Int16(_) => LogicalType::Int16,
            Self::Int32(_) => LogicalType::Int32,
            Self::Int64(_) => LogicalType::Int64,
            Self::UInt8(_) => LogicalType::UInt8,
            Self::UInt16(_) => LogicalType::UInt16,
            Self::UInt32(_) => LogicalType::UInt32,
            Self::UInt64(_) => LogicalType::UInt64,
            Self::Float32(_) => LogicalType::Float32,
            Self::Float64(_) => LogicalType::Float64,
            Self::Utf8(_) => LogicalType::Utf8,
            Self::Binary(_) => LogicalType::Binary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt8(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Utf8(v) | Self::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Self::Utf8(v) | Self::Binary(v) => {
                v.bytes().len() + v.offsets().len() * std::mem::size_of::<usize>()
            }
            other => other.len() * other.logical_type().fixed_width().unwrap_or(0),
        }
    }
}

// Floats compare by bit pattern so that NaN payloads survive a round trip.
impl PartialEq for ColumnData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int8(a), Self::Int8(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::UInt8(a), Self::UInt8(b)) => a == b,
            (Self::UInt16(a), Self::UInt16(b)) => a == b,
            (Self::UInt32(a), Self::UInt32(b)) => a == b,
            (Self::UInt64(a), Self::UInt64(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Self::Float64(a), Self::Float64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            _ => false,
        }
    }
}

/// Primitive value types with a fixed little-endian wire width
pub trait FixedWidthValue: Copy + Default + Send + Sync + 'static {
    const LOGICAL_TYPE: LogicalType;
    const WIDTH: usize;

    fn into_column_data(values: Vec<Self>) -> ColumnData;

    fn write_le(self, out: &mut Vec<u8>);

    /// Decode one value; `None` when the bytes are not a valid encoding
    fn read_le(bytes: &[u8]) -> Option<Self>;
}

impl FixedWidthValue for bool {
    const LOGICAL_TYPE: LogicalType = LogicalType::Boolean;
    const WIDTH: usize = 1;

    fn into_column_data(values: Vec<Self>) -> ColumnData {
        ColumnData::Boolean(values)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn read_le(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0] => Some(false),
            [1] => Some(true),
            _ => None,
        }
    }
}

macro_rules! impl_fixed_width {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FixedWidthValue for $ty {
                const LOGICAL_TYPE: LogicalType = LogicalType::$variant;
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn into_column_data(values: Vec<Self>) -> ColumnData {
                    ColumnData::$variant(values)
                }

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

impl_fixed_width!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

/// One typed, nullable column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    data: ColumnData,
    nulls: Option<NullBitmap>,
}

impl Column {
    /// Column without nulls
    pub fn new(data: ColumnData) -> Self {
        Self { data, nulls: None }
    }

    /// Column with an explicit null bitmap
    pub fn try_with_nulls(data: ColumnData, nulls: NullBitmap) -> Result<Self> {
        if nulls.len() != data.len() {
            return Err(SpillError::encoding(format!(
                "null bitmap covers {} rows but column holds {}",
                nulls.len(),
                data.len()
            )));
        }
        let nulls = if nulls.all_valid() { None } else { Some(nulls) };
        Ok(Self { data, nulls })
    }

    pub fn from_values<T: FixedWidthValue>(values: Vec<T>) -> Self {
        Self::new(T::into_column_data(values))
    }

    /// Null rows get `T::default()` as their placeholder value
    pub fn from_options<T, I>(values: I) -> Self
    where
        T: FixedWidthValue,
        I: IntoIterator<Item = Option<T>>,
    {
        let mut data = Vec::new();
        let mut nulls = NullBitmap::default();
        for value in values {
            nulls.push(value.is_none());
            data.push(value.unwrap_or_default());
        }
        Self::normalized(T::into_column_data(data), nulls)
    }

    pub fn from_strs<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_optional_strs(values.into_iter().map(Some))
    }

    /// Null rows hold an empty string
    pub fn from_optional_strs<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let (data, nulls) = Self::collect_var_len(
            values
                .into_iter()
                .map(|v| v.map(|s| s.as_ref().as_bytes().to_vec())),
        );
        Self::normalized(ColumnData::Utf8(data), nulls)
    }

    pub fn from_binary<I, B>(values: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self::from_optional_binary(values.into_iter().map(Some))
    }

    pub fn from_optional_binary<I, B>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<B>>,
        B: AsRef<[u8]>,
    {
        let (data, nulls) =
            Self::collect_var_len(values.into_iter().map(|v| v.map(|b| b.as_ref().to_vec())));
        Self::normalized(ColumnData::Binary(data), nulls)
    }

    fn collect_var_len<I>(values: I) -> (VarLenData, NullBitmap)
    where
        I: Iterator<Item = Option<Vec<u8>>>,
    {
        let mut data = VarLenData::new();
        let mut nulls = NullBitmap::default();
        for value in values {
            nulls.push(value.is_none());
            data.push(value.as_deref().unwrap_or_default());
        }
        (data, nulls)
    }

    fn normalized(data: ColumnData, nulls: NullBitmap) -> Self {
        let nulls = if nulls.all_valid() { None } else { Some(nulls) };
        Self { data, nulls }
    }

    pub fn logical_type(&self) -> LogicalType {
        self.data.logical_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn nulls(&self) -> Option<&NullBitmap> {
        self.nulls.as_ref()
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.nulls.as_ref().is_some_and(|n| n.is_null(row))
    }

    pub fn null_count(&self) -> usize {
        self.nulls.as_ref().map_or(0, NullBitmap::null_count)
    }

    /// String value at `row`; `None` for null rows and non-utf8 columns
    pub fn str_value(&self, row: usize) -> Option<&str> {
        match &self.data {
            ColumnData::Utf8(v) if !self.is_null(row) => std::str::from_utf8(v.value(row)).ok(),
            _ => None,
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.data.memory_usage() + self.nulls.as_ref().map_or(0, |n| n.as_bytes().len())
    }
}

/// Batch of equally long columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Chunk {
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map_or(0, Column::len);
        if let Some((idx, column)) = columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != num_rows)
        {
            return Err(SpillError::encoding(format!(
                "column {} has {} rows, expected {}",
                idx,
                column.len(),
                num_rows
            )));
        }
        Ok(Self { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn logical_types(&self) -> Vec<LogicalType> {
        self.columns.iter().map(Column::logical_type).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.columns.iter().map(Column::memory_usage).sum()
    }
}
