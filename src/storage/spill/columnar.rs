// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! By-column serde strategy
//!
//! Each column is written as `[null bitmap][data body]`:
//! - the bitmap is `ceil(rows / 8)` bytes, bit set means null, all zeros when
//!   the column has no nulls
//! - fixed-width bodies are `rows` little-endian values; null rows keep
//!   whatever placeholder the column holds (zero for builder-made columns)
//! - variable-length bodies are `rows + 1` u32 offsets followed by the
//!   payload; a zero-row column has an empty body
//!
//! The concatenated column bodies are optionally compressed as one unit.

use tracing::{debug, trace, warn};

use super::compression::{compress_into, decompress_into};
use super::context::{reserve_scratch, SerdeContext};
use super::record::{ByteCursor, RecordHeader};
use super::ChunkSerde;
use crate::core::{
    Chunk, Column, ColumnData, CompressionCodec, FixedWidthValue, LogicalType, NullBitmap,
    Result, SerdeKind, SpillError, SpillOptions, VarLenData,
};
use crate::storage::block::{Block, BlockReader};

const OFFSET_WIDTH: usize = std::mem::size_of::<u32>();

/// Columnar serde; immutable after construction and safe to share
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarSerde {
    codec: CompressionCodec,
    level: Option<i32>,
    min_compress_size: usize,
    max_buffer_bytes: Option<usize>,
}

impl ColumnarSerde {
    pub fn new(options: &SpillOptions) -> Self {
        Self {
            codec: options.compression_codec,
            level: options.effective_compression_level(),
            min_compress_size: options.min_compress_size,
            max_buffer_bytes: options.max_buffer_bytes,
        }
    }

    pub fn codec(&self) -> CompressionCodec {
        self.codec
    }

    pub fn compression_level(&self) -> Option<i32> {
        self.level
    }

    /// Uncompressed body size `chunk` would encode to
    pub fn encoded_body_len(&self, chunk: &Chunk) -> Result<usize> {
        Self::column_lengths(chunk, &mut Vec::with_capacity(chunk.num_columns()))
    }

    /// Fill `lengths` with each column's encoded size; returns the body size
    fn column_lengths(chunk: &Chunk, lengths: &mut Vec<u64>) -> Result<usize> {
        let rows = chunk.num_rows();
        lengths.clear();
        let mut total = 0usize;
        for (idx, column) in chunk.columns().iter().enumerate() {
            if column.len() != rows {
                return Err(SpillError::encoding(format!(
                    "column {} has {} rows, chunk has {}",
                    idx,
                    column.len(),
                    rows
                )));
            }
            let len = encoded_column_len(column)
                .map_err(|e| annotate_column(e, idx))?;
            total = total
                .checked_add(len)
                .ok_or_else(|| SpillError::encoding("record body size overflows usize"))?;
            lengths.push(len as u64);
        }
        Ok(total)
    }

    /// Compress the serialize buffer when worthwhile; returns the codec the
    /// body actually went out with
    fn maybe_compress(&self, ctx: &mut SerdeContext) -> Result<CompressionCodec> {
        let raw_len = ctx.serialize_buffer.len();
        if self.codec == CompressionCodec::None || raw_len < self.min_compress_size {
            return Ok(CompressionCodec::None);
        }
        compress_into(
            self.codec,
            self.level,
            &ctx.serialize_buffer,
            &mut ctx.compress_buffer,
        )?;
        let compressed_len = ctx.compress_buffer.len();
        if compressed_len >= raw_len {
            debug!(
                "{} did not shrink a {} byte body ({} bytes), writing it raw",
                self.codec, raw_len, compressed_len
            );
            return Ok(CompressionCodec::None);
        }
        Ok(self.codec)
    }
}

impl ChunkSerde for ColumnarSerde {
    fn kind(&self) -> SerdeKind {
        SerdeKind::ByColumn
    }

    fn serialize(&self, ctx: &mut SerdeContext, chunk: &Chunk, block: &mut dyn Block) -> Result<()> {
        if chunk.num_columns() == 0 {
            return Err(SpillError::encoding("cannot spill a chunk without columns"));
        }
        let row_count = u32::try_from(chunk.num_rows()).map_err(|_| {
            SpillError::encoding(format!(
                "{} rows exceed the record limit of {}",
                chunk.num_rows(),
                u32::MAX
            ))
        })?;

        let total = Self::column_lengths(chunk, &mut ctx.header.column_lengths)?;
        reserve_scratch(&mut ctx.serialize_buffer, total, self.max_buffer_bytes)?;
        for column in chunk.columns() {
            encode_column(column, &mut ctx.serialize_buffer);
        }
        debug_assert_eq!(ctx.serialize_buffer.len(), total);

        let codec = self.maybe_compress(ctx)?;
        let body: &[u8] = if codec == CompressionCodec::None {
            &ctx.serialize_buffer
        } else {
            &ctx.compress_buffer
        };
        let header = &mut ctx.header;
        header.row_count = row_count;
        header.codec = codec;
        header.uncompressed_length = total as u64;
        header.compressed_length = body.len() as u64;
        header.column_types.clear();
        header
            .column_types
            .extend(chunk.columns().iter().map(Column::logical_type));
        header.body_checksum = crc32fast::hash(body);
        ctx.header_buffer.clear();
        header.encode_into(&mut ctx.header_buffer);
        let record_len = header.record_len();
        let wire_len = header.wire_body_len();

        if let Err(e) = block.append(&[ctx.header_buffer.as_slice(), body]) {
            warn!(
                "⚠️ Failed to append {} row record to {}: {}",
                row_count,
                block.id(),
                e
            );
            return Err(e);
        }

        let stats = ctx.stats_mut();
        stats.records_serialized += 1;
        stats.rows_serialized += u64::from(row_count);
        stats.bytes_encoded += total as u64;
        stats.bytes_written += record_len;
        if codec != CompressionCodec::None {
            stats.compressed_records += 1;
        }
        trace!(
            "spilled {} rows x {} columns to {} ({} body bytes, {} on wire, codec {})",
            row_count,
            chunk.num_columns(),
            block.id(),
            total,
            wire_len,
            codec
        );
        Ok(())
    }

    fn deserialize(&self, ctx: &mut SerdeContext, reader: &mut BlockReader<'_>) -> Result<Chunk> {
        let start = reader.offset();
        let header = RecordHeader::read_from(reader, &mut ctx.compress_buffer)?;
        check_column_lengths(&header)?;

        let body_len = usize::try_from(header.uncompressed_length).map_err(|_| {
            SpillError::corrupted(format!(
                "declared body of {} bytes does not fit in memory",
                header.uncompressed_length
            ))
        })?;
        if let Some(cap) = self.max_buffer_bytes {
            if body_len > cap {
                return Err(SpillError::ResourceExhausted(format!(
                    "record body of {} bytes exceeds scratch buffer cap of {} bytes",
                    body_len, cap
                )));
            }
        }
        let wire_len = header.wire_body_len();
        if wire_len > reader.remaining() {
            return Err(SpillError::corrupted(format!(
                "record at offset {} declares a {} byte body but only {} bytes remain",
                start,
                wire_len,
                reader.remaining()
            )));
        }
        // bounded by the block length checked above
        let wire_len = wire_len as usize;

        if header.is_compressed() {
            reader.read_into(wire_len, &mut ctx.compress_buffer)?;
            header.verify_body(&ctx.compress_buffer)?;
            decompress_into(
                header.codec,
                &ctx.compress_buffer,
                body_len,
                &mut ctx.serialize_buffer,
            )?;
        } else {
            reserve_scratch(&mut ctx.serialize_buffer, body_len, self.max_buffer_bytes)?;
            reader.read_into(wire_len, &mut ctx.serialize_buffer)?;
            header.verify_body(&ctx.serialize_buffer)?;
        }

        let columns = decode_body(&header, &ctx.serialize_buffer)?;
        let chunk = Chunk::try_new(columns)
            .map_err(|e| SpillError::corrupted(format!("decoded columns disagree: {}", e)))?;

        let stats = ctx.stats_mut();
        stats.records_deserialized += 1;
        stats.rows_deserialized += u64::from(header.row_count);
        stats.bytes_read += reader.offset() - start;
        trace!(
            "restored {} rows x {} columns from {} at offset {}",
            header.row_count,
            header.column_count(),
            reader.block_id(),
            start
        );
        Ok(chunk)
    }
}

fn annotate_column(err: SpillError, idx: usize) -> SpillError {
    match err {
        SpillError::CorruptedData(msg) => SpillError::CorruptedData(format!("column {}: {}", idx, msg)),
        SpillError::Encoding(msg) => SpillError::Encoding(format!("column {}: {}", idx, msg)),
        other => other,
    }
}

fn encoded_column_len(column: &Column) -> Result<usize> {
    let rows = column.len();
    let bitmap = NullBitmap::byte_len(rows);
    if let ColumnData::Utf8(values) = column.data() {
        if let Some(row) = invalid_utf8_row(values) {
            return Err(SpillError::encoding(format!("row {} is not valid UTF-8", row)));
        }
    }
    let body = match column.data() {
        ColumnData::Utf8(values) | ColumnData::Binary(values) => {
            if rows == 0 {
                0
            } else {
                let payload = values.bytes().len();
                if payload > u32::MAX as usize {
                    return Err(SpillError::encoding(format!(
                        "{} byte payload exceeds the u32 offset range",
                        payload
                    )));
                }
                (rows + 1)
                    .checked_mul(OFFSET_WIDTH)
                    .and_then(|offsets| offsets.checked_add(payload))
                    .ok_or_else(|| SpillError::encoding("column body size overflows usize"))?
            }
        }
        other => {
            let width = other.logical_type().fixed_width().unwrap_or(0);
            rows.checked_mul(width)
                .ok_or_else(|| SpillError::encoding("column body size overflows usize"))?
        }
    };
    Ok(bitmap + body)
}

/// First row of a string column whose bytes are not UTF-8, null rows included
fn invalid_utf8_row(values: &VarLenData) -> Option<usize> {
    values.iter().position(|v| std::str::from_utf8(v).is_err())
}

fn encode_column(column: &Column, out: &mut Vec<u8>) {
    match column.nulls() {
        Some(nulls) => out.extend_from_slice(nulls.as_bytes()),
        None => out.resize(out.len() + NullBitmap::byte_len(column.len()), 0),
    }
    match column.data() {
        ColumnData::Boolean(v) => encode_fixed(v, out),
        ColumnData::Int8(v) => encode_fixed(v, out),
        ColumnData::Int16(v) => encode_fixed(v, out),
        ColumnData::Int32(v) => encode_fixed(v, out),
        ColumnData::Int64(v) => encode_fixed(v, out),
        ColumnData::UInt8(v) => out.extend_from_slice(v),
        ColumnData::UInt16(v) => encode_fixed(v, out),
        ColumnData::UInt32(v) => encode_fixed(v, out),
        ColumnData::UInt64(v) => encode_fixed(v, out),
        ColumnData::Float32(v) => encode_fixed(v, out),
        ColumnData::Float64(v) => encode_fixed(v, out),
        ColumnData::Utf8(v) | ColumnData::Binary(v) => encode_var_len(v, out),
    }
}

fn encode_fixed<T: FixedWidthValue>(values: &[T], out: &mut Vec<u8>) {
    for value in values {
        value.write_le(out);
    }
}

fn encode_var_len(values: &VarLenData, out: &mut Vec<u8>) {
    if values.is_empty() {
        return;
    }
    // lengths were checked against u32::MAX in encoded_column_len
    for &offset in values.offsets() {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
    }
    out.extend_from_slice(values.bytes());
}

/// Reject per-column lengths that cannot belong to the declared types
fn check_column_lengths(header: &RecordHeader) -> Result<()> {
    let rows = header.row_count as u64;
    let bitmap = rows.div_ceil(8);
    for (idx, (ty, &len)) in header
        .column_types
        .iter()
        .zip(&header.column_lengths)
        .enumerate()
    {
        let ok = match ty.fixed_width() {
            Some(width) => len == bitmap + rows * width as u64,
            None if rows == 0 => len == 0,
            None => len >= bitmap + (rows + 1) * OFFSET_WIDTH as u64,
        };
        if !ok {
            return Err(SpillError::corrupted(format!(
                "column {} ({}) declares {} bytes, impossible for {} rows",
                idx, ty, len, rows
            )));
        }
    }
    Ok(())
}

fn decode_body(header: &RecordHeader, body: &[u8]) -> Result<Vec<Column>> {
    let rows = header.row_count as usize;
    let mut cursor = ByteCursor::new(body);
    let mut columns = Vec::with_capacity(header.column_count());
    for (idx, (&ty, &len)) in header
        .column_types
        .iter()
        .zip(&header.column_lengths)
        .enumerate()
    {
        let bytes = cursor.take(len as usize)?;
        let column = decode_column(ty, rows, bytes).map_err(|e| annotate_column(e, idx))?;
        columns.push(column);
    }
    if !cursor.is_empty() {
        return Err(SpillError::corrupted(format!(
            "{} trailing bytes after the last column",
            cursor.remaining()
        )));
    }
    Ok(columns)
}

fn decode_column(ty: LogicalType, rows: usize, bytes: &[u8]) -> Result<Column> {
    let bitmap_len = NullBitmap::byte_len(rows);
    if bytes.len() < bitmap_len {
        return Err(SpillError::corrupted("body shorter than its null bitmap"));
    }
    let (bitmap, body) = bytes.split_at(bitmap_len);
    let nulls = NullBitmap::from_bytes(bitmap, rows)?;
    let data = match ty {
        LogicalType::Boolean => decode_fixed::<bool>(body, rows)?,
        LogicalType::Int8 => decode_fixed::<i8>(body, rows)?,
        LogicalType::Int16 => decode_fixed::<i16>(body, rows)?,
        LogicalType::Int32 => decode_fixed::<i32>(body, rows)?,
        LogicalType::Int64 => decode_fixed::<i64>(body, rows)?,
        LogicalType::UInt8 => decode_fixed::<u8>(body, rows)?,
        LogicalType::UInt16 => decode_fixed::<u16>(body, rows)?,
        LogicalType::UInt32 => decode_fixed::<u32>(body, rows)?,
        LogicalType::UInt64 => decode_fixed::<u64>(body, rows)?,
        LogicalType::Float32 => decode_fixed::<f32>(body, rows)?,
        LogicalType::Float64 => decode_fixed::<f64>(body, rows)?,
        LogicalType::Utf8 => {
            let values = decode_var_len(body, rows)?;
            if let Some(row) = invalid_utf8_row(&values) {
                return Err(SpillError::corrupted(format!("row {} is not valid UTF-8", row)));
            }
            ColumnData::Utf8(values)
        }
        LogicalType::Binary => ColumnData::Binary(decode_var_len(body, rows)?),
    };
    Column::try_with_nulls(data, nulls).map_err(|e| SpillError::corrupted(e.to_string()))
}

fn decode_fixed<T: FixedWidthValue>(body: &[u8], rows: usize) -> Result<ColumnData> {
    if body.len() != rows * T::WIDTH {
        return Err(SpillError::corrupted(format!(
            "{} body holds {} bytes, {} rows need {}",
            T::LOGICAL_TYPE,
            body.len(),
            rows,
            rows * T::WIDTH
        )));
    }
    let mut values = Vec::new();
    values.try_reserve_exact(rows)?;
    for (row, raw) in body.chunks_exact(T::WIDTH).enumerate() {
        let value = T::read_le(raw).ok_or_else(|| {
            SpillError::corrupted(format!("invalid {} value at row {}", T::LOGICAL_TYPE, row))
        })?;
        values.push(value);
    }
    Ok(T::into_column_data(values))
}

fn decode_var_len(body: &[u8], rows: usize) -> Result<VarLenData> {
    if rows == 0 {
        if !body.is_empty() {
            return Err(SpillError::corrupted("zero-row column carries a body"));
        }
        return Ok(VarLenData::new());
    }
    let mut cursor = ByteCursor::new(body);
    let mut offsets = Vec::new();
    offsets.try_reserve_exact(rows + 1)?;
    for _ in 0..=rows {
        offsets.push(cursor.u32()? as usize);
    }
    let payload = cursor.take(cursor.remaining())?;
    VarLenData::from_parts(offsets, payload.to_vec())
}
