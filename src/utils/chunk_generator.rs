// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Random chunk generation for benchmarks, the spill tool and tests

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::{Chunk, Column, FixedWidthValue, LogicalType, Result};

/// Shape of generated chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkGeneratorConfig {
    /// Rows per chunk
    pub rows: usize,

    /// One column per entry, in order
    pub column_types: Vec<LogicalType>,

    /// Probability that a generated value is null (0.0 - 1.0)
    pub null_density: f64,

    /// Upper bound for generated string/binary lengths
    pub max_string_len: usize,

    /// Draw values from this many distinct keys; `None` draws uniformly.
    /// Low cardinality makes chunks compress well.
    pub distinct_values: Option<u64>,
}

impl Default for ChunkGeneratorConfig {
    fn default() -> Self {
        Self {
            rows: 4096,
            column_types: vec![
                LogicalType::Int64,
                LogicalType::Float64,
                LogicalType::Utf8,
                LogicalType::Boolean,
            ],
            null_density: 0.1,
            max_string_len: 24,
            distinct_values: None,
        }
    }
}

/// Seeded chunk generator; the same seed and config give the same chunks
#[derive(Debug)]
pub struct ChunkGenerator {
    config: ChunkGeneratorConfig,
    null_density: f64,
    rng: StdRng,
}

impl ChunkGenerator {
    pub fn new(config: ChunkGeneratorConfig, seed: u64) -> Self {
        // NaN and out-of-range densities collapse into 0.0..=1.0
        let null_density = if config.null_density > 0.0 {
            config.null_density.min(1.0)
        } else {
            0.0
        };
        Self {
            config,
            null_density,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &ChunkGeneratorConfig {
        &self.config
    }

    pub fn next_chunk(&mut self) -> Result<Chunk> {
        let types = self.config.column_types.clone();
        let columns = types
            .into_iter()
            .map(|ty| self.generate_column(ty))
            .collect();
        Chunk::try_new(columns)
    }

    pub fn generate_column(&mut self, ty: LogicalType) -> Column {
        let max_len = self.config.max_string_len;
        match ty {
            LogicalType::Boolean => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k % 2 == 1)),
            LogicalType::Int8 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k as i8)),
            LogicalType::Int16 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k as i16)),
            LogicalType::Int32 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k as i32)),
            LogicalType::Int64 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k as i64)),
            LogicalType::UInt8 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k as u8)),
            LogicalType::UInt16 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k as u16)),
            LogicalType::UInt32 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k as u32)),
            LogicalType::UInt64 => self.fixed(|rng, key| key.map_or_else(|| rng.gen(), |k| k)),
            LogicalType::Float32 => self.fixed(|rng, key| {
                key.map_or_else(|| rng.gen_range(-1.0e6f32..1.0e6), |k| k as f32 * 0.25)
            }),
            LogicalType::Float64 => self.fixed(|rng, key| {
                key.map_or_else(|| rng.gen_range(-1.0e9f64..1.0e9), |k| k as f64 * 0.25)
            }),
            LogicalType::Utf8 => {
                let values = self.var_len(|rng, key| match key {
                    Some(k) => format!("key-{}", k),
                    None => {
                        let len = rng.gen_range(0..=max_len);
                        rng.sample_iter(&Alphanumeric)
                            .take(len)
                            .map(char::from)
                            .collect()
                    }
                });
                Column::from_optional_strs(values)
            }
            LogicalType::Binary => {
                let values = self.var_len(|rng, key| match key {
                    Some(k) => k.to_le_bytes().to_vec(),
                    None => {
                        let len = rng.gen_range(0..=max_len);
                        (0..len).map(|_| rng.gen()).collect()
                    }
                });
                Column::from_optional_binary(values)
            }
        }
    }

    fn next_key(&mut self) -> Option<u64> {
        let distinct = self.config.distinct_values?;
        Some(self.rng.gen_range(0..distinct.max(1)))
    }

    fn next_is_null(&mut self) -> bool {
        self.null_density > 0.0 && self.rng.gen_bool(self.null_density)
    }

    fn fixed<T, F>(&mut self, mut value: F) -> Column
    where
        T: FixedWidthValue,
        F: FnMut(&mut StdRng, Option<u64>) -> T,
    {
        let mut values = Vec::with_capacity(self.config.rows);
        for _ in 0..self.config.rows {
            if self.next_is_null() {
                values.push(None);
            } else {
                let key = self.next_key();
                values.push(Some(value(&mut self.rng, key)));
            }
        }
        Column::from_options(values)
    }

    fn var_len<V, F>(&mut self, mut value: F) -> Vec<Option<V>>
    where
        F: FnMut(&mut StdRng, Option<u64>) -> V,
    {
        let mut values = Vec::with_capacity(self.config.rows);
        for _ in 0..self.config.rows {
            if self.next_is_null() {
                values.push(None);
            } else {
                let key = self.next_key();
                values.push(Some(value(&mut self.rng, key)));
            }
        }
        values
    }
}
