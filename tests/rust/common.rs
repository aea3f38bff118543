//! Common utilities for integration tests

use std::sync::Once;

use proximadb_spill::{
    Chunk, ChunkGenerator, ChunkGeneratorConfig, Column, CompressionCodec, LogicalType,
    SpillOptions,
};

static INIT: Once = Once::new();

/// Initialize test logging once; honours RUST_LOG
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Options that compress every body regardless of size
pub fn eager_options(codec: CompressionCodec) -> SpillOptions {
    SpillOptions {
        min_compress_size: 0,
        ..SpillOptions::with_codec(codec, None)
    }
}

/// Seeded random chunk covering every logical type
pub fn random_chunk(rows: usize, null_density: f64, seed: u64) -> Chunk {
    let config = ChunkGeneratorConfig {
        rows,
        column_types: LogicalType::ALL.to_vec(),
        null_density,
        ..ChunkGeneratorConfig::default()
    };
    ChunkGenerator::new(config, seed)
        .next_chunk()
        .expect("generated columns share a row count")
}

/// Small hand-written chunk, handy in assertions
pub fn orders_chunk(offset: i64) -> Chunk {
    Chunk::try_new(vec![
        Column::from_values(vec![offset, offset + 1, offset + 2, offset + 3]),
        Column::from_optional_strs([Some("pending"), None, Some("shipped"), Some("")]),
        Column::from_options([Some(9.5f64), Some(0.0), None, Some(-3.25)]),
        Column::from_values(vec![true, false, false, true]),
    ])
    .expect("columns share a row count")
}
