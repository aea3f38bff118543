//! Round-trip fidelity across codecs, null densities and chunk shapes

use anyhow::Result;
use proximadb_spill::{
    create_serde, Block, BlockId, BlockManager, BlockReader, Chunk, ChunkSerde, Column, ColumnData,
    CompressionCodec, LocalBlockManager, LogicalType, MemoryBlock, SerdeContext, SpillOptions,
};

use crate::common::{eager_options, init_test_env, orders_chunk, random_chunk};

#[test]
fn test_every_codec_and_null_density() -> Result<()> {
    init_test_env();
    for codec in CompressionCodec::ALL {
        let options = eager_options(codec);
        let serde = create_serde(&options)?;
        let mut ctx = SerdeContext::for_options(&options);
        for (seed, density) in [0.0, 0.3, 1.0].into_iter().enumerate() {
            let chunk = random_chunk(777, density, seed as u64);
            let mut block = MemoryBlock::new(BlockId(0));
            serde.serialize(&mut ctx, &chunk, &mut block)?;
            let restored = serde.deserialize(&mut ctx, &mut BlockReader::new(&block))?;
            assert_eq!(restored, chunk, "codec {} density {}", codec, density);
        }
    }
    Ok(())
}

#[test]
fn test_zero_row_chunk_every_type() -> Result<()> {
    let chunk = Chunk::try_new(
        LogicalType::ALL
            .iter()
            .map(|&ty| Column::new(ColumnData::empty(ty)))
            .collect(),
    )?;
    let serde = create_serde(&eager_options(CompressionCodec::Zstd))?;
    let mut ctx = SerdeContext::new();
    let mut block = MemoryBlock::new(BlockId(0));
    serde.serialize(&mut ctx, &chunk, &mut block)?;
    let restored = serde.deserialize(&mut ctx, &mut BlockReader::new(&block))?;
    assert_eq!(restored.num_rows(), 0);
    assert_eq!(restored.logical_types(), LogicalType::ALL.to_vec());
    assert_eq!(restored, chunk);
    Ok(())
}

#[test]
fn test_compression_toggle_on_disk() -> Result<()> {
    let manager = LocalBlockManager::temporary()?;
    let mut chunk_source = proximadb_spill::ChunkGenerator::new(
        proximadb_spill::ChunkGeneratorConfig {
            rows: 5000,
            distinct_values: Some(16),
            ..Default::default()
        },
        3,
    );
    let chunk = chunk_source.next_chunk()?;

    let mut sizes = Vec::new();
    for options in [SpillOptions::uncompressed(), eager_options(CompressionCodec::Lz4)] {
        let serde = create_serde(&options)?;
        let mut ctx = SerdeContext::for_options(&options);
        let mut block = manager.acquire_block()?;
        serde.serialize(&mut ctx, &chunk, block.as_mut())?;
        let restored = serde.deserialize_all(&mut ctx, block.as_ref())?;
        assert_eq!(restored, vec![chunk.clone()]);
        sizes.push(block.len());
        manager.release_block(block)?;
    }
    assert!(sizes[1] < sizes[0], "compressed {} raw {}", sizes[1], sizes[0]);
    Ok(())
}

#[test]
fn test_mixed_codecs_in_one_block() -> Result<()> {
    let mut block = MemoryBlock::new(BlockId(7));
    let mut ctx = SerdeContext::new();
    let mut written = Vec::new();
    for (i, codec) in CompressionCodec::ALL.into_iter().enumerate() {
        let serde = create_serde(&eager_options(codec))?;
        let chunk = random_chunk(200 + i * 31, 0.2, i as u64);
        serde.serialize(&mut ctx, &chunk, &mut block)?;
        written.push(chunk);
    }
    // the codec is recorded per record, so any serde can read them back
    let reader_serde = create_serde(&SpillOptions::uncompressed())?;
    let restored = reader_serde.deserialize_all(&mut SerdeContext::new(), &block)?;
    assert_eq!(restored, written);
    Ok(())
}

#[test]
fn test_serialize_leaves_chunk_untouched() -> Result<()> {
    let chunk = orders_chunk(100);
    let before = chunk.clone();
    let serde = create_serde(&eager_options(CompressionCodec::Snappy))?;
    let mut block = MemoryBlock::new(BlockId(0));
    serde.serialize(&mut SerdeContext::new(), &chunk, &mut block)?;
    assert_eq!(chunk, before);
    Ok(())
}

#[test]
fn test_context_reuse_across_chunk_sizes() -> Result<()> {
    let options = eager_options(CompressionCodec::Gzip);
    let serde = create_serde(&options)?;
    let mut ctx = SerdeContext::with_capacity(0);
    let mut block = MemoryBlock::new(BlockId(0));
    let chunks: Vec<Chunk> = [5000, 3, 0, 1200, 1]
        .iter()
        .enumerate()
        .map(|(i, &rows)| random_chunk(rows, 0.1, i as u64))
        .collect();
    for chunk in &chunks {
        serde.serialize(&mut ctx, chunk, &mut block)?;
    }
    let mut reader = BlockReader::new(&block);
    for expected in &chunks {
        assert_eq!(&serde.deserialize(&mut ctx, &mut reader)?, expected);
    }
    assert!(reader.is_exhausted());
    assert_eq!(ctx.stats().records_deserialized, chunks.len() as u64);
    Ok(())
}

#[test]
fn test_null_rows_keep_placeholders() -> Result<()> {
    let chunk = orders_chunk(0);
    let serde = create_serde(&SpillOptions::uncompressed())?;
    let mut block = MemoryBlock::new(BlockId(0));
    serde.serialize(&mut SerdeContext::new(), &chunk, &mut block)?;
    let restored = serde.deserialize(&mut SerdeContext::new(), &mut BlockReader::new(&block))?;

    let status = restored.column(1).expect("status column");
    assert!(status.is_null(1));
    assert_eq!(status.str_value(0), Some("pending"));
    assert_eq!(status.str_value(3), Some(""));
    match restored.column(2).expect("amount column").data() {
        ColumnData::Float64(values) => assert_eq!(values[2], 0.0),
        other => panic!("unexpected column data {:?}", other),
    }
    Ok(())
}
