//! Serde behaviour on top of the memory and local block managers

use anyhow::Result;
use proximadb_spill::{
    create_serde, Block, BlockId, BlockManager, BlockReader, ChunkSerde, LocalBlock,
    LocalBlockConfig, LocalBlockManager, MemoryBlockManager, SerdeContext, SpillError,
    SpillOptions,
};
use tempfile::TempDir;

use crate::common::{orders_chunk, random_chunk};

/// Block whose appends always fail, like a full spill device
#[derive(Debug)]
struct FullDiskBlock {
    id: BlockId,
}

impl Block for FullDiskBlock {
    fn id(&self) -> BlockId {
        self.id
    }

    fn len(&self) -> u64 {
        0
    }

    fn append(&mut self, _parts: &[&[u8]]) -> proximadb_spill::Result<()> {
        Err(SpillError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "no space left on device",
        )))
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> proximadb_spill::Result<()> {
        Err(SpillError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("empty block, read of {} at {}", buf.len(), offset),
        )))
    }
}

#[test]
fn test_failed_append_surfaces_io_error() -> Result<()> {
    let serde = create_serde(&SpillOptions::default())?;
    let mut ctx = SerdeContext::new();
    let mut block = FullDiskBlock { id: BlockId(9) };
    let err = serde
        .serialize(&mut ctx, &orders_chunk(0), &mut block)
        .unwrap_err();
    assert!(matches!(err, SpillError::Io(_)));
    assert_eq!(ctx.stats().records_serialized, 0);
    assert_eq!(ctx.stats().bytes_written, 0);
    Ok(())
}

#[test]
fn test_local_blocks_survive_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let config = LocalBlockConfig {
        remove_on_release: false,
        ..LocalBlockConfig::new(dir.path())
    };
    let manager = LocalBlockManager::new(config)?;
    let serde = create_serde(&SpillOptions::default())?;
    let chunks: Vec<_> = (0..4).map(|i| random_chunk(300, 0.25, i)).collect();

    let mut ctx = SerdeContext::new();
    let mut block = manager.acquire_block()?;
    for chunk in &chunks {
        serde.serialize(&mut ctx, chunk, block.as_mut())?;
    }
    block.flush()?;
    let id = block.id();
    let path = manager.block_path(id);
    manager.release_block(block)?;

    let reopened = LocalBlock::open(id, &path)?;
    let restored = serde.deserialize_all(&mut SerdeContext::new(), &reopened)?;
    assert_eq!(restored, chunks);
    Ok(())
}

#[test]
fn test_blocks_are_independent() -> Result<()> {
    let manager = MemoryBlockManager::new();
    let serde = create_serde(&SpillOptions::uncompressed())?;
    let mut ctx = SerdeContext::new();
    let mut a = manager.acquire_block()?;
    let mut b = manager.acquire_block()?;
    serde.serialize(&mut ctx, &orders_chunk(1), a.as_mut())?;
    serde.serialize(&mut ctx, &orders_chunk(2), b.as_mut())?;
    serde.serialize(&mut ctx, &orders_chunk(3), a.as_mut())?;

    let from_a = serde.deserialize_all(&mut ctx, a.as_ref())?;
    let from_b = serde.deserialize_all(&mut ctx, b.as_ref())?;
    assert_eq!(from_a, vec![orders_chunk(1), orders_chunk(3)]);
    assert_eq!(from_b, vec![orders_chunk(2)]);

    manager.release_block(a)?;
    manager.release_block(b)?;
    assert_eq!(manager.live_blocks(), 0);
    Ok(())
}

#[test]
fn test_reader_can_resume_at_record_boundary() -> Result<()> {
    let manager = LocalBlockManager::temporary()?;
    let serde = create_serde(&SpillOptions::default())?;
    let mut ctx = SerdeContext::new();
    let mut block = manager.acquire_block()?;
    serde.serialize(&mut ctx, &orders_chunk(0), block.as_mut())?;
    let boundary = block.len();
    serde.serialize(&mut ctx, &orders_chunk(50), block.as_mut())?;

    let mut reader = BlockReader::at(block.as_ref(), boundary);
    assert_eq!(serde.deserialize(&mut ctx, &mut reader)?, orders_chunk(50));
    assert!(reader.is_exhausted());
    Ok(())
}
