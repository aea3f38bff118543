//! One shared serde driven by several operator threads

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use proximadb_spill::{
    create_serde, BlockManager, ChunkSerde, CompressionCodec, LocalBlockManager,
    MemoryBlockManager, SerdeContext,
};

use crate::common::{eager_options, random_chunk};

fn run_operators(manager: Arc<dyn BlockManager>, codec: CompressionCodec) -> Result<()> {
    let options = eager_options(codec);
    let serde = create_serde(&options)?;

    let handles: Vec<_> = (0..6u64)
        .map(|worker| {
            let serde = Arc::clone(&serde);
            let manager = Arc::clone(&manager);
            let options = options.clone();
            thread::spawn(move || -> proximadb_spill::Result<()> {
                let mut ctx = SerdeContext::for_options(&options);
                let mut block = manager.acquire_block()?;
                let chunks: Vec<_> = (0..8)
                    .map(|i| random_chunk(100 + i * 17, 0.2, worker * 100 + i as u64))
                    .collect();
                for chunk in &chunks {
                    serde.serialize(&mut ctx, chunk, block.as_mut())?;
                }
                let restored = serde.deserialize_all(&mut ctx, block.as_ref())?;
                assert_eq!(restored, chunks, "worker {}", worker);
                manager.release_block(block)
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("operator thread panicked"))??;
    }
    Ok(())
}

#[test]
fn test_shared_serde_memory_blocks() -> Result<()> {
    let manager = Arc::new(MemoryBlockManager::new());
    run_operators(manager.clone(), CompressionCodec::Lz4)?;
    assert_eq!(manager.live_blocks(), 0);
    Ok(())
}

#[test]
fn test_shared_serde_local_blocks() -> Result<()> {
    let manager = Arc::new(LocalBlockManager::temporary()?);
    run_operators(manager, CompressionCodec::Zstd)
}
