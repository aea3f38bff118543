pub mod block;
pub mod spill;

pub use block::{
    Block, BlockId, BlockManager, BlockReader, LocalBlock, LocalBlockConfig, LocalBlockManager,
    MemoryBlock, MemoryBlockManager,
};
pub use spill::{
    create_serde, ChunkSerde, ColumnarSerde, RecordHeader, Serde, SerdeContext, SerdeFactory,
    SerdePtr, SerdeStats,
};
