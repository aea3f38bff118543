/*
 * Copyright 2025 Vijaykumar Singh
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # ProximaDB Spill - columnar disk spill serialization
//!
//! When a sort, aggregation or hash join outgrows its memory budget it hands
//! whole chunks of columnar data to this crate, which writes them to spill
//! blocks and reads them back later.
//!
//! ## Layout
//!
//! - [`core`]: chunk/column model, logical types, codecs, options and errors
//! - [`storage::block`]: append-only spill blocks and their managers
//!   (in-memory and local filesystem)
//! - [`storage::spill`]: the [`Serde`] strategies, the per-episode
//!   [`SerdeContext`], the record wire format and the [`SerdeFactory`]
//! - [`utils`]: random chunk generation for tooling and tests
//!
//! ## Example
//!
//! ```no_run
//! use proximadb_spill::{
//!     create_serde, BlockManager, ChunkSerde, Chunk, Column, MemoryBlockManager,
//!     SerdeContext, SpillOptions,
//! };
//!
//! # fn main() -> proximadb_spill::Result<()> {
//! let options = SpillOptions::default();
//! let serde = create_serde(&options)?;
//! let manager = MemoryBlockManager::new();
//! let mut ctx = SerdeContext::for_options(&options);
//!
//! let chunk = Chunk::try_new(vec![
//!     Column::from_values(vec![1i64, 2, 3]),
//!     Column::from_optional_strs([Some("a"), None, Some("c")]),
//! ])?;
//! let mut block = manager.acquire_block()?;
//! serde.serialize(&mut ctx, &chunk, block.as_mut())?;
//! let restored = serde.deserialize_all(&mut ctx, block.as_ref())?;
//! assert_eq!(restored, vec![chunk]);
//! manager.release_block(block)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod storage;
pub mod utils;

pub use crate::core::*;
pub use storage::block::{
    Block, BlockId, BlockManager, BlockReader, LocalBlock, LocalBlockConfig, LocalBlockManager,
    MemoryBlock, MemoryBlockManager,
};
pub use storage::spill::{
    create_serde, ChunkSerde, ColumnarSerde, RecordHeader, Serde, SerdeContext, SerdeFactory,
    SerdeInfo, SerdePtr, SerdeStats,
};
pub use utils::{ChunkGenerator, ChunkGeneratorConfig};
