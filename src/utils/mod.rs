pub mod chunk_generator;

pub use chunk_generator::{ChunkGenerator, ChunkGeneratorConfig};
