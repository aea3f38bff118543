pub mod chunk;
pub mod compression;
pub mod config;
pub mod error;
pub mod types;

pub use chunk::*;
pub use compression::CompressionCodec;
pub use config::{SerdeKind, SpillOptions};
pub use error::*;
pub use types::LogicalType;
