//! ProximaDB Spill Integration Tests
//!
//! Round trips across codecs and block managers, corruption handling,
//! concurrent use of one shared serde, and property tests for the
//! round-trip law.

pub mod common;
pub mod test_block_managers;
pub mod test_concurrency;
pub mod test_corruption;
pub mod test_properties;
pub mod test_roundtrip;

// Re-export common utilities
pub use common::*;
