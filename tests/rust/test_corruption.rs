//! Damaged records must fail to decode instead of yielding wrong chunks

use anyhow::Result;
use proximadb_spill::{
    create_serde, BlockId, BlockReader, Chunk, ChunkSerde, Column, CompressionCodec, MemoryBlock,
    RecordHeader, SerdeContext, SpillError, SpillOptions,
};

use crate::common::{eager_options, orders_chunk};

fn encode(options: &SpillOptions, chunks: &[Chunk]) -> Result<Vec<u8>> {
    let serde = create_serde(options)?;
    let mut ctx = SerdeContext::new();
    let mut block = MemoryBlock::new(BlockId(0));
    for chunk in chunks {
        serde.serialize(&mut ctx, chunk, &mut block)?;
    }
    Ok(block.into_bytes())
}

fn decode_first(bytes: Vec<u8>) -> proximadb_spill::Result<Chunk> {
    let serde = create_serde(&SpillOptions::uncompressed())?;
    let block = MemoryBlock::from_bytes(BlockId(0), bytes);
    let mut reader = BlockReader::new(&block);
    serde.deserialize(&mut SerdeContext::new(), &mut reader)
}

fn reseal_header(bytes: &mut [u8], columns: usize) {
    let header_len = RecordHeader::encoded_len_for(columns);
    let crc = crc32fast::hash(&bytes[..header_len - 4]);
    bytes[header_len - 4..header_len].copy_from_slice(&crc.to_le_bytes());
}

#[test]
fn test_every_truncation_is_detected() -> Result<()> {
    for codec in [CompressionCodec::None, CompressionCodec::Lz4, CompressionCodec::Zstd] {
        let bytes = encode(&eager_options(codec), &[orders_chunk(0)])?;
        for len in 0..bytes.len() {
            let err = decode_first(bytes[..len].to_vec())
                .expect_err("truncated record decoded");
            assert!(err.is_decode_failure(), "{} truncated to {}: {:?}", codec, len, err);
        }
    }
    Ok(())
}

#[test]
fn test_every_bit_flip_is_detected() -> Result<()> {
    for codec in [CompressionCodec::None, CompressionCodec::Snappy] {
        let bytes = encode(&eager_options(codec), &[orders_chunk(5)])?;
        for pos in 0..bytes.len() {
            for bit in [0x01u8, 0x80] {
                let mut damaged = bytes.clone();
                damaged[pos] ^= bit;
                let err = decode_first(damaged).expect_err("damaged record decoded");
                assert!(
                    err.is_decode_failure(),
                    "{} flip {:#04x} at {}: {:?}",
                    codec,
                    bit,
                    pos,
                    err
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_damage_in_later_record_spares_earlier_ones() -> Result<()> {
    let chunks = [orders_chunk(0), orders_chunk(10)];
    let mut bytes = encode(&SpillOptions::uncompressed(), &chunks)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let serde = create_serde(&SpillOptions::uncompressed())?;
    let block = MemoryBlock::from_bytes(BlockId(0), bytes);
    let mut reader = BlockReader::new(&block);
    let mut ctx = SerdeContext::new();
    assert_eq!(serde.deserialize(&mut ctx, &mut reader)?, chunks[0]);
    let err = serde.deserialize(&mut ctx, &mut reader).unwrap_err();
    assert!(matches!(err, SpillError::CorruptedData(_)));
    Ok(())
}

#[test]
fn test_declared_length_mismatch_after_decompression() -> Result<()> {
    let chunk = Chunk::try_new(vec![Column::from_strs(vec!["repeat me"; 400])])?;
    let mut bytes = encode(&eager_options(CompressionCodec::Lz4), &[chunk])?;
    assert_eq!(bytes[5], CompressionCodec::Lz4.tag());

    // grow the declared body by one byte and keep the header self-consistent
    let mut ulen = [0u8; 8];
    ulen.copy_from_slice(&bytes[16..24]);
    let ulen = u64::from_le_bytes(ulen) + 1;
    bytes[16..24].copy_from_slice(&ulen.to_le_bytes());
    bytes[33..41].copy_from_slice(&ulen.to_le_bytes());
    reseal_header(&mut bytes, 1);

    let err = decode_first(bytes).unwrap_err();
    assert!(err.is_decode_failure(), "{:?}", err);
    Ok(())
}

#[test]
fn test_impossible_column_length() -> Result<()> {
    let chunk = Chunk::try_new(vec![Column::from_values(vec![1i64, 2, 3])])?;
    let mut bytes = encode(&SpillOptions::uncompressed(), &[chunk])?;
    // 3 rows of int64 need 1 + 24 bytes; claim 26 for both column and body
    bytes[16..24].copy_from_slice(&26u64.to_le_bytes());
    bytes[24..32].copy_from_slice(&26u64.to_le_bytes());
    bytes[33..41].copy_from_slice(&26u64.to_le_bytes());
    reseal_header(&mut bytes, 1);
    bytes.push(0);

    let err = decode_first(bytes).unwrap_err();
    assert!(matches!(err, SpillError::CorruptedData(ref m) if m.contains("impossible")));
    Ok(())
}

#[test]
fn test_empty_block_is_not_a_record() {
    let err = decode_first(Vec::new()).unwrap_err();
    assert!(matches!(err, SpillError::CorruptedData(_)));
}
