//! Property tests for the round-trip law

use proptest::prelude::*;
use proximadb_spill::{
    create_serde, BlockId, BlockReader, Chunk, ChunkSerde, Column, CompressionCodec, MemoryBlock,
    SerdeContext, SpillOptions,
};

fn codec_strategy() -> impl Strategy<Value = CompressionCodec> {
    prop::sample::select(CompressionCodec::ALL.to_vec())
}

fn column_strategy(rows: usize) -> impl Strategy<Value = Column> {
    prop_oneof![
        prop::collection::vec(any::<Option<i64>>(), rows).prop_map(Column::from_options),
        prop::collection::vec(any::<Option<i16>>(), rows).prop_map(Column::from_options),
        prop::collection::vec(any::<Option<u32>>(), rows).prop_map(Column::from_options),
        prop::collection::vec(any::<Option<bool>>(), rows).prop_map(Column::from_options),
        prop::collection::vec(any::<Option<f64>>(), rows).prop_map(Column::from_options),
        prop::collection::vec(any::<Option<f32>>(), rows).prop_map(Column::from_options),
        prop::collection::vec(proptest::option::of(".{0,12}"), rows)
            .prop_map(Column::from_optional_strs),
        prop::collection::vec(
            proptest::option::of(prop::collection::vec(any::<u8>(), 0..16)),
            rows
        )
        .prop_map(Column::from_optional_binary),
    ]
}

fn chunk_strategy() -> impl Strategy<Value = Chunk> {
    (0usize..64, 1usize..6).prop_flat_map(|(rows, columns)| {
        prop::collection::vec(column_strategy(rows), columns)
            .prop_map(|columns| Chunk::try_new(columns).expect("columns share a row count"))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_round_trip(chunk in chunk_strategy(), codec in codec_strategy(), min_compress in 0usize..256) {
        let options = SpillOptions {
            min_compress_size: min_compress,
            ..SpillOptions::with_codec(codec, None)
        };
        let serde = create_serde(&options).unwrap();
        let mut ctx = SerdeContext::new();
        let mut block = MemoryBlock::new(BlockId(0));
        serde.serialize(&mut ctx, &chunk, &mut block).unwrap();

        let mut reader = BlockReader::new(&block);
        let restored = serde.deserialize(&mut ctx, &mut reader).unwrap();
        prop_assert!(reader.is_exhausted());
        prop_assert_eq!(restored, chunk);
    }

    #[test]
    fn prop_multi_record_order(chunks in prop::collection::vec(chunk_strategy(), 1..6)) {
        let serde = create_serde(&SpillOptions::default()).unwrap();
        let mut ctx = SerdeContext::new();
        let mut block = MemoryBlock::new(BlockId(0));
        for chunk in &chunks {
            serde.serialize(&mut ctx, chunk, &mut block).unwrap();
        }
        let restored = serde.deserialize_all(&mut ctx, &block).unwrap();
        prop_assert_eq!(restored, chunks);
    }
}
