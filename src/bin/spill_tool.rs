// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! spill-tool - inspect spill files and benchmark serde configurations

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use proximadb_spill::{
    create_serde, Block, BlockId, BlockManager, BlockReader, ChunkGenerator,
    ChunkGeneratorConfig, ChunkSerde, CompressionCodec, LocalBlock, LocalBlockManager,
    LogicalType, MemoryBlockManager, RecordHeader, SerdeContext, SpillOptions,
};

#[derive(Parser)]
#[command(name = "spill-tool")]
#[command(about = "ProximaDB spill file inspector and serde benchmark")]
struct Cli {
    /// Spill options file (.toml or .json); defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the records of a spill file and print their headers
    Inspect {
        file: PathBuf,
        /// Fully decode every record and verify its contents
        #[arg(long)]
        decode: bool,
    },
    /// Round-trip generated chunks and report ratio and throughput
    Bench {
        #[arg(long, default_value_t = 4096)]
        rows: usize,
        #[arg(long, default_value_t = 64)]
        chunks: usize,
        /// Codec override (none, lz4, snappy, zstd, gzip)
        #[arg(long)]
        codec: Option<CompressionCodec>,
        #[arg(long)]
        level: Option<i32>,
        #[arg(long, default_value_t = 0.1)]
        null_density: f64,
        /// Number of distinct values per column; uniform random when unset
        #[arg(long)]
        distinct: Option<u64>,
        /// Comma separated column types
        #[arg(long, value_delimiter = ',', default_value = "int64,float64,utf8,boolean")]
        types: Vec<LogicalType>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Spill to a temporary directory instead of memory
        #[arg(long)]
        on_disk: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut options = match &cli.config {
        Some(path) => SpillOptions::from_file(path)
            .with_context(|| format!("loading spill options from {}", path.display()))?,
        None => SpillOptions::default(),
    };

    match cli.command {
        Commands::Inspect { file, decode } => inspect(&options, file, decode),
        Commands::Bench {
            rows,
            chunks,
            codec,
            level,
            null_density,
            distinct,
            types,
            seed,
            on_disk,
        } => {
            if let Some(codec) = codec {
                options.compression_codec = codec;
                options.compression_level = None;
            }
            if level.is_some() {
                options.compression_level = level;
            }
            let generator = ChunkGeneratorConfig {
                rows,
                column_types: types,
                null_density,
                distinct_values: distinct,
                ..ChunkGeneratorConfig::default()
            };
            bench(&options, generator, chunks, seed, on_disk)
        }
    }
}

fn inspect(options: &SpillOptions, file: PathBuf, decode: bool) -> Result<()> {
    let block = LocalBlock::open(BlockId(0), &file)
        .with_context(|| format!("opening spill file {}", file.display()))?;
    let serde = create_serde(options)?;
    let mut ctx = SerdeContext::for_options(options);
    let mut scratch = Vec::new();
    let mut reader = BlockReader::new(&block);
    let mut records = 0u64;
    let mut rows = 0u64;

    println!("{} ({} bytes)", file.display(), block.len());
    while !reader.is_exhausted() {
        let start = reader.offset();
        let header = RecordHeader::read_from(&mut reader, &mut scratch)
            .with_context(|| format!("record {} at offset {}", records, start))?;
        let types: Vec<String> = header.column_types.iter().map(|t| t.to_string()).collect();
        println!(
            "#{:<5} @{:<10} rows={:<8} cols={:<3} codec={:<7} body={} -> {} [{}]",
            records,
            start,
            header.row_count,
            header.column_count(),
            header.codec,
            header.uncompressed_length,
            header.wire_body_len(),
            types.join(",")
        );
        if decode {
            let mut record_reader = BlockReader::at(&block, start);
            let chunk = serde
                .deserialize(&mut ctx, &mut record_reader)
                .with_context(|| format!("decoding record {} at offset {}", records, start))?;
            if chunk.num_rows() != header.row_count as usize {
                bail!("record {} decoded to {} rows", records, chunk.num_rows());
            }
            reader = record_reader;
        } else {
            reader
                .skip(header.wire_body_len())
                .with_context(|| format!("record {} body is truncated", records))?;
        }
        records += 1;
        rows += u64::from(header.row_count);
    }
    println!("{} records, {} rows", records, rows);
    Ok(())
}

fn bench(
    options: &SpillOptions,
    generator: ChunkGeneratorConfig,
    chunks: usize,
    seed: u64,
    on_disk: bool,
) -> Result<()> {
    let serde = create_serde(options)?;
    let manager: Box<dyn BlockManager> = if on_disk {
        Box::new(LocalBlockManager::temporary()?)
    } else {
        Box::new(MemoryBlockManager::new())
    };
    let mut generator = ChunkGenerator::new(generator, seed);
    let input = (0..chunks)
        .map(|_| generator.next_chunk())
        .collect::<proximadb_spill::Result<Vec<_>>>()?;
    let memory: usize = input.iter().map(|c| c.memory_usage()).sum();

    info!(
        "🚀 Benchmarking {} chunks x {} rows on {} blocks (codec {}, level {:?})",
        chunks,
        generator.config().rows,
        manager.name(),
        options.compression_codec,
        options.effective_compression_level()
    );

    let mut ctx = SerdeContext::for_options(options);
    let mut block = manager.acquire_block()?;
    let started = Instant::now();
    for chunk in &input {
        serde.serialize(&mut ctx, chunk, block.as_mut())?;
    }
    block.flush()?;
    let write_elapsed = started.elapsed();

    let started = Instant::now();
    let output = serde.deserialize_all(&mut ctx, block.as_ref())?;
    let read_elapsed = started.elapsed();

    if output != input {
        bail!("round trip mismatch: decoded chunks differ from the input");
    }

    let stats = ctx.stats();
    let mib = memory as f64 / (1024.0 * 1024.0);
    println!("records:        {}", stats.records_serialized);
    println!("compressed:     {}", stats.compressed_records);
    println!("encoded bytes:  {}", stats.bytes_encoded);
    println!("written bytes:  {}", stats.bytes_written);
    println!("ratio:          {:.2}x", stats.compression_ratio());
    println!(
        "serialize:      {:.2?} ({:.1} MiB/s)",
        write_elapsed,
        mib / write_elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!(
        "deserialize:    {:.2?} ({:.1} MiB/s)",
        read_elapsed,
        mib / read_elapsed.as_secs_f64().max(f64::EPSILON)
    );

    manager.release_block(block)?;
    info!("✅ Round trip verified");
    Ok(())
}
