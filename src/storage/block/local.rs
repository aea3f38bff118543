// Copyright 2025 ProximaDB
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Local filesystem blocks, one file per block inside a spill directory

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;
use uuid::Uuid;

use super::{Block, BlockId, BlockManager};
use crate::core::{Result, SpillError};

/// Local spill directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBlockConfig {
    /// Directory holding block files
    pub spill_dir: PathBuf,

    /// `fdatasync` after every append
    pub sync_on_append: bool,

    /// Delete the block file when the block is released
    pub remove_on_release: bool,
}

impl LocalBlockConfig {
    pub fn new(spill_dir: impl Into<PathBuf>) -> Self {
        Self {
            spill_dir: spill_dir.into(),
            sync_on_append: false, // spill data does not outlive the query
            remove_on_release: true,
        }
    }
}

/// A block backed by a single file
#[derive(Debug)]
pub struct LocalBlock {
    id: BlockId,
    path: PathBuf,
    file: Mutex<File>,
    len: u64,
    sync_on_append: bool,
}

impl LocalBlock {
    /// Create a fresh, empty block file; fails if the file exists
    pub fn create(id: BlockId, path: impl Into<PathBuf>, sync_on_append: bool) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(Self {
            id,
            path,
            file: Mutex::new(file),
            len: 0,
            sync_on_append,
        })
    }

    /// Open an existing block file, e.g. for offline inspection
    pub fn open(id: BlockId, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            id,
            path,
            file: Mutex::new(file),
            len,
            sync_on_append: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_parts(file: &mut File, start: u64, parts: &[&[u8]], sync: bool) -> std::io::Result<()> {
        file.seek(SeekFrom::Start(start))?;
        for part in parts {
            file.write_all(part)?;
        }
        if sync {
            file.sync_data()?;
        }
        Ok(())
    }
}

impl Block for LocalBlock {
    fn id(&self) -> BlockId {
        self.id
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn append(&mut self, parts: &[&[u8]]) -> Result<()> {
        let total: u64 = parts.iter().map(|p| p.len() as u64).sum();
        let start = self.len;
        let file = self.file.get_mut();
        if let Err(e) = Self::write_parts(file, start, parts, self.sync_on_append) {
            // drop the partial record so the next append starts clean
            if let Err(truncate_err) = file.set_len(start) {
                tracing::warn!(
                    "⚠️ Failed to roll back partial append on {}: {}",
                    self.path.display(),
                    truncate_err
                );
            }
            return Err(SpillError::Io(e));
        }
        self.len = start + total;
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        if end.map_or(true, |end| end > self.len) {
            return Err(SpillError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "{}: read of {} bytes at offset {} past end ({} bytes)",
                    self.id,
                    buf.len(),
                    offset,
                    self.len
                ),
            )));
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.get_mut().sync_data()?;
        Ok(())
    }
}

/// Allocates file-backed blocks inside one spill directory.
///
/// File names carry a per-manager prefix so several managers can share a
/// directory.
#[derive(Debug)]
pub struct LocalBlockManager {
    config: LocalBlockConfig,
    file_prefix: String,
    next_id: AtomicU64,
    // keeps a self-cleaning directory alive for `temporary()` managers
    _temp_dir: Option<TempDir>,
}

impl LocalBlockManager {
    pub fn new(config: LocalBlockConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.spill_dir)?;
        let file_prefix = Uuid::new_v4().simple().to_string();
        tracing::debug!(
            "📁 Local block manager {} using spill dir {}",
            file_prefix,
            config.spill_dir.display()
        );
        Ok(Self {
            config,
            file_prefix,
            next_id: AtomicU64::new(0),
            _temp_dir: None,
        })
    }

    /// Manager over a fresh temporary directory removed on drop
    pub fn temporary() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("proximadb-spill-")
            .tempdir()?;
        let mut manager = Self::new(LocalBlockConfig::new(temp_dir.path()))?;
        manager._temp_dir = Some(temp_dir);
        Ok(manager)
    }

    pub fn spill_dir(&self) -> &Path {
        &self.config.spill_dir
    }

    pub fn block_path(&self, id: BlockId) -> PathBuf {
        self.config
            .spill_dir
            .join(format!("{}-{:08}.spill", self.file_prefix, id.0))
    }
}

impl BlockManager for LocalBlockManager {
    fn name(&self) -> &'static str {
        "local"
    }

    fn acquire_block(&self) -> Result<Box<dyn Block>> {
        let id = BlockId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let block = LocalBlock::create(id, self.block_path(id), self.config.sync_on_append)?;
        tracing::trace!("acquired local {} at {}", id, block.path().display());
        Ok(Box::new(block))
    }

    fn release_block(&self, block: Box<dyn Block>) -> Result<()> {
        let id = block.id();
        drop(block);
        if !self.config.remove_on_release {
            return Ok(());
        }
        match std::fs::remove_file(self.block_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SpillError::Io(e)),
        }
    }
}
