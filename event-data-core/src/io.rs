//! I/O utilities for persisted samples

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::error::{Error, Result};

/// Memory-mapped file for zero-copy reading
pub struct MemoryMappedFile {
    /// The memory map; empty files are not mapped
    mmap: Option<Mmap>,

    /// The path to the file
    path: PathBuf,

    /// The size of the file in bytes
    size: usize,
}

impl MemoryMappedFile {
    /// Open a file for memory-mapped reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let size = file.metadata()?.len() as usize;

        // Mapping a zero-length file fails on some platforms
        let mmap = if size == 0 {
            None
        } else {
            // SAFETY: cache files are only ever replaced by rename, never
            // truncated or rewritten in place, so the mapping stays valid.
            #[allow(unsafe_code)]
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            Some(mmap)
        };

        Ok(Self { mmap, path, size })
    }

    /// Get a slice of the memory-mapped file
    pub fn as_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Get a subslice of the memory-mapped file
    pub fn slice(&self, offset: usize, length: usize) -> Result<&[u8]> {
        let end = offset.checked_add(length).ok_or(Error::IndexOutOfBounds {
            index: usize::MAX,
            len: self.size,
        })?;
        if end > self.size {
            return Err(Error::IndexOutOfBounds {
                index: end,
                len: self.size,
            });
        }

        Ok(&self.as_slice()[offset..end])
    }

    /// Get the path to the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the size of the file
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Write `bytes` to `path` so that readers see either the old file or the
/// complete new one, never a partial write
///
/// The data goes to a uniquely named sibling first, is synced, and is then
/// renamed over the destination. Concurrent writers of the same path each
/// publish a complete file; the last rename wins.
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?;
    let tmp_path = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result = (|| -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Whether a directory entry is a leftover temporary file from [`write_atomic`]
pub fn is_temporary(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name.ends_with(".tmp"))
}
