//! Byte-level backends for the commit log
//!
//! Backends are opaque append-only byte stores. They know nothing about
//! frames; the store owns the log format.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::errors::{StorageError, StorageResult};

/// File name of the commit log inside `<data_dir>/data/`.
pub const LOG_FILE_NAME: &str = "bookshelf.log";

/// Lock file held exclusively by the one open database per data directory.
pub const LOCK_FILE_NAME: &str = "bookshelf.lock";

/// Append-only byte store holding the commit log.
pub trait LogBackend: Send + fmt::Debug {
    /// Reads the whole log.
    fn read_all(&mut self) -> StorageResult<Vec<u8>>;

    /// Appends `data` at the end of the log, returning the offset it was
    /// written at. On failure part of `data` may have reached the log and
    /// `size()` is unchanged; the caller truncates back to it.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Makes every appended byte durable.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the log down to `len` bytes.
    fn truncate(&mut self, len: u64) -> StorageResult<()>;

    /// Atomically replaces the whole log with `data`.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Current log length in bytes.
    fn size(&self) -> u64;

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

/// Commit log stored in `<data_dir>/data/bookshelf.log`.
///
/// Holds an exclusive lock on `<data_dir>/data/bookshelf.lock` until
/// dropped, so one data directory has at most one writer.
#[derive(Debug)]
pub struct FileBackend {
    log_path: PathBuf,
    file: File,
    size: u64,
    _lock: File,
}

impl FileBackend {
    /// Opens or creates the log under `data_dir`, creating directories as needed.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let data_subdir = data_dir.join("data");
        let log_path = data_subdir.join(LOG_FILE_NAME);

        if !data_subdir.exists() {
            fs::create_dir_all(&data_subdir).map_err(|e| {
                StorageError::io_error(
                    format!("Failed to create data directory: {}", data_subdir.display()),
                    e,
                )
            })?;
        }

        let lock = Self::acquire_lock(&data_subdir.join(LOCK_FILE_NAME))?;
        let file = Self::open_log(&log_path)?;
        let size = file
            .metadata()
            .map_err(|e| StorageError::io_error("Failed to read log metadata", e))?
            .len();

        Ok(Self {
            log_path,
            file,
            size,
            _lock: lock,
        })
    }

    fn acquire_lock(lock_path: &Path) -> StorageResult<File> {
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| {
                StorageError::io_error(
                    format!("Failed to open lock file: {}", lock_path.display()),
                    e,
                )
            })?;

        lock.try_lock_exclusive().map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                StorageError::locked(lock_path.display().to_string(), e)
            } else {
                StorageError::io_error(
                    format!("Failed to lock {}", lock_path.display()),
                    e,
                )
            }
        })?;
        Ok(lock)
    }

    fn open_log(log_path: &Path) -> StorageResult<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(log_path)
            .map_err(|e| {
                StorageError::io_error(
                    format!("Failed to open log file: {}", log_path.display()),
                    e,
                )
            })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

impl LogBackend for FileBackend {
    fn read_all(&mut self) -> StorageResult<Vec<u8>> {
        let mut contents = Vec::with_capacity(self.size as usize);
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| StorageError::read_failed("Failed to seek log", e))?;
        self.file
            .read_to_end(&mut contents)
            .map_err(|e| StorageError::read_failed("Failed to read log", e))?;
        Ok(contents)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size;
        self.file.write_all(data).map_err(|e| {
            StorageError::write_failed(format!("Failed to append {} bytes to log", data.len()), e)
        })?;
        self.size += data.len() as u64;
        Ok(offset)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file
            .sync_data()
            .map_err(|e| StorageError::write_failed("fsync failed on log", e))
    }

    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        self.file.set_len(len).map_err(|e| {
            StorageError::io_error(format!("Failed to truncate log to {} bytes", len), e)
        })?;
        self.file
            .sync_all()
            .map_err(|e| StorageError::io_error("fsync failed after truncate", e))?;
        self.size = len;
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp_path = self.log_path.with_extension("log.compact");

        {
            let mut temp = File::create(&temp_path).map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to create {}", temp_path.display()),
                    e,
                )
            })?;
            temp.write_all(data)
                .map_err(|e| StorageError::write_failed("Failed to write compacted log", e))?;
            temp.sync_all()
                .map_err(|e| StorageError::write_failed("fsync failed on compacted log", e))?;
        }

        fs::rename(&temp_path, &self.log_path).map_err(|e| {
            StorageError::write_failed("Failed to swap in compacted log", e)
        })?;

        self.file = Self::open_log(&self.log_path)?;
        self.size = data.len() as u64;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn location(&self) -> String {
        self.log_path.display().to_string()
    }
}

/// Commit log held in process memory. Gone when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    identifier: String,
    bytes: Vec<u8>,
}

impl MemoryBackend {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            bytes: Vec::new(),
        }
    }

    /// Starts from existing log bytes (used to exercise replay).
    pub fn with_bytes(identifier: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            identifier: identifier.into(),
            bytes,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl LogBackend for MemoryBackend {
    fn read_all(&mut self) -> StorageResult<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.bytes.len() as u64;
        self.bytes.extend_from_slice(data);
        Ok(offset)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        self.bytes.truncate(len as usize);
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        self.bytes = data.to_vec();
        Ok(())
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn location(&self) -> String {
        format!("memory:{}", self.identifier)
    }
}
