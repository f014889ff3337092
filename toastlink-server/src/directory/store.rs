//! Backing stores for the app allow-list blob

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use toastlink_utils::{Result, ToastlinkError};

/// A file-like location holding the encoded directory records
pub trait DirectoryStore: Send + Sync {
    /// Read the whole blob; a store that was never written reads as empty
    fn read_all(&self) -> Result<Vec<u8>>;

    /// Append bytes to the end of the blob
    fn append(&self, bytes: &[u8]) -> Result<()>;

    /// Replace the blob with `bytes`
    fn replace(&self, bytes: &[u8]) -> Result<()>;
}

/// Store backed by a single file on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> ToastlinkError {
        ToastlinkError::FileWrite {
            path: self.path.clone(),
            source,
        }
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }
        Ok(())
    }
}

impl DirectoryStore for FileStore {
    fn read_all(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ToastlinkError::FileRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn append(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_parent()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        file.write_all(bytes).map_err(|e| self.write_error(e))?;
        file.sync_data().map_err(|e| self.write_error(e))?;

        debug!("Appended {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn replace(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_parent()?;

        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path).map_err(|e| self.write_error(e))?;

        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).map_err(|e| self.write_error(e))?;
        writer.flush().map_err(|e| self.write_error(e))?;
        writer
            .into_inner()
            .map_err(|e| self.write_error(e.into_error()))?
            .sync_all()
            .map_err(|e| self.write_error(e))?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| self.write_error(e))?;

        debug!("Rewrote {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }
}

/// In-memory store; clones share the same blob
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing blob
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Copy of the current blob
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl DirectoryStore for MemoryStore {
    fn read_all(&self) -> Result<Vec<u8>> {
        Ok(self.snapshot())
    }

    fn append(&self, bytes: &[u8]) -> Result<()> {
        self.data.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn replace(&self, bytes: &[u8]) -> Result<()> {
        *self.data.lock() = bytes.to_vec();
        Ok(())
    }
}
