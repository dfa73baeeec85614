//! Filesystem-backed session handler.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use satchel::{Error, Handler, Result};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Stores each session blob as a file named after its identifier.
///
/// Reads share a lock; init/write/destroy/gc take it exclusively.
#[derive(Debug)]
pub struct FileHandler {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl FileHandler {
    /// Create a handler rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: RwLock::new(()),
        })
    }

    /// The directory holding session files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, id: &str) -> Result<PathBuf> {
        let invalid = id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\', '\0']);
        if invalid {
            return Err(Error::handler(format!("invalid session id: {id:?}")));
        }
        Ok(self.dir.join(id))
    }
}

impl Handler for FileHandler {
    fn init(&self, id: &str) -> Result<()> {
        let path = self.resolve(id)?;
        let _guard = self.lock.write();
        // Create without truncating an existing blob.
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(id)?;
        let _guard = self.lock.read();
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(id)?;
        let _guard = self.lock.write();
        fs::write(&path, data)?;
        trace!(session_id = %id, bytes = data.len(), "Session file written");
        Ok(())
    }

    fn destroy(&self, id: &str) -> Result<()> {
        let path = self.resolve(id)?;
        let _guard = self.lock.write();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn gc(&self, max_lifetime: Duration) -> Result<()> {
        let Some(cutoff) = SystemTime::now().checked_sub(max_lifetime) else {
            return Ok(());
        };

        let _guard = self.lock.write();
        let mut removed = 0usize;

        for entry in WalkDir::new(&self.dir).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let modified = entry
                .metadata()
                .map_err(std::io::Error::from)?
                .modified()?;
            if modified < cutoff {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(count = removed, dir = %self.dir.display(), "Removed expired session files");
        }
        Ok(())
    }
}
