use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Keeps the most recently forwarded message until the engine asks for it.
pub trait LastMessageStore: Send + Sync {
    fn save(&self, message: &str) -> Result<(), StoreError>;
    /// Returns the stored message and forgets it.
    fn take(&self) -> Result<Option<String>, StoreError>;
}

pub struct FileMessageStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileMessageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LastMessageStore for FileMessageStore {
    fn save(&self, message: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        fs::write(&self.path, message).map_err(|err| self.io_error(err))
    }

    fn take(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        let message = match fs::read_to_string(&self.path) {
            Ok(message) => message,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        fs::remove_file(&self.path).map_err(|err| self.io_error(err))?;
        Ok(Some(message))
    }
}
