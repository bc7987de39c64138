use crate::error::{CommonError, CommonResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File system abstraction for page reads/writes and testing
pub trait FileSystem {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8
    fn read_to_string(&self, path: &Path) -> CommonResult<String>;

    /// Write a whole file, replacing any previous content
    fn write(&self, path: &Path, contents: &str) -> CommonResult<()>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> CommonResult<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// In-memory file system for testing
pub struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), contents.into());
        }
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> CommonResult<String> {
        let files = self
            .files
            .lock()
            .map_err(|_| CommonError::Poisoned)?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| CommonError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, contents: &str) -> CommonResult<()> {
        self.add_file(path.to_path_buf(), contents);
        Ok(())
    }
}
