use rustc_hash::FxHashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::LoadError;

/// Source of progs files, addressed by game-relative path.
pub trait FileSystem {
    /// Whole file contents. Missing and zero-length files are errors.
    fn load_file(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads files below a root directory.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl FileSystem for DiskFileSystem {
    fn load_file(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let bytes = std::fs::read(self.root.join(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_string(),
            },
            _ => LoadError::Io(e),
        })?;
        if bytes.is_empty() {
            return Err(LoadError::EmptyFile {
                path: path.to_string(),
            });
        }
        Ok(bytes)
    }
}

/// In-memory files, for tests and embedded images.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), bytes);
    }

    pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }
}

impl FileSystem for MemoryFileSystem {
    fn load_file(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        match self.files.get(path) {
            None => Err(LoadError::NotFound {
                path: path.to_string(),
            }),
            Some(bytes) if bytes.is_empty() => Err(LoadError::EmptyFile {
                path: path.to_string(),
            }),
            Some(bytes) => Ok(bytes.clone()),
        }
    }
}
