use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::fs;
use uuid::Uuid;

/// Durable storage for uploaded file content. The root directory is injected
/// at construction so tests can point it at a scratch location; nothing else
/// in the process touches the uploads directory.
#[derive(Clone, Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Server-generated disk name: a fresh UUID plus the original extension
    /// when it is plain ASCII. Client-controlled names never reach the
    /// filesystem.
    pub fn storage_name(original: &str) -> String {
        let ext = Path::new(original)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() <= 16 && e.chars().all(|c| c.is_ascii_alphanumeric()));
        match ext {
            Some(ext) => format!("{}.{}", Uuid::new_v4().simple(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().simple().to_string(),
        }
    }

    fn path_of(&self, storage_name: &str) -> PathBuf {
        self.root.join(storage_name)
    }

    pub async fn save(&self, storage_name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::write(self.path_of(storage_name), bytes).await
    }

    pub async fn read(&self, storage_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(storage_name)).await
    }

    pub async fn remove(&self, storage_name: &str) -> io::Result<()> {
        fs::remove_file(self.path_of(storage_name)).await
    }
}
