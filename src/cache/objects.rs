//! On-disk store for cached response bytes.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Distinguishes temp files of concurrent writers for the same key.
static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Raw response bytes stored as one file per fingerprint.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    dir: PathBuf,
}

impl ObjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the bytes for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Create the cache directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    pub async fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(key)).await
    }

    /// Write `bytes` for `key`, replacing any previous object.
    ///
    /// Data goes to a temp file first and is renamed into place, so readers
    /// never observe a partially written object.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let seq = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp = self.dir.join(format!("tmp_{key}_{}_{seq}", std::process::id()));

        let result: io::Result<()> = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            drop(file);
            fs::rename(&temp, self.path_for(key)).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        result
    }
}
