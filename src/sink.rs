//! File sink for streamed download bodies
//!
//! A [`FileSink`] owns one writable file for the life of a single fetch
//! session. It is opened in truncate mode at session construction and only
//! ever appended to afterwards. `close` consumes the sink, so the session's
//! single close call is the only close call the type system permits.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Append-only wrapper around a single destination file
#[derive(Debug)]
pub struct FileSink {
    /// The open destination file
    file: File,
    /// Destination path, kept for diagnostics
    path: PathBuf,
}

impl FileSink {
    /// Open the destination file, truncating any prior content.
    ///
    /// Fails with [`Error::SinkOpen`] naming the path if the file cannot be
    /// created; no session may be constructed without a successfully opened
    /// sink.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await.map_err(|source| Error::SinkOpen {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "sink opened");
        Ok(Self { file, path })
    }

    /// Destination path this sink writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one body fragment, returning the number of bytes persisted.
    ///
    /// Issues a single write call, so the returned count may be short of
    /// `data.len()`; the session treats any shortfall as a write failure.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let n = self.file.write(data).await?;
        Ok(n)
    }

    /// Flush and close the sink, consuming it.
    pub async fn close(mut self) -> Result<()> {
        self.file.flush().await?;
        debug!(path = %self.path.display(), "sink closed");
        Ok(())
    }
}
