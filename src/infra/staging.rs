//! Temporary on-disk staging for upload payloads.
//!
//! Multipart bodies are streamed into a temp file so the size limit is
//! enforced before the payload is ever buffered in full.

use std::error::Error as StdError;
use std::path::PathBuf;

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use tempfile::TempPath;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file exceeds the {limit_bytes} byte limit")]
    TooLarge { limit_bytes: u64 },
    #[error("uploaded file exceeds configured body limit")]
    PayloadTooLarge {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
}

/// Directory that receives in-flight upload bodies.
#[derive(Debug)]
pub struct StagingArea {
    root: Option<PathBuf>,
    max_bytes: u64,
}

impl StagingArea {
    /// Stage under `root`, or the system temp directory when `None`.
    pub fn new(root: Option<PathBuf>, max_bytes: u64) -> Result<Self, std::io::Error> {
        if let Some(root) = root.as_ref() {
            std::fs::create_dir_all(root)?;
        }
        Ok(Self { root, max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Stream `payload` to a fresh temp file.
    ///
    /// The temp file is removed when the returned value is dropped, and
    /// immediately on any error.
    pub async fn stage<S>(&self, payload: S) -> Result<StagedUpload, StagingError>
    where
        S: Stream<Item = Result<Bytes, StagingError>>,
    {
        let mut builder = tempfile::Builder::new();
        builder.prefix("mdconvert-").suffix(".part");
        let named = match self.root.as_ref() {
            Some(root) => builder.tempfile_in(root)?,
            None => builder.tempfile()?,
        };
        let (file, path) = named.into_parts();
        let mut file = fs::File::from_std(file);
        let mut total_bytes: u64 = 0;

        pin_mut!(payload);
        while let Some(chunk) = payload.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }

            total_bytes = total_bytes
                .checked_add(chunk.len() as u64)
                .ok_or(StagingError::SizeOverflow)?;
            if total_bytes > self.max_bytes {
                return Err(StagingError::TooLarge {
                    limit_bytes: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        Ok(StagedUpload { path })
    }
}

/// A fully received upload waiting to be consumed.
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
}

impl StagedUpload {
    /// Read the staged bytes and remove the temp file.
    pub async fn consume(self) -> Result<Vec<u8>, StagingError> {
        let data = fs::read(&*self.path).await?;
        let path = self.path.to_path_buf();
        if let Err(err) = self.path.close() {
            warn!(
                target = "mdconvert::staging",
                path = %path.display(),
                error = %err,
                "failed to remove staged upload"
            );
        }
        Ok(data)
    }
}
