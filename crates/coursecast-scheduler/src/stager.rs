//! Media staging: stream a remote asset to a uniquely named temp file,
//! hand back the handle, delete it after the send attempt.

use std::path::{Path, PathBuf};

use coursecast_core::error::{CastError, Result};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Handle to one staged file. Owned by the cycle step that staged it;
/// released (best-effort) on every exit path.
#[derive(Debug)]
pub struct StagedAsset {
    pub path: PathBuf,
}

pub struct MediaStager {
    client: reqwest::Client,
    dir: PathBuf,
}

impl MediaStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            dir: dir.into(),
        }
    }

    /// Download `source_url` into the staging directory. No internal retry;
    /// a non-success status or an interrupted stream fails the stage.
    pub async fn stage(&self, source_url: &str) -> Result<StagedAsset> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CastError::staging(format!("cannot create staging dir: {e}")))?;

        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| CastError::staging(format!("media download failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CastError::staging(format!(
                "media download returned {} for {source_url}",
                response.status()
            )));
        }

        // uuid prefix keeps concurrent stages of the same asset from colliding.
        let path = self
            .dir
            .join(format!("{}-{}", Uuid::new_v4(), basename(source_url)));

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| CastError::staging(format!("cannot create staged file: {e}")))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    remove_quietly(&path).await;
                    return Err(CastError::staging(format!("media stream interrupted: {e}")));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                remove_quietly(&path).await;
                return Err(CastError::staging(format!("staged write failed: {e}")));
            }
        }
        file.flush()
            .await
            .map_err(|e| CastError::staging(format!("staged flush failed: {e}")))?;

        tracing::debug!(path = %path.display(), "asset staged");
        Ok(StagedAsset { path })
    }

    /// Delete the backing file. Safe on an already-released or missing asset;
    /// failures are logged, never surfaced to the caller.
    pub async fn release(&self, asset: &StagedAsset) {
        match tokio::fs::remove_file(&asset.path).await {
            Ok(()) => tracing::debug!(path = %asset.path.display(), "asset released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %asset.path.display(), "asset already released");
            }
            Err(e) => {
                tracing::warn!(path = %asset.path.display(), error = %e, "asset cleanup failed");
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "partial stage cleanup failed");
        }
    }
}

/// Last path segment of the URL, query stripped, for a readable filename.
fn basename(source_url: &str) -> &str {
    source_url
        .split(['?', '#'])
        .next()
        .and_then(|p| p.rsplit('/').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("asset")
}
