//! Session blob persistence.
//!
//! The session is an opaque artifact owned by the bridge side; this module
//! only moves bytes in and out of a store. At most one session is active per
//! process, so every store holds a single blob.

use std::path::PathBuf;

use async_trait::async_trait;
use coursecast_core::error::{CastError, Result};

/// Load/save/clear for the serialized session blob. Format is opaque.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Vec<u8>>>;
    async fn save(&self, blob: &[u8]) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// File-backed store: one blob file under a scoped directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("session.blob"),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, blob: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, blob).await?;
        tracing::debug!(path = %self.path.display(), bytes = blob.len(), "session blob saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Remote key/value store over HTTP: GET/PUT/DELETE on `{base}/{key}`.
pub struct HttpSessionStore {
    client: reqwest::Client,
    url: String,
}

impl HttpSessionStore {
    pub fn new(base_url: &str, key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/{key}", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn load(&self) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CastError::connection(format!("session store load failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CastError::connection(format!(
                "session store load: {}",
                response.status()
            )));
        }
        let blob = response
            .bytes()
            .await
            .map_err(|e| CastError::connection(format!("session store read failed: {e}")))?;
        Ok(Some(blob.to_vec()))
    }

    async fn save(&self, blob: &[u8]) -> Result<()> {
        let response = self
            .client
            .put(&self.url)
            .body(blob.to_vec())
            .send()
            .await
            .map_err(|e| CastError::connection(format!("session store save failed: {e}")))?;
        if !response.status().is_success() {
            return Err(CastError::connection(format!(
                "session store save: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let response = self
            .client
            .delete(&self.url)
            .send()
            .await
            .map_err(|e| CastError::connection(format!("session store clear failed: {e}")))?;
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(CastError::connection(format!(
                "session store clear: {}",
                response.status()
            )));
        }
        Ok(())
    }
}
