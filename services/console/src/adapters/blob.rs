//! services/console/src/adapters/blob.rs
//!
//! A filesystem implementation of the `BlobStorage` port. Each bucket is a
//! directory under the configured root; public URLs are built from a base URL
//! the hosting web server is expected to serve the root under.

use async_trait::async_trait;
use bytes::Bytes;
use hr_console_core::ports::{BlobStorage, PortError, PortResult};
use std::path::{Component, Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolves `bucket/path` below the root, refusing anything that could escape it.
    fn resolve(&self, bucket: &str, path: &str) -> PortResult<PathBuf> {
        let relative = Path::new(bucket).join(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || bucket.is_empty() || path.is_empty() {
            return Err(PortError::Storage(format!("Invalid object path: {}/{}", bucket, path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for FsBlobStore {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> PortResult<()> {
        let target = self.resolve(bucket, path)?;
        if tokio::fs::try_exists(&target)
            .await
            .map_err(|e| PortError::Storage(e.to_string()))?
        {
            return Err(PortError::Storage("The resource already exists".to_string()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Storage(e.to_string()))?;
        }
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| PortError::Storage(e.to_string()))?;
        info!("Stored {} bytes at {}/{}", data.len(), bucket, path);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, path)
    }
}
