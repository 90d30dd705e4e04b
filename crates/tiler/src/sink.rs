//! Tile persistence boundary.
//!
//! The core hands finished PNG bytes plus a [`TileKey`] to a [`TileSink`]
//! and never touches storage details itself. The provided implementation
//! writes through `object_store`, which covers both local directories and
//! S3-compatible stores.

use async_trait::async_trait;
use bytes::Bytes;
use loss_common::TileKey;
use object_store::{local::LocalFileSystem, path::Path, ObjectStore};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{TilerError, TilerResult};

/// Accepts one encoded tile at a time for durable storage.
#[async_trait]
pub trait TileSink: Send + Sync {
    /// Persist a tile under its `(threshold, z, x, y)` key.
    async fn put_tile(&self, key: &TileKey, data: Bytes) -> TilerResult<()>;
}

/// TileSink writing PNGs through an `object_store` backend at the
/// `<threshold>_<z>/<x>/<y>.png` path convention.
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Sink rooted at a local directory.
    pub fn local(root: &std::path::Path) -> TilerResult<Self> {
        let store = LocalFileSystem::new_with_prefix(root).map_err(|e| TilerError::Storage {
            key: root.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(Arc::new(store)))
    }
}

#[async_trait]
impl TileSink for ObjectStoreSink {
    #[instrument(skip(self, data), fields(key = %key))]
    async fn put_tile(&self, key: &TileKey, data: Bytes) -> TilerResult<()> {
        let location = Path::from(key.storage_path());
        debug!(size = data.len(), "writing tile");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| TilerError::Storage {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}
