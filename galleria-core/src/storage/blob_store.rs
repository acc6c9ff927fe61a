use crate::error::{GalleryError, Result};
use crate::model::BlobId;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use ulid::Ulid;

/// Opaque byte store for the image variants of a photo.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, data: Bytes, content_type: &str) -> Result<BlobId>;

    /// Returns the bytes and their content type, or `NotFound`.
    async fn get(&self, id: &BlobId) -> Result<(Bytes, String)>;

    /// Deleting an absent blob is not an error.
    async fn delete(&self, id: &BlobId) -> Result<()>;
}

pub type DynBlobStore = Arc<dyn BlobStore>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlobSidecar {
    content_type: String,
    size: u64,
    sha256: String,
}

/// Filesystem blob store.
/// Blobs live at blobs/{id[..2]}/{id} next to a {id}.json sidecar.
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(base_path.join("blobs"))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    pub fn exists(&self, id: &BlobId) -> bool {
        self.blob_path(id).exists()
    }

    fn blob_dir(&self, id: &BlobId) -> PathBuf {
        let id = id.as_str();
        let prefix = &id[..2.min(id.len())];
        self.base_path.join("blobs").join(prefix)
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.blob_dir(id).join(id.as_str())
    }

    fn sidecar_path(&self, id: &BlobId) -> PathBuf {
        self.blob_dir(id).join(format!("{}.json", id.as_str()))
    }

    /// Writes to a uniquely named temp file, then renames into place.
    async fn write_atomic(&self, path: &PathBuf, data: &[u8]) -> Result<()> {
        let temp_path = path.with_extension(format!("tmp-{}", Ulid::new()));
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, data: Bytes, content_type: &str) -> Result<BlobId> {
        let id = BlobId::generate();
        fs::create_dir_all(self.blob_dir(&id)).await?;

        let sidecar = BlobSidecar {
            content_type: content_type.to_string(),
            size: data.len() as u64,
            sha256: compute_hash(&data),
        };

        self.write_atomic(&self.blob_path(&id), &data).await?;
        self.write_atomic(&self.sidecar_path(&id), &serde_json::to_vec(&sidecar)?)
            .await?;

        tracing::debug!("Stored blob {} ({} bytes, {})", id, sidecar.size, content_type);
        Ok(id)
    }

    async fn get(&self, id: &BlobId) -> Result<(Bytes, String)> {
        let blob_path = self.blob_path(id);
        let sidecar_path = self.sidecar_path(id);

        if !blob_path.exists() || !sidecar_path.exists() {
            return Err(GalleryError::NotFound(format!("blob {}", id)));
        }

        let sidecar: BlobSidecar = serde_json::from_slice(&fs::read(&sidecar_path).await?)?;
        let data = fs::read(&blob_path).await?;
        verify_hash(&data, &sidecar.sha256)?;

        Ok((Bytes::from(data), sidecar.content_type))
    }

    async fn delete(&self, id: &BlobId) -> Result<()> {
        for path in [self.blob_path(id), self.sidecar_path(id)] {
            if path.exists() {
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

/// Compute SHA256 hash of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verify that data matches the expected hash
pub fn verify_hash(data: &[u8], expected_hash: &str) -> Result<()> {
    let actual_hash = compute_hash(data);
    if actual_hash != expected_hash {
        return Err(GalleryError::Storage(format!(
            "blob hash mismatch: expected {}, got {}",
            expected_hash, actual_hash
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blob_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(temp_dir.path().to_path_buf()).unwrap();

        let data = Bytes::from("not really a jpeg");
        let id = store.put(data.clone(), "image/jpeg").await.unwrap();
        assert!(store.exists(&id));

        let (retrieved, content_type) = store.get(&id).await.unwrap();
        assert_eq!(retrieved, data);
        assert_eq!(content_type, "image/jpeg");

        store.delete(&id).await.unwrap();
        assert!(!store.exists(&id));
        assert!(matches!(
            store.get(&id).await,
            Err(GalleryError::NotFound(_))
        ));

        // deleting twice is fine
        store.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupted_blob_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(temp_dir.path().to_path_buf()).unwrap();

        let id = store
            .put(Bytes::from_static(b"original bytes"), "image/png")
            .await
            .unwrap();
        std::fs::write(store.blob_path(&id), b"tampered bytes").unwrap();

        let err = store.get(&id).await.unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_concurrent_puts_get_distinct_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsBlobStore::new(temp_dir.path().to_path_buf()).unwrap());

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(Bytes::from(vec![i; 64]), "image/png").await
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap());
        }
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_compute_hash() {
        let data = b"hello world";
        let hash = compute_hash(data);
        assert_eq!(hash.len(), 64); // SHA256 hex string is 64 chars
    }
}
