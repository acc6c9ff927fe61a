use crate::error::{GalleryError, Result};
use crate::model::{Gallery, GalleryPatch, Photo, PhotoId, PhotoPatch};
use async_trait::async_trait;
use std::sync::Arc;

/// Point reads and single-record writes over galleries and photos.
///
/// Every method touches at most one record (the bulk photo delete and the
/// rename are the only set-wise statements). Nothing here knows about the
/// chain; keeping the links consistent is the job of `ChainMaintainer`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_galleries(&self) -> Result<Vec<Gallery>>;

    async fn find_gallery(&self, name: &str) -> Result<Option<Gallery>>;

    /// Fails with `DuplicateKey` when the name is taken.
    async fn insert_gallery(&self, gallery: &Gallery) -> Result<()>;

    /// Fails with `NotFound` when the gallery does not exist.
    async fn update_gallery(&self, name: &str, patch: &GalleryPatch) -> Result<()>;

    /// Renames the gallery record only; member photos are updated by the caller.
    async fn rename_gallery(&self, name: &str, new_name: &str) -> Result<()>;

    async fn delete_gallery(&self, name: &str) -> Result<()>;

    async fn find_photo(&self, id: &PhotoId) -> Result<Option<Photo>>;

    /// Photos whose `gallery` field equals `gallery`, in storage order.
    async fn list_photos(&self, gallery: &str) -> Result<Vec<Photo>>;

    async fn count_photos(&self, gallery: &str) -> Result<usize>;

    async fn insert_photo(&self, photo: &Photo) -> Result<()>;

    /// Fails with `NotFound` when the photo does not exist.
    async fn update_photo(&self, id: &PhotoId, patch: &PhotoPatch) -> Result<()>;

    async fn delete_photo(&self, id: &PhotoId) -> Result<()>;

    /// Deletes every photo record of a gallery, returning how many went.
    async fn delete_photos_in_gallery(&self, gallery: &str) -> Result<usize>;

    async fn get_gallery(&self, name: &str) -> Result<Gallery> {
        self.find_gallery(name)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("gallery {}", name)))
    }

    async fn get_photo(&self, id: &PhotoId) -> Result<Photo> {
        self.find_photo(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("photo {}", id)))
    }
}

pub type DynRecordStore = Arc<dyn RecordStore>;
