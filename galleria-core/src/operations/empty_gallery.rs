use super::ingest::discard_blobs;
use crate::error::Result;
use crate::model::GalleryPatch;
use crate::storage::{DynBlobStore, DynRecordStore};

/// Deletes every photo of a gallery in one pass and resets its ends.
#[derive(Clone)]
pub struct EmptyGalleryOperation {
    records: DynRecordStore,
    blobs: DynBlobStore,
}

#[derive(Debug, Clone)]
pub struct EmptyGalleryOperationRequest {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EmptyGalleryOperationResult {
    pub removed: usize,
}

impl EmptyGalleryOperation {
    pub fn new(records: DynRecordStore, blobs: DynBlobStore) -> Self {
        Self { records, blobs }
    }

    pub async fn run(
        &self,
        request: EmptyGalleryOperationRequest,
    ) -> Result<EmptyGalleryOperationResult> {
        let gallery = self.records.get_gallery(&request.name).await?;
        let photos = self.records.list_photos(&gallery.name).await?;

        let removed = self.records.delete_photos_in_gallery(&gallery.name).await?;
        discard_blobs(
            self.blobs.as_ref(),
            photos.iter().flat_map(|photo| photo.blob_ids()),
        )
        .await;
        self.records
            .update_gallery(&gallery.name, &GalleryPatch::ends(None, None))
            .await?;

        tracing::info!("Emptied gallery {}: {} photos removed", gallery.name, removed);
        Ok(EmptyGalleryOperationResult { removed })
    }
}
