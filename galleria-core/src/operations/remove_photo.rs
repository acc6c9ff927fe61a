use super::ingest::discard_blobs;
use crate::chain::ChainMaintainer;
use crate::error::Result;
use crate::model::{Photo, PhotoId};
use crate::storage::{DynBlobStore, DynRecordStore};

#[derive(Clone)]
pub struct RemovePhotoOperation {
    records: DynRecordStore,
    blobs: DynBlobStore,
    chain: ChainMaintainer,
}

#[derive(Debug, Clone)]
pub struct RemovePhotoOperationRequest {
    pub photo_id: PhotoId,
}

#[derive(Debug, Clone)]
pub struct RemovePhotoOperationResult {
    pub photo: Photo,
}

impl RemovePhotoOperation {
    pub fn new(records: DynRecordStore, blobs: DynBlobStore) -> Self {
        Self {
            chain: ChainMaintainer::new(records.clone()),
            records,
            blobs,
        }
    }

    pub async fn run(
        &self,
        request: RemovePhotoOperationRequest,
    ) -> Result<RemovePhotoOperationResult> {
        let photo = self.records.get_photo(&request.photo_id).await?;

        self.chain.unlink(&photo).await?;
        discard_blobs(self.blobs.as_ref(), photo.blob_ids()).await;
        self.records.delete_photo(&photo.id).await?;

        tracing::info!("Removed photo {} from {}", photo.id, photo.gallery);
        Ok(RemovePhotoOperationResult { photo })
    }
}
