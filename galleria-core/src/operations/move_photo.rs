use crate::chain::ChainMaintainer;
use crate::error::Result;
use crate::model::{Photo, PhotoId, PhotoPatch};
use crate::storage::DynRecordStore;

/// Moves a photo to the tail of another gallery. Moving within the same
/// gallery sends it to the tail.
#[derive(Clone)]
pub struct MovePhotoOperation {
    records: DynRecordStore,
    chain: ChainMaintainer,
}

#[derive(Debug, Clone)]
pub struct MovePhotoOperationRequest {
    pub photo_id: PhotoId,
    pub gallery: String,
}

#[derive(Debug, Clone)]
pub struct MovePhotoOperationResult {
    pub photo: Photo,
    pub from_gallery: String,
}

impl MovePhotoOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self {
            chain: ChainMaintainer::new(records.clone()),
            records,
        }
    }

    pub async fn run(&self, request: MovePhotoOperationRequest) -> Result<MovePhotoOperationResult> {
        let MovePhotoOperationRequest { photo_id, gallery } = request;

        let photo = self.records.get_photo(&photo_id).await?;
        let target = self.records.get_gallery(&gallery).await?;
        let from_gallery = photo.gallery.clone();

        self.chain.unlink(&photo).await?;

        let patch = PhotoPatch {
            gallery: Some(target.name.clone()),
            prev: Some(None),
            next: Some(None),
            ..PhotoPatch::default()
        };
        self.records.update_photo(&photo.id, &patch).await?;

        let mut moved = photo;
        patch.apply(&mut moved);
        self.chain.link_after(&moved).await?;

        let photo = self.records.get_photo(&moved.id).await?;
        tracing::info!(
            "Moved photo {} from {} to {}",
            photo.id,
            from_gallery,
            photo.gallery
        );
        Ok(MovePhotoOperationResult {
            photo,
            from_gallery,
        })
    }
}
