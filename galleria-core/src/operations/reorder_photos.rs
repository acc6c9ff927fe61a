use crate::chain::WriteSet;
use crate::error::{GalleryError, Result};
use crate::model::{GalleryPatch, PhotoId, PhotoPatch};
use crate::storage::DynRecordStore;
use std::collections::HashSet;

/// Replaces a gallery's whole order. The new order must be a permutation of
/// the gallery's current photos.
#[derive(Clone)]
pub struct ReorderPhotosOperation {
    records: DynRecordStore,
}

#[derive(Debug, Clone)]
pub struct ReorderPhotosOperationRequest {
    pub gallery: String,
    pub order: Vec<PhotoId>,
}

#[derive(Debug, Clone)]
pub struct ReorderPhotosOperationResult {
    pub gallery: String,
    pub order: Vec<PhotoId>,
}

impl ReorderPhotosOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub async fn run(
        &self,
        request: ReorderPhotosOperationRequest,
    ) -> Result<ReorderPhotosOperationResult> {
        let ReorderPhotosOperationRequest { gallery, order } = request;

        let gallery = self.records.get_gallery(&gallery).await?;
        let members = self.records.list_photos(&gallery.name).await?;

        if order.len() != members.len() {
            return Err(GalleryError::InvalidArgument(format!(
                "order lists {} photos but gallery {} holds {}",
                order.len(),
                gallery.name,
                members.len()
            )));
        }

        let member_ids: HashSet<&PhotoId> = members.iter().map(|photo| &photo.id).collect();
        let mut seen = HashSet::new();
        for id in &order {
            if !member_ids.contains(id) {
                return Err(GalleryError::InvalidArgument(format!(
                    "photo {} is not in gallery {}",
                    id, gallery.name
                )));
            }
            if !seen.insert(id) {
                return Err(GalleryError::InvalidArgument(format!(
                    "photo {} is listed twice",
                    id
                )));
            }
        }

        let mut writes = WriteSet::new();
        for (position, id) in order.iter().enumerate() {
            let prev = position
                .checked_sub(1)
                .and_then(|before| order.get(before))
                .cloned();
            let next = order.get(position + 1).cloned();
            writes.photo(id, PhotoPatch::links(prev, next));
        }
        writes.gallery(
            &gallery.name,
            GalleryPatch::ends(order.first().cloned(), order.last().cloned()),
        );
        writes.apply(self.records.as_ref()).await?;

        tracing::info!("Reordered {} photos of {}", order.len(), gallery.name);
        Ok(ReorderPhotosOperationResult {
            gallery: gallery.name,
            order,
        })
    }
}
