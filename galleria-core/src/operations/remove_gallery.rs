use crate::error::{GalleryError, Result};
use crate::storage::DynRecordStore;

/// Deletes an empty gallery.
#[derive(Clone)]
pub struct RemoveGalleryOperation {
    records: DynRecordStore,
}

#[derive(Debug, Clone)]
pub struct RemoveGalleryOperationRequest {
    pub name: String,
}

impl RemoveGalleryOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub async fn run(&self, request: RemoveGalleryOperationRequest) -> Result<()> {
        let gallery = self.records.get_gallery(&request.name).await?;
        let count = self.records.count_photos(&gallery.name).await?;

        if !gallery.is_empty() || count > 0 {
            return Err(GalleryError::PreconditionFailed(format!(
                "gallery {} still holds {} photos",
                gallery.name, count
            )));
        }

        self.records.delete_gallery(&gallery.name).await?;
        tracing::info!("Removed gallery {}", gallery.name);
        Ok(())
    }
}
