use super::create_gallery::validate_gallery_name;
use crate::chain::WriteSet;
use crate::error::{GalleryError, Result};
use crate::model::{Gallery, PhotoPatch};
use crate::storage::DynRecordStore;

/// Renames a gallery and re-points every member photo at the new name.
#[derive(Clone)]
pub struct RenameGalleryOperation {
    records: DynRecordStore,
}

#[derive(Debug, Clone)]
pub struct RenameGalleryOperationRequest {
    pub name: String,
    pub new_name: String,
}

#[derive(Debug, Clone)]
pub struct RenameGalleryOperationResult {
    pub gallery: Gallery,
    pub photos_updated: usize,
}

impl RenameGalleryOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub async fn run(
        &self,
        request: RenameGalleryOperationRequest,
    ) -> Result<RenameGalleryOperationResult> {
        let RenameGalleryOperationRequest { name, new_name } = request;
        validate_gallery_name(&new_name)?;

        let gallery = self.records.get_gallery(&name).await?;
        if new_name == name {
            return Ok(RenameGalleryOperationResult {
                gallery,
                photos_updated: 0,
            });
        }
        if self.records.find_gallery(&new_name).await?.is_some() {
            return Err(GalleryError::DuplicateKey(format!(
                "gallery {} already exists",
                new_name
            )));
        }

        let members = self.records.list_photos(&name).await?;
        self.records.rename_gallery(&name, &new_name).await?;

        let mut writes = WriteSet::new();
        for photo in &members {
            writes.photo(
                &photo.id,
                PhotoPatch {
                    gallery: Some(new_name.clone()),
                    ..PhotoPatch::default()
                },
            );
        }
        writes.apply(self.records.as_ref()).await?;

        tracing::info!(
            "Renamed gallery {} to {} ({} photos)",
            name,
            new_name,
            members.len()
        );
        Ok(RenameGalleryOperationResult {
            gallery: self.records.get_gallery(&new_name).await?,
            photos_updated: members.len(),
        })
    }
}
