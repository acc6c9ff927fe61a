//! Edits to the descriptive fields of galleries and photos. These never
//! touch the chain.

use crate::error::{GalleryError, Result};
use crate::model::{Gallery, GalleryPatch, Photo, PhotoId, PhotoPatch};
use crate::storage::DynRecordStore;

#[derive(Clone)]
pub struct UpdateDetailsOperation {
    records: DynRecordStore,
}

#[derive(Debug, Clone)]
pub struct UpdateGalleryDetailsRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct UpdatePhotoDetailsRequest {
    pub photo_id: PhotoId,
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

impl UpdateDetailsOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub async fn update_gallery(&self, request: UpdateGalleryDetailsRequest) -> Result<Gallery> {
        let patch = GalleryPatch {
            description: Some(request.description),
            ..GalleryPatch::default()
        };
        self.records.update_gallery(&request.name, &patch).await?;
        self.records.get_gallery(&request.name).await
    }

    pub async fn update_photo(&self, request: UpdatePhotoDetailsRequest) -> Result<Photo> {
        let UpdatePhotoDetailsRequest {
            photo_id,
            title,
            description,
        } = request;

        if let Some(title) = &title {
            if title.trim().is_empty() {
                return Err(GalleryError::InvalidArgument(
                    "photo title must not be empty".to_string(),
                ));
            }
        }

        let mut photo = self.records.get_photo(&photo_id).await?;
        let patch = PhotoPatch {
            title,
            description: description.map(Option::unwrap_or_default),
            ..PhotoPatch::default()
        };
        self.records.update_photo(&photo_id, &patch).await?;

        patch.apply(&mut photo);
        Ok(photo)
    }
}
