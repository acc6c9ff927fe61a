use crate::error::{GalleryError, Result};
use crate::model::{Photo, PhotoId, Quality};
use crate::storage::{DynBlobStore, DynRecordStore};
use bytes::Bytes;

#[derive(Clone)]
pub struct ReadPhotoOperation {
    records: DynRecordStore,
    blobs: DynBlobStore,
}

#[derive(Debug, Clone)]
pub struct ReadPhotoOperationRequest {
    pub photo_id: PhotoId,
    /// Quality selector as given by the caller; `None` reads the record only.
    pub quality: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PhotoData {
    pub quality: Quality,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ReadPhotoOperationResult {
    pub photo: Photo,
    pub data: Option<PhotoData>,
}

impl ReadPhotoOperation {
    pub fn new(records: DynRecordStore, blobs: DynBlobStore) -> Self {
        Self { records, blobs }
    }

    pub async fn run(&self, request: ReadPhotoOperationRequest) -> Result<ReadPhotoOperationResult> {
        let ReadPhotoOperationRequest { photo_id, quality } = request;

        let quality = quality.as_deref().map(Quality::parse).transpose()?;
        let photo = self.records.get_photo(&photo_id).await?;

        let Some(quality) = quality else {
            return Ok(ReadPhotoOperationResult { photo, data: None });
        };

        let blob = photo.blob(quality).ok_or_else(|| {
            GalleryError::NotFound(format!("{} variant of photo {}", quality, photo.id))
        })?;
        let (body, content_type) = self.blobs.get(blob).await?;

        Ok(ReadPhotoOperationResult {
            data: Some(PhotoData {
                quality,
                content_type,
                body,
            }),
            photo,
        })
    }
}
