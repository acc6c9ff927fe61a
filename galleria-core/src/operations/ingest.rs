use crate::error::{GalleryError, Result};
use crate::model::{BlobId, DEFAULT_PHOTO_TITLE, Photo, PhotoId, Quality};
use crate::storage::{BlobStore, DynBlobStore};
use crate::transcode::{DERIVED_CONTENT_TYPE, DynTranscoder, sniff_content_type};
use bytes::Bytes;
use chrono::Utc;

/// Upload fields shared by the photo-creating operations.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub data: Bytes,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Turns an upload into an unlinked, not yet persisted `Photo` whose three
/// variants are already in the blob store.
#[derive(Clone)]
pub(crate) struct PhotoIngest {
    blobs: DynBlobStore,
    transcoder: DynTranscoder,
}

impl PhotoIngest {
    pub(crate) fn new(blobs: DynBlobStore, transcoder: DynTranscoder) -> Self {
        Self { blobs, transcoder }
    }

    /// Rejects anything that is not a recognised image before touching storage.
    pub(crate) fn validate(upload: &PhotoUpload) -> Result<&'static str> {
        if upload.data.is_empty() {
            return Err(GalleryError::InvalidFormat("upload is empty".to_string()));
        }
        sniff_content_type(&upload.data)
    }

    pub(crate) async fn prepare(&self, gallery: &str, upload: PhotoUpload) -> Result<Photo> {
        let content_type = Self::validate(&upload)?;
        let PhotoUpload {
            data,
            title,
            description,
        } = upload;

        let (large, thumbnail) = tokio::join!(
            self.transcoder.transcode(data.clone(), Quality::Large),
            self.transcoder.transcode(data.clone(), Quality::Thumbnail),
        );

        let original = self.blobs.put(data, content_type).await?;
        let mut stored = vec![original.clone()];

        let large = match self.store_variant(large, Quality::Large).await {
            Ok(id) => id,
            Err(error) => {
                discard_blobs(self.blobs.as_ref(), stored.iter()).await;
                return Err(error);
            }
        };
        stored.extend(large.iter().cloned());

        let thumbnail = match self.store_variant(thumbnail, Quality::Thumbnail).await {
            Ok(id) => id,
            Err(error) => {
                discard_blobs(self.blobs.as_ref(), stored.iter()).await;
                return Err(error);
            }
        };

        Ok(Photo {
            id: PhotoId::generate(),
            gallery: gallery.to_string(),
            prev: None,
            next: None,
            title: title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PHOTO_TITLE.to_string()),
            description: description.unwrap_or_default(),
            thumbnail,
            large,
            original: Some(original),
            created_at: Utc::now(),
        })
    }

    /// A failed transcode is recorded as a missing variant; a failed put is not.
    async fn store_variant(
        &self,
        transcoded: Result<Bytes>,
        quality: Quality,
    ) -> Result<Option<BlobId>> {
        match transcoded {
            Ok(bytes) => Ok(Some(self.blobs.put(bytes, DERIVED_CONTENT_TYPE).await?)),
            Err(error) => {
                tracing::warn!("Failed to transcode {} variant: {}", quality, error);
                Ok(None)
            }
        }
    }
}

/// Best-effort delete; failures are logged and swallowed.
pub(crate) async fn discard_blobs<'a>(
    blobs: &dyn BlobStore,
    ids: impl Iterator<Item = &'a BlobId>,
) {
    for id in ids {
        if let Err(error) = blobs.delete(id).await {
            tracing::warn!("Failed to delete blob {}: {}", id, error);
        }
    }
}
