use crate::chain::ChainMaintainer;
use crate::error::Result;
use crate::model::{Photo, Quality};
use crate::storage::{DynBlobStore, DynRecordStore};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

#[derive(Clone)]
pub struct ListPhotosOperation {
    records: DynRecordStore,
    blobs: DynBlobStore,
    chain: ChainMaintainer,
}

#[derive(Debug, Clone)]
pub struct ListPhotosOperationRequest {
    pub gallery: String,
    /// Walk the chain instead of returning storage order.
    pub sorted: bool,
    /// Embed this variant of every photo as a data URL.
    pub quality: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPhotoItem {
    #[serde(flatten)]
    pub photo: Photo,
    /// 0-based position, present on sorted listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListPhotosOperationResult {
    pub items: Vec<ListPhotoItem>,
}

impl ListPhotosOperation {
    pub fn new(records: DynRecordStore, blobs: DynBlobStore) -> Self {
        Self {
            chain: ChainMaintainer::new(records.clone()),
            records,
            blobs,
        }
    }

    pub async fn run(&self, request: ListPhotosOperationRequest) -> Result<ListPhotosOperationResult> {
        let quality = request.quality.as_deref().map(Quality::parse).transpose()?;
        let gallery = self.records.get_gallery(&request.gallery).await?;

        let mut items: Vec<ListPhotoItem> = if request.sorted {
            self.chain
                .ordered(&gallery)
                .await?
                .into_iter()
                .enumerate()
                .map(|(index, photo)| ListPhotoItem {
                    photo,
                    index: Some(index),
                    data: None,
                })
                .collect()
        } else {
            self.records
                .list_photos(&gallery.name)
                .await?
                .into_iter()
                .map(|photo| ListPhotoItem {
                    photo,
                    index: None,
                    data: None,
                })
                .collect()
        };

        if let Some(quality) = quality {
            for item in &mut items {
                item.data = self.data_url(&item.photo, quality).await?;
            }
        }

        Ok(ListPhotosOperationResult { items })
    }

    /// A variant whose transcode failed has no data.
    async fn data_url(&self, photo: &Photo, quality: Quality) -> Result<Option<String>> {
        let Some(blob) = photo.blob(quality) else {
            return Ok(None);
        };
        let (body, content_type) = self.blobs.get(blob).await?;
        Ok(Some(format!(
            "data:{};base64,{}",
            content_type,
            STANDARD.encode(&body)
        )))
    }
}
