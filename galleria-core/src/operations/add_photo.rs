use super::create_gallery::CreateGalleryOperation;
use super::ingest::{PhotoIngest, PhotoUpload, discard_blobs};
use crate::chain::ChainMaintainer;
use crate::error::Result;
use crate::model::Photo;
use crate::storage::{DynBlobStore, DynRecordStore};
use crate::transcode::DynTranscoder;

/// Uploads a photo and appends it to the tail of its gallery, creating the
/// gallery on first use.
#[derive(Clone)]
pub struct AddPhotoOperation {
    records: DynRecordStore,
    blobs: DynBlobStore,
    galleries: CreateGalleryOperation,
    ingest: PhotoIngest,
    chain: ChainMaintainer,
}

#[derive(Debug, Clone)]
pub struct AddPhotoOperationRequest {
    pub gallery: String,
    pub upload: PhotoUpload,
}

#[derive(Debug, Clone)]
pub struct AddPhotoOperationResult {
    pub photo: Photo,
}

impl AddPhotoOperation {
    pub fn new(records: DynRecordStore, blobs: DynBlobStore, transcoder: DynTranscoder) -> Self {
        Self {
            galleries: CreateGalleryOperation::new(records.clone()),
            ingest: PhotoIngest::new(blobs.clone(), transcoder),
            chain: ChainMaintainer::new(records.clone()),
            records,
            blobs,
        }
    }

    pub async fn run(&self, request: AddPhotoOperationRequest) -> Result<AddPhotoOperationResult> {
        let AddPhotoOperationRequest { gallery, upload } = request;

        PhotoIngest::validate(&upload)?;
        let gallery = self.galleries.ensure(&gallery).await?;
        let photo = self.ingest.prepare(&gallery.name, upload).await?;

        if let Err(error) = self.records.insert_photo(&photo).await {
            discard_blobs(self.blobs.as_ref(), photo.blob_ids()).await;
            return Err(error);
        }
        self.chain.link_after(&photo).await?;

        let photo = self.records.get_photo(&photo.id).await?;
        tracing::info!("Added photo {} to gallery {}", photo.id, photo.gallery);
        Ok(AddPhotoOperationResult { photo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GalleryError;
    use crate::testing::{FlakyRecordStore, TestEnv, assert_chain, png_bytes};
    use bytes::Bytes;
    use std::sync::Arc;

    fn upload(title: &str) -> PhotoUpload {
        PhotoUpload {
            data: png_bytes(8, 8),
            title: Some(title.to_string()),
            description: None,
        }
    }

    fn operation(env: &TestEnv) -> AddPhotoOperation {
        AddPhotoOperation::new(
            env.records.clone(),
            env.blobs.clone(),
            env.transcoder.clone(),
        )
    }

    #[tokio::test]
    async fn test_add_photos_append_in_order() {
        let env = TestEnv::new();
        let operation = operation(&env);

        let mut ids = Vec::new();
        for title in ["P1", "P2", "P3"] {
            let result = operation
                .run(AddPhotoOperationRequest {
                    gallery: "g".to_string(),
                    upload: upload(title),
                })
                .await
                .unwrap();
            assert_eq!(result.photo.title, title);
            ids.push(result.photo.id.to_string());
        }

        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        assert_chain(&env.records, "g", &ids).await;
    }

    #[tokio::test]
    async fn test_non_image_upload_creates_nothing() {
        let env = TestEnv::new();
        let err = operation(&env)
            .run(AddPhotoOperationRequest {
                gallery: "g".to_string(),
                upload: PhotoUpload {
                    data: Bytes::from_static(b"hello"),
                    title: None,
                    description: None,
                },
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GalleryError::InvalidFormat(_)));
        assert!(env.records.find_gallery("g").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_tail_write_is_repairable() {
        let env = TestEnv::new();
        env.seed_chain("g", &["a"]).await;
        let flaky = Arc::new(FlakyRecordStore::new(env.records.clone()));
        flaky.fail_gallery_updates("g");

        let err = AddPhotoOperation::new(flaky, env.blobs.clone(), env.transcoder.clone())
            .run(AddPhotoOperationRequest {
                gallery: "g".to_string(),
                upload: upload("late"),
            })
            .await
            .unwrap_err();
        assert!(err.is_storage());

        // the neighbour write landed, the gallery tail did not
        let members = env.records.list_photos("g").await.unwrap();
        assert_eq!(members.len(), 2);
        let added = members[1].id.to_string();
        let a = env.records.get_photo(&members[0].id).await.unwrap();
        assert_eq!(a.next.as_ref().map(|id| id.to_string()), Some(added.clone()));
        assert_eq!(
            env.records.get_gallery("g").await.unwrap().tail,
            Some(a.id.clone())
        );

        ChainMaintainer::new(env.records.clone())
            .repair("g")
            .await
            .unwrap();
        assert_chain(&env.records, "g", &["a", added.as_str()]).await;
    }
}
