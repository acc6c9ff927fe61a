use super::ingest::{PhotoIngest, PhotoUpload, discard_blobs};
use crate::chain::{ChainMaintainer, WriteSet, violation};
use crate::error::{GalleryError, Result};
use crate::model::{GalleryPatch, Photo, PhotoId, PhotoPatch};
use crate::storage::{DynBlobStore, DynRecordStore};
use crate::transcode::DynTranscoder;

/// Where a new photo goes relative to the existing chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    Before(PhotoId),
    After(PhotoId),
    /// `index` equal to the photo count appends at the tail.
    AtIndex { gallery: String, index: i64 },
}

#[derive(Clone)]
pub struct InsertPhotoOperation {
    records: DynRecordStore,
    blobs: DynBlobStore,
    ingest: PhotoIngest,
    chain: ChainMaintainer,
}

#[derive(Debug, Clone)]
pub struct InsertPhotoOperationRequest {
    pub position: InsertPosition,
    pub upload: PhotoUpload,
}

#[derive(Debug, Clone)]
pub struct InsertPhotoOperationResult {
    pub photo: Photo,
}

/// The resolved slot: the tail of a gallery, or between two links where the
/// missing predecessor means the gallery head.
enum Slot {
    Tail(String),
    Between {
        gallery: String,
        prev: Option<PhotoId>,
        next: PhotoId,
    },
}

impl InsertPhotoOperation {
    pub fn new(records: DynRecordStore, blobs: DynBlobStore, transcoder: DynTranscoder) -> Self {
        Self {
            ingest: PhotoIngest::new(blobs.clone(), transcoder),
            chain: ChainMaintainer::new(records.clone()),
            records,
            blobs,
        }
    }

    pub async fn run(
        &self,
        request: InsertPhotoOperationRequest,
    ) -> Result<InsertPhotoOperationResult> {
        let InsertPhotoOperationRequest { position, upload } = request;

        PhotoIngest::validate(&upload)?;
        let slot = self.resolve(&position).await?;

        let photo = match slot {
            Slot::Tail(gallery) => {
                let photo = self.persist(&gallery, upload, None, None).await?;
                self.chain.link_after(&photo).await?;
                photo
            }
            Slot::Between {
                gallery,
                prev,
                next,
            } => {
                let photo = self
                    .persist(&gallery, upload, prev.clone(), Some(next.clone()))
                    .await?;

                let mut writes = WriteSet::new();
                match &prev {
                    Some(prev) => writes.photo(prev, PhotoPatch::next(Some(photo.id.clone()))),
                    None => writes.gallery(&gallery, GalleryPatch::head(Some(photo.id.clone()))),
                };
                writes.photo(&next, PhotoPatch::prev(Some(photo.id.clone())));
                writes.apply(self.records.as_ref()).await?;
                photo
            }
        };

        let photo = self.records.get_photo(&photo.id).await?;
        tracing::info!(
            "Inserted photo {} into gallery {} ({:?})",
            photo.id,
            photo.gallery,
            position
        );
        Ok(InsertPhotoOperationResult { photo })
    }

    /// Stores the blobs and the record, already carrying its links.
    async fn persist(
        &self,
        gallery: &str,
        upload: PhotoUpload,
        prev: Option<PhotoId>,
        next: Option<PhotoId>,
    ) -> Result<Photo> {
        let mut photo = self.ingest.prepare(gallery, upload).await?;
        photo.prev = prev;
        photo.next = next;

        if let Err(error) = self.records.insert_photo(&photo).await {
            discard_blobs(self.blobs.as_ref(), photo.blob_ids()).await;
            return Err(error);
        }
        Ok(photo)
    }

    async fn resolve(&self, position: &InsertPosition) -> Result<Slot> {
        match position {
            InsertPosition::Before(anchor) => self.before(anchor).await,
            InsertPosition::After(anchor) => {
                let anchor = self.records.get_photo(anchor).await?;
                match anchor.next {
                    None => {
                        self.expect_tail(&anchor).await?;
                        Ok(Slot::Tail(anchor.gallery))
                    }
                    Some(next) => {
                        let successor = self.records.find_photo(&next).await?;
                        if successor.and_then(|photo| photo.prev).as_ref() != Some(&anchor.id) {
                            return Err(violation(format!(
                                "photo {} does not point back to {}",
                                next, anchor.id
                            )));
                        }
                        Ok(Slot::Between {
                            gallery: anchor.gallery,
                            prev: Some(anchor.id),
                            next,
                        })
                    }
                }
            }
            InsertPosition::AtIndex { gallery, index } => {
                let gallery = self.records.get_gallery(gallery).await?;
                let count = self.records.count_photos(&gallery.name).await?;

                if *index < 0 || *index as u64 > count as u64 {
                    return Err(GalleryError::IndexOutOfRange {
                        index: *index,
                        len: count,
                    });
                }
                let index = *index as usize;
                if index == count {
                    return Ok(Slot::Tail(gallery.name));
                }

                let anchor = self.chain.photo_at(&gallery, index).await?;
                self.before(&anchor.id).await
            }
        }
    }

    async fn before(&self, anchor: &PhotoId) -> Result<Slot> {
        let anchor = self.records.get_photo(anchor).await?;
        match &anchor.prev {
            None => {
                let gallery = self.records.get_gallery(&anchor.gallery).await?;
                if gallery.head.as_ref() != Some(&anchor.id) {
                    return Err(violation(format!(
                        "photo {} has no predecessor but is not the head of {}",
                        anchor.id, gallery.name
                    )));
                }
            }
            Some(prev) => {
                let predecessor = self.records.find_photo(prev).await?;
                if predecessor.and_then(|photo| photo.next).as_ref() != Some(&anchor.id) {
                    return Err(violation(format!(
                        "photo {} does not point forward to {}",
                        prev, anchor.id
                    )));
                }
            }
        }

        Ok(Slot::Between {
            gallery: anchor.gallery,
            prev: anchor.prev,
            next: anchor.id,
        })
    }

    async fn expect_tail(&self, anchor: &Photo) -> Result<()> {
        let gallery = self.records.get_gallery(&anchor.gallery).await?;
        if gallery.tail.as_ref() != Some(&anchor.id) {
            return Err(violation(format!(
                "photo {} has no successor but is not the tail of {}",
                anchor.id, gallery.name
            )));
        }
        Ok(())
    }
}
