use super::inspect::{ChainIssue, ChainReport, walk};
use super::writes::WriteSet;
use crate::error::{GalleryError, Result};
use crate::model::{Gallery, GalleryPatch, Photo, PhotoId, PhotoPatch};
use crate::storage::DynRecordStore;
use serde::Serialize;
use std::collections::HashMap;

/// Logs an invariant violation and returns it as an error.
pub(crate) fn violation(message: String) -> GalleryError {
    tracing::error!("Chain invariant violated: {}", message);
    GalleryError::InvariantViolation(message)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    pub gallery: String,
    pub order: Vec<PhotoId>,
    /// Number of records written.
    pub rewritten: usize,
    /// Findings from before the repair.
    pub issues: Vec<ChainIssue>,
}

/// Keeps each gallery's photo chain consistent across structural changes.
///
/// Every mutation is expressed as a [`WriteSet`] whose writes are issued
/// concurrently; a failed write is reported after the others have finished.
#[derive(Clone)]
pub struct ChainMaintainer {
    records: DynRecordStore,
}

impl ChainMaintainer {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &DynRecordStore {
        &self.records
    }

    /// Appends an unlinked `photo` to the tail of the gallery named by its
    /// `gallery` field. The photo's own links are written as well.
    pub async fn link_after(&self, photo: &Photo) -> Result<()> {
        let writes = self.link_after_writes(photo).await?;
        writes.apply(self.records.as_ref()).await?;

        tracing::debug!("Linked photo {} at the tail of {}", photo.id, photo.gallery);
        Ok(())
    }

    pub async fn link_after_writes(&self, photo: &Photo) -> Result<WriteSet> {
        let gallery = self.records.get_gallery(&photo.gallery).await?;
        let mut writes = WriteSet::new();

        match (&gallery.head, &gallery.tail) {
            (None, None) => {
                writes
                    .photo(&photo.id, PhotoPatch::links(None, None))
                    .gallery(
                        &gallery.name,
                        GalleryPatch::ends(Some(photo.id.clone()), Some(photo.id.clone())),
                    );
            }
            (Some(_), Some(tail)) => {
                if tail == &photo.id {
                    return Err(violation(format!(
                        "photo {} is already the tail of {}",
                        photo.id, gallery.name
                    )));
                }

                let old_tail = self.records.find_photo(tail).await?.ok_or_else(|| {
                    violation(format!(
                        "tail {} of gallery {} does not exist",
                        tail, gallery.name
                    ))
                })?;
                if old_tail.gallery != gallery.name {
                    return Err(violation(format!(
                        "tail {} of gallery {} belongs to {}",
                        tail, gallery.name, old_tail.gallery
                    )));
                }
                if old_tail.next.is_some() {
                    tracing::warn!(
                        "Tail {} of {} had a successor; it will be overwritten",
                        tail,
                        gallery.name
                    );
                }

                writes
                    .photo(tail, PhotoPatch::next(Some(photo.id.clone())))
                    .photo(&photo.id, PhotoPatch::links(Some(tail.clone()), None))
                    .gallery(&gallery.name, GalleryPatch::tail(Some(photo.id.clone())));
            }
            (head, tail) => {
                return Err(violation(format!(
                    "gallery {} has head {:?} but tail {:?}",
                    gallery.name, head, tail
                )));
            }
        }

        Ok(writes)
    }

    /// The writes that splice `photo` out of its chain. The photo's own
    /// `prev`/`next` are left for the caller to clear or repurpose.
    pub fn unlink_writes(photo: &Photo) -> WriteSet {
        let mut writes = WriteSet::new();

        match &photo.prev {
            Some(prev) => writes.photo(prev, PhotoPatch::next(photo.next.clone())),
            None => writes.gallery(&photo.gallery, GalleryPatch::head(photo.next.clone())),
        };
        match &photo.next {
            Some(next) => writes.photo(next, PhotoPatch::prev(photo.prev.clone())),
            None => writes.gallery(&photo.gallery, GalleryPatch::tail(photo.prev.clone())),
        };

        writes
    }

    pub async fn unlink(&self, photo: &Photo) -> Result<()> {
        Self::unlink_writes(photo)
            .apply(self.records.as_ref())
            .await?;

        tracing::debug!("Unlinked photo {} from {}", photo.id, photo.gallery);
        Ok(())
    }

    /// Walks the chain and returns photos head to tail. Any inconsistency
    /// fails the call rather than producing a partial order.
    pub async fn ordered(&self, gallery: &Gallery) -> Result<Vec<Photo>> {
        let members = self.records.list_photos(&gallery.name).await?;
        let report = walk(gallery, &members);

        if let Some(issue) = report.issues.first() {
            return Err(violation(format!("gallery {}: {}", gallery.name, issue)));
        }

        let mut by_id: HashMap<PhotoId, Photo> = members
            .into_iter()
            .map(|photo| (photo.id.clone(), photo))
            .collect();
        Ok(report
            .order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect())
    }

    /// The photo `index` steps from head, read one record at a time.
    pub async fn photo_at(&self, gallery: &Gallery, index: usize) -> Result<Photo> {
        let mut cursor = gallery.head.clone();
        let mut position = 0;

        while let Some(id) = cursor {
            let photo = self.member(gallery, &id).await?;
            if position == index {
                return Ok(photo);
            }
            position += 1;
            cursor = photo.next;
        }

        Err(violation(format!(
            "chain of {} ended after {} photos, index {} expected",
            gallery.name, position, index
        )))
    }

    /// 0-based position of `photo`, walking from head.
    pub async fn position_of(&self, photo: &Photo) -> Result<usize> {
        let gallery = self.records.get_gallery(&photo.gallery).await?;
        let count = self.records.count_photos(&gallery.name).await?;
        let mut cursor = gallery.head.clone();
        let mut position = 0;

        while let Some(id) = cursor {
            if id == photo.id {
                return Ok(position);
            }
            if position >= count {
                return Err(violation(format!(
                    "chain of {} is longer than its {} photos",
                    gallery.name, count
                )));
            }
            position += 1;
            cursor = self.member(&gallery, &id).await?.next;
        }

        Err(violation(format!(
            "photo {} is not reachable from the head of {}",
            photo.id, gallery.name
        )))
    }

    async fn member(&self, gallery: &Gallery, id: &PhotoId) -> Result<Photo> {
        let photo = self.records.find_photo(id).await?.ok_or_else(|| {
            violation(format!("chain of {} points to missing photo {}", gallery.name, id))
        })?;
        if photo.gallery != gallery.name {
            return Err(violation(format!(
                "chain of {} points to photo {} of {}",
                gallery.name, id, photo.gallery
            )));
        }
        Ok(photo)
    }

    /// Verifies one gallery's chain without changing anything.
    pub async fn check(&self, name: &str) -> Result<ChainReport> {
        let gallery = self.records.get_gallery(name).await?;
        let members = self.records.list_photos(name).await?;
        let mut report = walk(&gallery, &members);

        // a pointer to a non-member may name a photo of another gallery
        for issue in report.issues.iter_mut() {
            if let ChainIssue::MissingPhoto { from, id } = issue {
                if let Some(photo) = self.records.find_photo(id).await? {
                    *issue = ChainIssue::ForeignPhoto {
                        from: from.clone(),
                        id: id.clone(),
                        gallery: photo.gallery,
                    };
                }
            }
        }

        Ok(report)
    }

    /// Rebuilds a gallery's chain: the sound prefix reachable from head is
    /// kept, every unreachable member is appended in storage order, and only
    /// the links that differ from the rebuilt order are rewritten.
    pub async fn repair(&self, name: &str) -> Result<RepairOutcome> {
        let report = self.check(name).await?;
        let gallery = self.records.get_gallery(name).await?;
        let members = self.records.list_photos(name).await?;
        let by_id: HashMap<&PhotoId, &Photo> =
            members.iter().map(|photo| (&photo.id, photo)).collect();

        let order: Vec<PhotoId> = report
            .order
            .iter()
            .chain(report.unreachable.iter())
            .filter(|id| by_id.contains_key(id))
            .cloned()
            .collect();

        let mut writes = WriteSet::new();
        for (position, id) in order.iter().enumerate() {
            let Some(photo) = by_id.get(id) else {
                continue;
            };
            let prev = position
                .checked_sub(1)
                .and_then(|before| order.get(before))
                .cloned();
            let next = order.get(position + 1).cloned();

            if photo.prev != prev {
                writes.photo(id, PhotoPatch::prev(prev));
            }
            if photo.next != next {
                writes.photo(id, PhotoPatch::next(next));
            }
        }

        let head = order.first().cloned();
        let tail = order.last().cloned();
        if gallery.head != head {
            writes.gallery(name, GalleryPatch::head(head));
        }
        if gallery.tail != tail {
            writes.gallery(name, GalleryPatch::tail(tail));
        }

        let rewritten = writes.len();
        writes.apply(self.records.as_ref()).await?;

        if rewritten > 0 {
            tracing::info!(
                "Repaired chain of {}: {} issues, {} records rewritten",
                name,
                report.issues.len(),
                rewritten
            );
        }

        Ok(RepairOutcome {
            gallery: name.to_string(),
            order,
            rewritten,
            issues: report.issues,
        })
    }
}
