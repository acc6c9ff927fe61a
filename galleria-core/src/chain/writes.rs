use crate::error::Result;
use crate::model::{GalleryPatch, PhotoId, PhotoPatch};
use crate::storage::RecordStore;
use futures_util::future::join_all;

#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    Photo { id: PhotoId, patch: PhotoPatch },
    Gallery { name: String, patch: GalleryPatch },
}

impl PendingWrite {
    pub fn target(&self) -> String {
        match self {
            Self::Photo { id, .. } => format!("photo {}", id),
            Self::Gallery { name, .. } => format!("gallery {}", name),
        }
    }
}

/// The record writes one structural operation needs, at most one per record.
///
/// Patches aimed at the same record are merged, so a photo that is both the
/// successor of one moved node and the predecessor of another is written once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    writes: Vec<PendingWrite>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn photo(&mut self, id: &PhotoId, patch: PhotoPatch) -> &mut Self {
        let existing = self.writes.iter_mut().find_map(|write| match write {
            PendingWrite::Photo { id: target, patch } if target == id => Some(patch),
            _ => None,
        });

        match existing {
            Some(current) => current.merge(patch),
            None => self.writes.push(PendingWrite::Photo {
                id: id.clone(),
                patch,
            }),
        }
        self
    }

    pub fn gallery(&mut self, name: &str, patch: GalleryPatch) -> &mut Self {
        let existing = self.writes.iter_mut().find_map(|write| match write {
            PendingWrite::Gallery {
                name: target,
                patch,
            } if target == name => Some(patch),
            _ => None,
        });

        match existing {
            Some(current) => current.merge(patch),
            None => self.writes.push(PendingWrite::Gallery {
                name: name.to_string(),
                patch,
            }),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingWrite> {
        self.writes.iter()
    }

    pub fn photo_patch(&self, id: &PhotoId) -> Option<&PhotoPatch> {
        self.writes.iter().find_map(|write| match write {
            PendingWrite::Photo { id: target, patch } if target == id => Some(patch),
            _ => None,
        })
    }

    pub fn gallery_patch(&self, name: &str) -> Option<&GalleryPatch> {
        self.writes.iter().find_map(|write| match write {
            PendingWrite::Gallery {
                name: target,
                patch,
            } if target == name => Some(patch),
            _ => None,
        })
    }

    /// Issues every write concurrently and resolves once all have finished.
    ///
    /// A failed write does not stop the others. Every failure is logged and
    /// the first one, in issue order, is returned; the caller must assume the
    /// remaining writes may have been applied.
    pub async fn apply(self, store: &dyn RecordStore) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let results = join_all(self.writes.iter().map(|write| async move {
            match write {
                PendingWrite::Photo { id, patch } => store.update_photo(id, patch).await,
                PendingWrite::Gallery { name, patch } => store.update_gallery(name, patch).await,
            }
        }))
        .await;

        let mut first_error = None;
        for (write, result) in self.writes.iter().zip(results) {
            if let Err(error) = result {
                tracing::error!(
                    "Chain write failed, links may be partially applied. target={} error={}",
                    write.target(),
                    error
                );
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
