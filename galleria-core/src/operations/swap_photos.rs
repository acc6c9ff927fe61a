use crate::chain::{WriteSet, violation};
use crate::error::{GalleryError, Result};
use crate::model::{Gallery, GalleryPatch, Photo, PhotoId, PhotoPatch};
use crate::storage::DynRecordStore;

/// Exchanges the positions of two photos of the same gallery.
#[derive(Clone)]
pub struct SwapPhotosOperation {
    records: DynRecordStore,
}

#[derive(Debug, Clone)]
pub struct SwapPhotosOperationRequest {
    pub first: PhotoId,
    pub second: PhotoId,
}

#[derive(Debug, Clone)]
pub struct SwapPhotosOperationResult {
    pub gallery: String,
    /// Records written; zero when both ids are the same photo.
    pub writes: usize,
}

impl SwapPhotosOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub async fn run(
        &self,
        request: SwapPhotosOperationRequest,
    ) -> Result<SwapPhotosOperationResult> {
        let SwapPhotosOperationRequest { first, second } = request;

        let a = self.records.get_photo(&first).await?;
        if first == second {
            return Ok(SwapPhotosOperationResult {
                gallery: a.gallery,
                writes: 0,
            });
        }

        let b = self.records.get_photo(&second).await?;
        if a.gallery != b.gallery {
            return Err(GalleryError::InvalidArgument(format!(
                "photos {} and {} are in different galleries",
                a.id, b.id
            )));
        }

        let gallery = self.records.get_gallery(&a.gallery).await?;
        check_linked(&gallery, &a, &b)?;

        let writes = swap_writes(&gallery, &a, &b);
        let count = writes.len();
        writes.apply(self.records.as_ref()).await?;

        tracing::info!("Swapped photos {} and {} in {}", a.id, b.id, gallery.name);
        Ok(SwapPhotosOperationResult {
            gallery: gallery.name,
            writes: count,
        })
    }
}

/// The links the swap relies on must agree with each other.
fn check_linked(gallery: &Gallery, a: &Photo, b: &Photo) -> Result<()> {
    for photo in [a, b] {
        if photo.prev.is_none() && gallery.head.as_ref() != Some(&photo.id) {
            return Err(violation(format!(
                "photo {} has no predecessor but is not the head of {}",
                photo.id, gallery.name
            )));
        }
        if photo.next.is_none() && gallery.tail.as_ref() != Some(&photo.id) {
            return Err(violation(format!(
                "photo {} has no successor but is not the tail of {}",
                photo.id, gallery.name
            )));
        }
    }

    for (x, y) in [(a, b), (b, a)] {
        if x.next.as_ref() == Some(&y.id) && y.prev.as_ref() != Some(&x.id) {
            return Err(violation(format!(
                "photo {} points to {} but not back",
                x.id, y.id
            )));
        }
    }
    Ok(())
}

fn swap_writes(gallery: &Gallery, a: &Photo, b: &Photo) -> WriteSet {
    let mut writes = WriteSet::new();

    if a.next.as_ref() == Some(&b.id) {
        adjacent(&mut writes, a, b);
    } else if b.next.as_ref() == Some(&a.id) {
        adjacent(&mut writes, b, a);
    } else {
        writes
            .photo(&a.id, PhotoPatch::links(b.prev.clone(), b.next.clone()))
            .photo(&b.id, PhotoPatch::links(a.prev.clone(), a.next.clone()));
        if let Some(prev) = &a.prev {
            writes.photo(prev, PhotoPatch::next(Some(b.id.clone())));
        }
        if let Some(next) = &a.next {
            writes.photo(next, PhotoPatch::prev(Some(b.id.clone())));
        }
        if let Some(prev) = &b.prev {
            writes.photo(prev, PhotoPatch::next(Some(a.id.clone())));
        }
        if let Some(next) = &b.next {
            writes.photo(next, PhotoPatch::prev(Some(a.id.clone())));
        }
    }

    let swapped = |end: &Option<PhotoId>| match end {
        Some(id) if id == &a.id => Some(Some(b.id.clone())),
        Some(id) if id == &b.id => Some(Some(a.id.clone())),
        _ => None,
    };
    let patch = GalleryPatch {
        head: swapped(&gallery.head),
        tail: swapped(&gallery.tail),
        ..GalleryPatch::default()
    };
    if !patch.is_empty() {
        writes.gallery(&gallery.name, patch);
    }

    writes
}

/// `first` sits immediately before `second`.
fn adjacent(writes: &mut WriteSet, first: &Photo, second: &Photo) {
    writes
        .photo(
            &first.id,
            PhotoPatch::links(Some(second.id.clone()), second.next.clone()),
        )
        .photo(
            &second.id,
            PhotoPatch::links(first.prev.clone(), Some(first.id.clone())),
        );
    if let Some(prev) = &first.prev {
        writes.photo(prev, PhotoPatch::next(Some(second.id.clone())));
    }
    if let Some(next) = &second.next {
        writes.photo(next, PhotoPatch::prev(Some(first.id.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingRecordStore, TestEnv, assert_chain};
    use std::sync::Arc;

    fn request(first: &str, second: &str) -> SwapPhotosOperationRequest {
        SwapPhotosOperationRequest {
            first: PhotoId::from(first),
            second: PhotoId::from(second),
        }
    }

    #[tokio::test]
    async fn test_swap_same_photo_writes_nothing() {
        let env = TestEnv::new();
        env.seed_chain("g", &["a", "b", "c"]).await;
        let counting = Arc::new(CountingRecordStore::new(env.records.clone()));

        let result = SwapPhotosOperation::new(counting.clone())
            .run(request("b", "b"))
            .await
            .unwrap();
        assert_eq!(result.writes, 0);
        assert_eq!(counting.writes(), 0);
        assert_chain(&env.records, "g", &["a", "b", "c"]).await;
    }

    #[tokio::test]
    async fn test_swap_cases_and_swap_back() {
        let cases: [(&str, &str, [&str; 5]); 6] = [
            // adjacent, first before second
            ("b", "c", ["a", "c", "b", "d", "e"]),
            // adjacent, first after second
            ("c", "b", ["a", "c", "b", "d", "e"]),
            // adjacent at the head
            ("a", "b", ["b", "a", "c", "d", "e"]),
            // adjacent at the tail
            ("e", "d", ["a", "b", "c", "e", "d"]),
            // non-adjacent in the middle
            ("b", "d", ["a", "d", "c", "b", "e"]),
            // non-adjacent head and tail
            ("a", "e", ["e", "b", "c", "d", "a"]),
        ];

        for (first, second, expected) in cases {
            let env = TestEnv::new();
            env.seed_chain("g", &["a", "b", "c", "d", "e"]).await;
            let operation = SwapPhotosOperation::new(env.records.clone());

            operation.run(request(first, second)).await.unwrap();
            assert_chain(&env.records, "g", &expected).await;

            operation.run(request(first, second)).await.unwrap();
            assert_chain(&env.records, "g", &["a", "b", "c", "d", "e"]).await;
        }
    }

    #[tokio::test]
    async fn test_swap_two_photo_gallery() {
        let env = TestEnv::new();
        env.seed_chain("g", &["a", "b"]).await;

        SwapPhotosOperation::new(env.records.clone())
            .run(request("b", "a"))
            .await
            .unwrap();
        assert_chain(&env.records, "g", &["b", "a"]).await;
    }

    #[tokio::test]
    async fn test_swap_across_galleries_is_rejected() {
        let env = TestEnv::new();
        env.seed_chain("g", &["a"]).await;
        env.seed_chain("h", &["x"]).await;

        let err = SwapPhotosOperation::new(env.records.clone())
            .run(request("a", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_swap_refuses_inconsistent_links() {
        let env = TestEnv::new();
        env.seed_chain("g", &["a", "b", "c"]).await;
        env.records
            .update_photo(&PhotoId::from("c"), &PhotoPatch::prev(None))
            .await
            .unwrap();

        let err = SwapPhotosOperation::new(env.records.clone())
            .run(request("b", "c"))
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::InvariantViolation(_)));
    }
}
