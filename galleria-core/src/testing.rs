//! Fixtures shared by the unit tests.

use crate::error::{GalleryError, Result};
use crate::model::{BlobId, Gallery, GalleryPatch, Photo, PhotoId, PhotoPatch, Quality};
use crate::storage::{
    BlobStore, DynBlobStore, DynRecordStore, FsBlobStore, MetadataStore, RecordStore,
};
use crate::transcode::{DynTranscoder, ImageTranscoder, Transcoder};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    Bytes::from(buf.into_inner())
}

pub fn photo(id: &str, gallery: &str) -> Photo {
    Photo {
        id: PhotoId::from(id),
        gallery: gallery.to_string(),
        prev: None,
        next: None,
        title: "no title".to_string(),
        description: String::new(),
        thumbnail: None,
        large: None,
        original: None,
        created_at: Utc::now(),
    }
}

/// In-memory photos already linked in the given order.
pub fn linked_photos(gallery: &str, ids: &[&str]) -> Vec<Photo> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let mut p = photo(id, gallery);
            p.prev = i.checked_sub(1).map(|before| PhotoId::from(ids[before]));
            p.next = ids.get(i + 1).map(|after| PhotoId::from(*after));
            p
        })
        .collect()
}

pub struct TestEnv {
    _dir: TempDir,
    pub records: DynRecordStore,
    pub blobs: DynBlobStore,
    pub transcoder: DynTranscoder,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let records = MetadataStore::new(dir.path().join("galleria.db")).unwrap();
        let blobs = FsBlobStore::new(dir.path().to_path_buf()).unwrap();
        Self {
            _dir: dir,
            records: Arc::new(records),
            blobs: Arc::new(blobs),
            transcoder: Arc::new(ImageTranscoder::default()),
        }
    }

    pub async fn create_gallery(&self, name: &str) {
        self.records
            .insert_gallery(&Gallery::new(name, ""))
            .await
            .unwrap();
    }

    /// Creates `name` holding a sound chain of `ids`.
    pub async fn seed_chain(&self, name: &str, ids: &[&str]) {
        self.create_gallery(name).await;
        for p in linked_photos(name, ids) {
            self.records.insert_photo(&p).await.unwrap();
        }
        let head = ids.first().map(|id| PhotoId::from(*id));
        let tail = ids.last().map(|id| PhotoId::from(*id));
        self.records
            .update_gallery(name, &GalleryPatch::ends(head, tail))
            .await
            .unwrap();
    }

    pub async fn insert_unlinked(&self, id: &str, gallery: &str) -> Photo {
        let p = photo(id, gallery);
        self.records.insert_photo(&p).await.unwrap();
        p
    }
}

/// Asserts that `gallery` holds exactly `expected`, linked in that order in
/// both directions, with matching head and tail.
pub async fn assert_chain(records: &DynRecordStore, gallery: &str, expected: &[&str]) {
    let g = records.get_gallery(gallery).await.unwrap();
    let members = records.list_photos(gallery).await.unwrap();

    let mut member_ids: Vec<&str> = members.iter().map(|p| p.id.as_str()).collect();
    let mut wanted = expected.to_vec();
    member_ids.sort();
    wanted.sort();
    assert_eq!(member_ids, wanted, "members of {}", gallery);

    assert_eq!(
        g.head.as_ref().map(|id| id.as_str()),
        expected.first().copied(),
        "head of {}",
        gallery
    );
    assert_eq!(
        g.tail.as_ref().map(|id| id.as_str()),
        expected.last().copied(),
        "tail of {}",
        gallery
    );

    for (i, id) in expected.iter().enumerate() {
        let p = records.get_photo(&PhotoId::from(*id)).await.unwrap();
        let prev = i.checked_sub(1).map(|before| expected[before]);
        let next = expected.get(i + 1).copied();
        assert_eq!(p.prev.as_ref().map(|id| id.as_str()), prev, "prev of {}", id);
        assert_eq!(p.next.as_ref().map(|id| id.as_str()), next, "next of {}", id);
    }
}

/// Forwards to an inner store, failing updates aimed at chosen records.
pub struct FlakyRecordStore {
    inner: DynRecordStore,
    failing_photos: Mutex<HashSet<PhotoId>>,
    failing_galleries: Mutex<HashSet<String>>,
}

impl FlakyRecordStore {
    pub fn new(inner: DynRecordStore) -> Self {
        Self {
            inner,
            failing_photos: Mutex::new(HashSet::new()),
            failing_galleries: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_photo_updates(&self, id: &PhotoId) {
        self.failing_photos.lock().unwrap().insert(id.clone());
    }

    pub fn fail_gallery_updates(&self, name: &str) {
        self.failing_galleries
            .lock()
            .unwrap()
            .insert(name.to_string());
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn list_galleries(&self) -> Result<Vec<Gallery>> {
        self.inner.list_galleries().await
    }

    async fn find_gallery(&self, name: &str) -> Result<Option<Gallery>> {
        self.inner.find_gallery(name).await
    }

    async fn insert_gallery(&self, gallery: &Gallery) -> Result<()> {
        self.inner.insert_gallery(gallery).await
    }

    async fn update_gallery(&self, name: &str, patch: &GalleryPatch) -> Result<()> {
        if self.failing_galleries.lock().unwrap().contains(name) {
            return Err(GalleryError::Storage(format!("injected failure for {}", name)));
        }
        self.inner.update_gallery(name, patch).await
    }

    async fn rename_gallery(&self, name: &str, new_name: &str) -> Result<()> {
        self.inner.rename_gallery(name, new_name).await
    }

    async fn delete_gallery(&self, name: &str) -> Result<()> {
        self.inner.delete_gallery(name).await
    }

    async fn find_photo(&self, id: &PhotoId) -> Result<Option<Photo>> {
        self.inner.find_photo(id).await
    }

    async fn list_photos(&self, gallery: &str) -> Result<Vec<Photo>> {
        self.inner.list_photos(gallery).await
    }

    async fn count_photos(&self, gallery: &str) -> Result<usize> {
        self.inner.count_photos(gallery).await
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<()> {
        self.inner.insert_photo(photo).await
    }

    async fn update_photo(&self, id: &PhotoId, patch: &PhotoPatch) -> Result<()> {
        if self.failing_photos.lock().unwrap().contains(id) {
            return Err(GalleryError::Storage(format!("injected failure for {}", id)));
        }
        self.inner.update_photo(id, patch).await
    }

    async fn delete_photo(&self, id: &PhotoId) -> Result<()> {
        self.inner.delete_photo(id).await
    }

    async fn delete_photos_in_gallery(&self, gallery: &str) -> Result<usize> {
        self.inner.delete_photos_in_gallery(gallery).await
    }
}

/// Forwards to an inner store, counting every record write.
pub struct CountingRecordStore {
    inner: DynRecordStore,
    writes: AtomicUsize,
}

impl CountingRecordStore {
    pub fn new(inner: DynRecordStore) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for CountingRecordStore {
    async fn list_galleries(&self) -> Result<Vec<Gallery>> {
        self.inner.list_galleries().await
    }

    async fn find_gallery(&self, name: &str) -> Result<Option<Gallery>> {
        self.inner.find_gallery(name).await
    }

    async fn insert_gallery(&self, gallery: &Gallery) -> Result<()> {
        self.count();
        self.inner.insert_gallery(gallery).await
    }

    async fn update_gallery(&self, name: &str, patch: &GalleryPatch) -> Result<()> {
        self.count();
        self.inner.update_gallery(name, patch).await
    }

    async fn rename_gallery(&self, name: &str, new_name: &str) -> Result<()> {
        self.count();
        self.inner.rename_gallery(name, new_name).await
    }

    async fn delete_gallery(&self, name: &str) -> Result<()> {
        self.count();
        self.inner.delete_gallery(name).await
    }

    async fn find_photo(&self, id: &PhotoId) -> Result<Option<Photo>> {
        self.inner.find_photo(id).await
    }

    async fn list_photos(&self, gallery: &str) -> Result<Vec<Photo>> {
        self.inner.list_photos(gallery).await
    }

    async fn count_photos(&self, gallery: &str) -> Result<usize> {
        self.inner.count_photos(gallery).await
    }

    async fn insert_photo(&self, photo: &Photo) -> Result<()> {
        self.count();
        self.inner.insert_photo(photo).await
    }

    async fn update_photo(&self, id: &PhotoId, patch: &PhotoPatch) -> Result<()> {
        self.count();
        self.inner.update_photo(id, patch).await
    }

    async fn delete_photo(&self, id: &PhotoId) -> Result<()> {
        self.count();
        self.inner.delete_photo(id).await
    }

    async fn delete_photos_in_gallery(&self, gallery: &str) -> Result<usize> {
        self.count();
        self.inner.delete_photos_in_gallery(gallery).await
    }
}

/// Fails one quality and delegates the other to the real transcoder.
pub struct FailingTranscoder {
    failing: Quality,
    inner: ImageTranscoder,
}

impl FailingTranscoder {
    pub fn new(failing: Quality) -> Self {
        Self {
            failing,
            inner: ImageTranscoder::default(),
        }
    }
}

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn transcode(&self, data: Bytes, quality: Quality) -> Result<Bytes> {
        if quality == self.failing {
            return Err(GalleryError::Transcode(format!(
                "injected failure for {}",
                quality
            )));
        }
        self.inner.transcode(data, quality).await
    }
}

/// Forwards to an inner blob store, failing every delete.
pub struct FailingBlobStore {
    inner: DynBlobStore,
    deletes: AtomicUsize,
}

impl FailingBlobStore {
    pub fn new(inner: DynBlobStore) -> Self {
        Self {
            inner,
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn attempted_deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, data: Bytes, content_type: &str) -> Result<BlobId> {
        self.inner.put(data, content_type).await
    }

    async fn get(&self, id: &BlobId) -> Result<(Bytes, String)> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: &BlobId) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Err(GalleryError::Storage(format!("injected failure for blob {}", id)))
    }
}
