use crate::error::Result;
use crate::model::Gallery;
use crate::storage::DynRecordStore;
use serde::Serialize;

#[derive(Clone)]
pub struct ListGalleriesOperation {
    records: DynRecordStore,
}

#[derive(Debug, Clone, Serialize)]
pub struct GallerySummary {
    #[serde(flatten)]
    pub gallery: Gallery,
    pub photo_count: usize,
}

#[derive(Debug, Clone)]
pub struct ListGalleriesOperationResult {
    pub galleries: Vec<GallerySummary>,
}

impl ListGalleriesOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self { records }
    }

    pub async fn run(&self) -> Result<ListGalleriesOperationResult> {
        let galleries = self.records.list_galleries().await?;

        let mut summaries = Vec::with_capacity(galleries.len());
        for gallery in galleries {
            summaries.push(self.summarize(gallery).await?);
        }
        Ok(ListGalleriesOperationResult {
            galleries: summaries,
        })
    }

    /// A single gallery, `NotFound` when absent.
    pub async fn get(&self, name: &str) -> Result<GallerySummary> {
        let gallery = self.records.get_gallery(name).await?;
        self.summarize(gallery).await
    }

    async fn summarize(&self, gallery: Gallery) -> Result<GallerySummary> {
        let photo_count = self.records.count_photos(&gallery.name).await?;
        Ok(GallerySummary {
            gallery,
            photo_count,
        })
    }
}
