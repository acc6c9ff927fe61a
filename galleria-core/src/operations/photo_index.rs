use crate::chain::ChainMaintainer;
use crate::error::Result;
use crate::model::PhotoId;
use crate::storage::DynRecordStore;

#[derive(Clone)]
pub struct PhotoIndexOperation {
    records: DynRecordStore,
    chain: ChainMaintainer,
}

#[derive(Debug, Clone)]
pub struct PhotoIndexOperationRequest {
    pub photo_id: PhotoId,
}

#[derive(Debug, Clone)]
pub struct PhotoIndexOperationResult {
    pub gallery: String,
    pub index: usize,
}

impl PhotoIndexOperation {
    pub fn new(records: DynRecordStore) -> Self {
        Self {
            chain: ChainMaintainer::new(records.clone()),
            records,
        }
    }

    pub async fn run(&self, request: PhotoIndexOperationRequest) -> Result<PhotoIndexOperationResult> {
        let photo = self.records.get_photo(&request.photo_id).await?;
        let index = self.chain.position_of(&photo).await?;
        Ok(PhotoIndexOperationResult {
            gallery: photo.gallery,
            index,
        })
    }
}
