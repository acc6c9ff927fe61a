//! Service API: one operation type per gallery or photo action.

pub mod add_photo;
pub mod create_gallery;
pub mod empty_gallery;
pub mod heal_chain;
mod ingest;
pub mod insert_photo;
pub mod list_galleries;
pub mod list_photos;
pub mod move_photo;
pub mod photo_index;
pub mod read_photo;
pub mod remove_gallery;
pub mod remove_photo;
pub mod rename_gallery;
pub mod reorder_photos;
pub mod swap_photos;
pub mod update_details;

pub use add_photo::{AddPhotoOperation, AddPhotoOperationRequest, AddPhotoOperationResult};
pub use create_gallery::{
    CreateGalleryOperation, CreateGalleryOperationRequest, CreateGalleryOperationResult,
};
pub use empty_gallery::{
    EmptyGalleryOperation, EmptyGalleryOperationRequest, EmptyGalleryOperationResult,
};
pub use heal_chain::{HealChainOperation, HealChainOperationOutcome, HealChainOperationRequest};
pub use ingest::PhotoUpload;
pub use insert_photo::{
    InsertPhotoOperation, InsertPhotoOperationRequest, InsertPhotoOperationResult, InsertPosition,
};
pub use list_galleries::{GallerySummary, ListGalleriesOperation, ListGalleriesOperationResult};
pub use list_photos::{
    ListPhotoItem, ListPhotosOperation, ListPhotosOperationRequest, ListPhotosOperationResult,
};
pub use move_photo::{MovePhotoOperation, MovePhotoOperationRequest, MovePhotoOperationResult};
pub use photo_index::{
    PhotoIndexOperation, PhotoIndexOperationRequest, PhotoIndexOperationResult,
};
pub use read_photo::{
    PhotoData, ReadPhotoOperation, ReadPhotoOperationRequest, ReadPhotoOperationResult,
};
pub use remove_gallery::{RemoveGalleryOperation, RemoveGalleryOperationRequest};
pub use remove_photo::{
    RemovePhotoOperation, RemovePhotoOperationRequest, RemovePhotoOperationResult,
};
pub use rename_gallery::{
    RenameGalleryOperation, RenameGalleryOperationRequest, RenameGalleryOperationResult,
};
pub use reorder_photos::{
    ReorderPhotosOperation, ReorderPhotosOperationRequest, ReorderPhotosOperationResult,
};
pub use swap_photos::{
    SwapPhotosOperation, SwapPhotosOperationRequest, SwapPhotosOperationResult,
};
pub use update_details::{
    UpdateDetailsOperation, UpdateGalleryDetailsRequest, UpdatePhotoDetailsRequest,
};
