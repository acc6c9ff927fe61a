//! Galleria Core - photo galleries with a user-defined display order
//!
//! Each gallery's order is a doubly linked list spread across independent
//! records:
//! - the gallery holds `head`/`tail`, each photo holds `prev`/`next`
//! - structural changes fan out field-level writes and wait for all of them
//! - chain checks and repair recover from partially applied operations
//! - SQLite records, filesystem blobs, `image` transcoding

pub mod chain;
pub mod error;
pub mod model;
pub mod operations;
pub mod storage;
pub mod transcode;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{ChainIssue, ChainMaintainer, ChainReport, RepairOutcome, WriteSet};
pub use error::{GalleryError, Result};
pub use model::{BlobId, Gallery, GalleryPatch, Photo, PhotoId, PhotoPatch, Quality};
pub use storage::{
    BlobStore, DynBlobStore, DynRecordStore, FsBlobStore, MetadataStore, RecordStore,
};
pub use transcode::{
    DynTranscoder, ImageTranscoder, TranscodeSettings, Transcoder, VariantSettings,
};
