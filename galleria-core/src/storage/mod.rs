//! Storage modules for Galleria
//!
//! Record storage for galleries and photos, and byte storage for the image
//! variants.

pub mod blob_store;
pub mod metadata_store;
pub mod record_store;

pub use blob_store::{BlobStore, DynBlobStore, FsBlobStore, compute_hash, verify_hash};
pub use metadata_store::MetadataStore;
pub use record_store::{DynRecordStore, RecordStore};
