//! Gallery and photo records, and the field patches used to update them.
//!
//! A gallery's display order is not stored as a sequence. Each photo holds
//! `prev`/`next` ids of its neighbours and the gallery holds `head`/`tail`,
//! so the order is a doubly linked list spread across independent records.

use crate::error::{GalleryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

pub const DEFAULT_PHOTO_TITLE: &str = "no title";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PhotoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PhotoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque blob-store identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BlobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    pub name: String,
    pub description: String,
    pub head: Option<PhotoId>,
    pub tail: Option<PhotoId>,
    pub created_at: DateTime<Utc>,
}

impl Gallery {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            head: None,
            tail: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.tail.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub gallery: String,
    pub prev: Option<PhotoId>,
    pub next: Option<PhotoId>,
    pub title: String,
    pub description: String,
    /// `None` records a failed transcode for that variant.
    pub thumbnail: Option<BlobId>,
    pub large: Option<BlobId>,
    pub original: Option<BlobId>,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    pub fn blob(&self, quality: Quality) -> Option<&BlobId> {
        match quality {
            Quality::Original => self.original.as_ref(),
            Quality::Large => self.large.as_ref(),
            Quality::Thumbnail => self.thumbnail.as_ref(),
        }
    }

    pub fn blob_ids(&self) -> impl Iterator<Item = &BlobId> {
        [&self.original, &self.large, &self.thumbnail]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Original,
    Large,
    Thumbnail,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Large => "large",
            Self::Thumbnail => "thumbnail",
        }
    }

    /// Accepts the plain names as well as the legacy `_LARGE_` style selectors.
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().trim_matches('_').to_ascii_lowercase();
        match normalized.as_str() {
            "original" => Ok(Self::Original),
            "large" => Ok(Self::Large),
            "thumbnail" | "thumb" => Ok(Self::Thumbnail),
            _ => Err(GalleryError::InvalidArgument(format!(
                "invalid quality selector: {}",
                value
            ))),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level update of a photo record. `None` leaves the column untouched;
/// for the link fields `Some(None)` clears the pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoPatch {
    pub gallery: Option<String>,
    pub prev: Option<Option<PhotoId>>,
    pub next: Option<Option<PhotoId>>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PhotoPatch {
    pub fn prev(prev: Option<PhotoId>) -> Self {
        Self {
            prev: Some(prev),
            ..Self::default()
        }
    }

    pub fn next(next: Option<PhotoId>) -> Self {
        Self {
            next: Some(next),
            ..Self::default()
        }
    }

    pub fn links(prev: Option<PhotoId>, next: Option<PhotoId>) -> Self {
        Self {
            prev: Some(prev),
            next: Some(next),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gallery.is_none()
            && self.prev.is_none()
            && self.next.is_none()
            && self.title.is_none()
            && self.description.is_none()
    }

    /// Fields set in `other` win.
    pub fn merge(&mut self, other: PhotoPatch) {
        if other.gallery.is_some() {
            self.gallery = other.gallery;
        }
        if other.prev.is_some() {
            self.prev = other.prev;
        }
        if other.next.is_some() {
            self.next = other.next;
        }
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
    }

    pub fn apply(&self, photo: &mut Photo) {
        if let Some(gallery) = &self.gallery {
            photo.gallery = gallery.clone();
        }
        if let Some(prev) = &self.prev {
            photo.prev = prev.clone();
        }
        if let Some(next) = &self.next {
            photo.next = next.clone();
        }
        if let Some(title) = &self.title {
            photo.title = title.clone();
        }
        if let Some(description) = &self.description {
            photo.description = description.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryPatch {
    pub description: Option<String>,
    pub head: Option<Option<PhotoId>>,
    pub tail: Option<Option<PhotoId>>,
}

impl GalleryPatch {
    pub fn head(head: Option<PhotoId>) -> Self {
        Self {
            head: Some(head),
            ..Self::default()
        }
    }

    pub fn tail(tail: Option<PhotoId>) -> Self {
        Self {
            tail: Some(tail),
            ..Self::default()
        }
    }

    pub fn ends(head: Option<PhotoId>, tail: Option<PhotoId>) -> Self {
        Self {
            head: Some(head),
            tail: Some(tail),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.head.is_none() && self.tail.is_none()
    }

    pub fn merge(&mut self, other: GalleryPatch) {
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.head.is_some() {
            self.head = other.head;
        }
        if other.tail.is_some() {
            self.tail = other.tail;
        }
    }

    pub fn apply(&self, gallery: &mut Gallery) {
        if let Some(description) = &self.description {
            gallery.description = description.clone();
        }
        if let Some(head) = &self.head {
            gallery.head = head.clone();
        }
        if let Some(tail) = &self.tail {
            gallery.tail = tail.clone();
        }
    }
}
