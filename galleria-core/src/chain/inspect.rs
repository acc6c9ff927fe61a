use crate::model::{Gallery, Photo, PhotoId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One way a gallery's stored links disagree with the chain invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainIssue {
    /// `from` is `None` when the dangling pointer is the gallery head.
    MissingPhoto { from: Option<PhotoId>, id: PhotoId },
    ForeignPhoto {
        from: Option<PhotoId>,
        id: PhotoId,
        gallery: String,
    },
    Cycle { id: PhotoId },
    BrokenBackPointer {
        id: PhotoId,
        expected: Option<PhotoId>,
        found: Option<PhotoId>,
    },
    TailMismatch {
        expected: Option<PhotoId>,
        found: Option<PhotoId>,
    },
    Unreachable { id: PhotoId },
    EndsMismatch {
        head: Option<PhotoId>,
        tail: Option<PhotoId>,
        members: usize,
    },
}

fn describe(id: &Option<PhotoId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "null".to_string(),
    }
}

fn source(from: &Option<PhotoId>) -> String {
    match from {
        Some(id) => format!("photo {}", id),
        None => "gallery head".to_string(),
    }
}

impl fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPhoto { from, id } => {
                write!(f, "{} points to missing photo {}", source(from), id)
            }
            Self::ForeignPhoto { from, id, gallery } => write!(
                f,
                "{} points to photo {} of gallery {}",
                source(from),
                id,
                gallery
            ),
            Self::Cycle { id } => write!(f, "chain revisits photo {}", id),
            Self::BrokenBackPointer {
                id,
                expected,
                found,
            } => write!(
                f,
                "photo {} has prev {} but follows {}",
                id,
                describe(found),
                describe(expected)
            ),
            Self::TailMismatch { expected, found } => write!(
                f,
                "gallery tail is {} but the chain ends at {}",
                describe(expected),
                describe(found)
            ),
            Self::Unreachable { id } => write!(f, "photo {} is not reachable from head", id),
            Self::EndsMismatch {
                head,
                tail,
                members,
            } => write!(
                f,
                "gallery head {} and tail {} do not fit {} member photos",
                describe(head),
                describe(tail),
                members
            ),
        }
    }
}

/// Result of walking one gallery's chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub gallery: String,
    /// Photos reached from head, up to the first missing, foreign or repeated id.
    pub order: Vec<PhotoId>,
    /// Member photos the walk never reached, in storage order.
    pub unreachable: Vec<PhotoId>,
    pub issues: Vec<ChainIssue>,
}

impl ChainReport {
    pub fn is_sound(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Walks `members` (the photos whose `gallery` field names `gallery`) from
/// the gallery head without touching storage.
pub fn walk(gallery: &Gallery, members: &[Photo]) -> ChainReport {
    let by_id: HashMap<&PhotoId, &Photo> = members.iter().map(|photo| (&photo.id, photo)).collect();
    let mut report = ChainReport {
        gallery: gallery.name.clone(),
        ..ChainReport::default()
    };

    if gallery.head.is_none() != gallery.tail.is_none()
        || (gallery.head.is_none() && !members.is_empty())
    {
        report.issues.push(ChainIssue::EndsMismatch {
            head: gallery.head.clone(),
            tail: gallery.tail.clone(),
            members: members.len(),
        });
    }

    let mut visited = HashSet::new();
    let mut previous: Option<PhotoId> = None;
    let mut cursor = gallery.head.clone();
    let mut clean_end = true;

    while let Some(id) = cursor {
        if !visited.insert(id.clone()) {
            report.issues.push(ChainIssue::Cycle { id });
            clean_end = false;
            break;
        }

        let Some(photo) = by_id.get(&id) else {
            report.issues.push(ChainIssue::MissingPhoto {
                from: previous.clone(),
                id,
            });
            clean_end = false;
            break;
        };

        if photo.prev != previous {
            report.issues.push(ChainIssue::BrokenBackPointer {
                id: id.clone(),
                expected: previous.clone(),
                found: photo.prev.clone(),
            });
        }

        report.order.push(id.clone());
        previous = Some(id);
        cursor = photo.next.clone();
    }

    if clean_end && gallery.head.is_some() && previous != gallery.tail {
        report.issues.push(ChainIssue::TailMismatch {
            expected: gallery.tail.clone(),
            found: previous,
        });
    }

    for photo in members {
        if !visited.contains(&photo.id) {
            report.unreachable.push(photo.id.clone());
            report.issues.push(ChainIssue::Unreachable {
                id: photo.id.clone(),
            });
        }
    }

    report
}
