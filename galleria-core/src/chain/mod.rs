//! The per-gallery photo chain.
//!
//! [`ChainMaintainer`] owns the two structural primitives (append at tail
//! and unlink) plus the read-side walks. [`WriteSet`] is the fan-out unit
//! every structural operation reduces to, and [`walk`] checks a gallery's
//! stored links against the chain invariants.

mod inspect;
mod maintainer;
mod writes;

pub use inspect::{ChainIssue, ChainReport, walk};
pub use maintainer::{ChainMaintainer, RepairOutcome};
pub(crate) use maintainer::violation;
pub use writes::{PendingWrite, WriteSet};
