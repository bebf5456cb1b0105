//! Snapshots of directory trees: capturing them relative to an earlier
//! snapshot, turning them into bytes and back, and writing them out again.

mod container;
mod differ;
mod entry;
mod materializer;
mod metadata;

pub use container::{ContainerError, Snapshot};
pub use differ::{DiffError, SnapshotDiffer};
pub use entry::{Entry, EntryKind, EntrySummary};
pub use materializer::{DeletionPolicy, MaterializeError, SnapshotMaterializer};
pub use metadata::{JsonMetadataCodec, MetadataCodec};
