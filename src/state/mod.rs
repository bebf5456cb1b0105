//! Host-side memory of the previously packed tree.

mod snapshot_state;

pub use snapshot_state::{SnapshotState, SnapshotStateError};
