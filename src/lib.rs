#![allow(clippy::enum_variant_names)]

//! Incremental snapshots of directory trees.
//!
//! A [`snapshot::SnapshotDiffer`] captures a tree relative to the previous
//! snapshot of it, a [`snapshot::Snapshot`] turns the result into a single
//! length-prefixed byte stream, and a [`snapshot::SnapshotMaterializer`]
//! writes it out again on the receiving side.

pub mod application;
pub mod cli;
pub mod codec;
pub mod config;
pub mod ext;
pub mod filesystem;
pub mod snapshot;
pub mod state;
