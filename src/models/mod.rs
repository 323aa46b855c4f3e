//! Domain records for the simulation explorer.
//!
//! # Hierarchy
//!
//! - [`Category`]: Top-level grouping that exclusively owns its instances.
//! - [`Instance`]: One simulation record, versioned over time. Its top-level
//!   folders and conditions describe the current version.
//! - [`VersionSnapshot`]: Immutable copy of an instance at a version label.
//!   Snapshots are ordered by the instance's [`VersionHistoryEntry`] list, not
//!   by the map that holds them.
//! - [`Folder`]: Typed grouping of files owned by exactly one snapshot.
//! - [`File`]: A single artifact, optionally tagged with [`Condition`] ids and
//!   carrying a [`Preview`] with curve data.
//!
//! All records are plain data. Optional attributes are explicit `Option`
//! fields with serde defaults; invariants are checked once, by the store.

mod condition;
mod file;
mod folder;
mod instance;
mod preview;
mod timestamp;

pub use condition::*;
pub use file::*;
pub use folder::*;
pub use instance::*;
pub use preview::*;
pub use timestamp::*;
