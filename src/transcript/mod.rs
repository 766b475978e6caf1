//! Finalized-utterance storage, export formats, and session snapshots.

pub mod export;
pub mod snapshot;
pub mod store;

pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use store::{TranscriptStats, Utterance, UtteranceStore};
