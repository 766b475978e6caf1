//! Unsupervised speaker clustering.
//!
//! Maps the stream of acoustic feature vectors onto a small, growing set of
//! speaker identities with no ground truth: clustering is by acoustic
//! similarity only and makes no claim of identity correctness.

pub mod clusterer;
pub mod speaker;

pub use clusterer::SpeakerClusterer;
pub use speaker::{Speaker, SpeakerId, SpeakerSummary};
