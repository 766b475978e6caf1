//! confab - Meeting transcription with unsupervised speaker separation
//!
//! Captures meeting audio, turns it into timestamped, speaker-attributed
//! utterances through an unreliable external recognition engine, and exports
//! the result as text, structured JSON, or SRT captions.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod diarize;
pub mod error;
pub mod meeting;
pub mod recognize;
pub mod report;
pub mod transcript;

// Core boundaries (capture → features → speakers, engine → session → store)
pub use audio::device::{AnalysisFrame, AudioDevice, CaptureMode};
pub use audio::features::{AudioFeatures, FeatureExtractor};
pub use diarize::clusterer::SpeakerClusterer;
pub use diarize::speaker::{Speaker, SpeakerId, SpeakerSummary};
pub use recognize::engine::{EngineEvent, EngineFactory, RecognitionEngine, RecognizedSpan};
pub use recognize::session::{RecognitionSession, SessionState, SessionStatus};

// Composition root
pub use meeting::{MeetingEvent, MeetingSession};

// Transcript and persistence
pub use transcript::export::StructuredExport;
pub use transcript::snapshot::{FileSnapshotStore, SnapshotStore, restore_snapshot, save_snapshot};
pub use transcript::store::{TranscriptStats, Utterance, UtteranceStore};

// Error handling
pub use error::{ConfabError, Result};

// Config
pub use config::Config;

// Reporting
pub use report::{LogReporter, NullReporter, Reporter};
