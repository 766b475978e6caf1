//! Default configuration constants for confab.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default analysis sample rate in Hz.
///
/// 48kHz matches the native rate of most capture devices, so frequency bins map
/// directly onto the device spectrum without resampling.
pub const SAMPLE_RATE: u32 = 48_000;

/// Default FFT size for spectral analysis.
///
/// 2048 samples yields 1024 frequency bins — enough spectral resolution for the
/// speaker features while keeping per-tick cost negligible at 60 Hz.
pub const FFT_SIZE: usize = 2048;

/// Number of log-energy sub-bands in the feature vector.
///
/// 13 contiguous equal-width bands, a coarse filter-bank stand-in for MFCCs.
pub const SUB_BANDS: usize = 13;

/// Analysis tick rate in Hz.
///
/// Feature extraction and level metering run on this cadence while capture is
/// active, independent of recognition engine callbacks.
pub const TICK_HZ: u32 = 60;

/// RMS energy below which a frame is treated as silence by the clusterer.
///
/// A short pause must not reassign the active speaker, so silent frames are
/// ignored rather than matched.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Minimum cosine similarity for a vector to match an existing speaker centroid.
///
/// Empirically chosen; kept as configuration pending calibration on real audio.
pub const MATCH_THRESHOLD: f32 = 0.7;

/// Minimum average pairwise similarity within the pending buffer before a new
/// speaker is created.
///
/// Prevents single outlier frames from spawning spurious identities.
pub const CONSISTENCY_THRESHOLD: f32 = 0.8;

/// Minimum number of pending vectors before a new speaker can be created.
pub const MIN_FEATURE_SAMPLES: usize = 5;

/// Maximum number of vectors retained in the pending-new-speaker buffer.
pub const PENDING_WINDOW: usize = 50;

/// Maximum number of feature vectors retained per speaker.
///
/// The centroid is always recomputed from this capped history, never drifted
/// incrementally, so floating-point error does not compound.
pub const HISTORY_CAP: usize = 100;

/// Default recognition language tag (BCP 47).
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Maximum number of spontaneous engine restarts per session.
///
/// The recognition engine offers no continuity guarantee; every unrequested
/// termination is a restart signal up to this bound.
pub const MAX_RESTARTS: u32 = 100;

/// Delay before restarting a spontaneously terminated engine, in milliseconds.
///
/// Avoids a tight restart loop when the engine dies immediately on start.
pub const RESTART_DELAY_MS: u64 = 300;

/// Auto-save interval for the session snapshot, in seconds.
pub const AUTO_SAVE_INTERVAL_SECS: u64 = 30;

/// Display window for each subtitle block, in milliseconds.
pub const SUBTITLE_WINDOW_MS: u64 = 3000;

/// Fallback display name for utterances with no attributed speaker.
pub const UNKNOWN_SPEAKER: &str = "Speaker";
