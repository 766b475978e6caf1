//! Audio capture boundary and acoustic feature extraction.

pub mod device;
pub mod features;

pub use device::{AnalysisFrame, AudioDevice, CaptureMode, MockAudioDevice};
pub use features::{AudioFeatures, FeatureExtractor};
