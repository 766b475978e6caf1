use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub recognition: RecognitionConfig,
    pub diarization: DiarizationConfig,
    pub session: SessionConfig,
}

/// Audio analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// FFT size used by the capture device; the spectrum has fft_size/2 bins.
    pub fft_size: usize,
    pub sample_rate: u32,
    /// Analysis tick rate while capture is active.
    pub tick_hz: u32,
}

/// Recognition session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    /// BCP 47 language tag the engine session is bound to.
    pub language: String,
    /// Maximum spontaneous engine restarts before the session stops fatally.
    pub max_restarts: u32,
    /// Delay before re-entering Starting after a spontaneous termination.
    pub restart_delay_ms: u64,
}

/// Speaker clustering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiarizationConfig {
    /// When disabled, identification is a no-op returning the last active speaker.
    pub enabled: bool,
    /// RMS energy below which a frame never reassigns the active speaker.
    pub silence_threshold: f32,
    /// Minimum cosine similarity against a centroid to match an existing speaker.
    pub match_threshold: f32,
    /// Minimum average pairwise similarity in the pending buffer to form a speaker.
    pub consistency_threshold: f32,
    /// Minimum pending vectors before a new speaker can be created.
    pub min_samples: usize,
    /// Pending buffer capacity (oldest dropped).
    pub pending_window: usize,
    /// Per-speaker feature history capacity (oldest dropped).
    pub history_cap: usize,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Periodically write the structured export to the snapshot store.
    pub auto_save: bool,
    pub auto_save_interval_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: defaults::FFT_SIZE,
            sample_rate: defaults::SAMPLE_RATE,
            tick_hz: defaults::TICK_HZ,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            max_restarts: defaults::MAX_RESTARTS,
            restart_delay_ms: defaults::RESTART_DELAY_MS,
        }
    }
}

impl Default for DiarizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            match_threshold: defaults::MATCH_THRESHOLD,
            consistency_threshold: defaults::CONSISTENCY_THRESHOLD,
            min_samples: defaults::MIN_FEATURE_SAMPLES,
            pending_window: defaults::PENDING_WINDOW,
            history_cap: defaults::HISTORY_CAP,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_save: true,
            auto_save_interval_secs: defaults::AUTO_SAVE_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CONFAB_LANGUAGE → recognition.language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var("CONFAB_LANGUAGE")
            && !language.is_empty()
        {
            self.recognition.language = language;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/confab/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("confab").join("config.toml"))
    }
}
