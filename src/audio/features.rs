//! Acoustic feature extraction.
//!
//! Converts one analysis frame into a bounded-size numeric descriptor suitable
//! for similarity comparison: spectral centroid, spectral flux, zero-crossing
//! rate, RMS energy, and a small bank of log-energy sub-bands. Pure numeric
//! code over well-formed fixed-size input — extraction never fails.

use crate::audio::device::AnalysisFrame;
use crate::defaults;

/// Small epsilon added before taking a logarithm of band energy.
const LOG_EPSILON: f32 = 1e-10;

/// Acoustic features for one analysis frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFeatures {
    /// Frequency-weighted energy centroid in Hz (perceived brightness).
    pub spectral_centroid: f32,
    /// RMS of the frame-to-frame spectral difference (rate of change).
    pub spectral_flux: f32,
    /// Fraction of adjacent waveform samples whose sign differs.
    pub zero_crossing_rate: f32,
    /// RMS energy of the time-domain frame.
    pub rms_energy: f32,
    /// Natural-log energy per contiguous equal-width spectrum band.
    pub band_log_energy: Vec<f32>,
}

/// Extracts acoustic features from analysis frames.
///
/// Holds the previous spectrum for the flux computation; one extractor per
/// capture session.
pub struct FeatureExtractor {
    sample_rate: u32,
    sub_bands: usize,
    previous_spectrum: Option<Vec<f32>>,
}

impl FeatureExtractor {
    /// Creates a new extractor for the given device sample rate.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            sub_bands: defaults::SUB_BANDS,
            previous_spectrum: None,
        }
    }

    /// Extracts features from one frame.
    pub fn extract(&mut self, frame: &AnalysisFrame) -> AudioFeatures {
        let spectral_flux = self.spectral_flux(&frame.spectrum_db);
        self.previous_spectrum = Some(frame.spectrum_db.clone());

        AudioFeatures {
            spectral_centroid: self.spectral_centroid(&frame.spectrum_db),
            spectral_flux,
            zero_crossing_rate: zero_crossing_rate(&frame.waveform),
            rms_energy: rms_energy(&frame.waveform),
            band_log_energy: self.band_log_energy(&frame.spectrum_db),
        }
    }

    /// Coarse volume level in [0, 100] from the smoothed byte spectrum.
    pub fn level(&self, frame: &AnalysisFrame) -> f32 {
        if frame.level_spectrum.is_empty() {
            return 0.0;
        }
        let sum: u32 = frame.level_spectrum.iter().map(|&b| u32::from(b)).sum();
        let average = sum as f32 / frame.level_spectrum.len() as f32;
        (average / 128.0 * 100.0).min(100.0)
    }

    /// Clears the flux history; call between capture sessions.
    pub fn reset(&mut self) {
        self.previous_spectrum = None;
    }

    fn spectral_centroid(&self, spectrum_db: &[f32]) -> f32 {
        if spectrum_db.is_empty() {
            return 0.0;
        }
        let bin_width = self.sample_rate as f32 / (2.0 * spectrum_db.len() as f32);

        let mut numerator = 0.0f32;
        let mut denominator = 0.0f32;
        for (i, &db) in spectrum_db.iter().enumerate() {
            let magnitude = db_to_linear(db);
            numerator += i as f32 * bin_width * magnitude;
            denominator += magnitude;
        }

        if denominator > 0.0 {
            numerator / denominator
        } else {
            0.0
        }
    }

    fn spectral_flux(&self, spectrum_db: &[f32]) -> f32 {
        let Some(previous) = &self.previous_spectrum else {
            // First frame of a session has nothing to differ against.
            return 0.0;
        };
        if previous.len() != spectrum_db.len() || spectrum_db.is_empty() {
            return 0.0;
        }

        let sum: f32 = spectrum_db
            .iter()
            .zip(previous)
            .map(|(&current, &prev)| {
                let diff = current - prev;
                diff * diff
            })
            .sum();
        (sum / spectrum_db.len() as f32).sqrt()
    }

    fn band_log_energy(&self, spectrum_db: &[f32]) -> Vec<f32> {
        let band_size = spectrum_db.len() / self.sub_bands;
        let mut bands = vec![LOG_EPSILON.ln(); self.sub_bands];
        if band_size == 0 {
            return bands;
        }

        for (band, slot) in bands.iter_mut().enumerate() {
            let energy: f32 = spectrum_db[band * band_size..(band + 1) * band_size]
                .iter()
                .map(|&db| {
                    let magnitude = db_to_linear(db);
                    magnitude * magnitude
                })
                .sum();
            *slot = (energy + LOG_EPSILON).ln();
        }
        bands
    }
}

/// Recovers a linear amplitude from a decibel value.
fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Fraction of adjacent samples whose sign differs.
fn zero_crossing_rate(waveform: &[f32]) -> f32 {
    if waveform.is_empty() {
        return 0.0;
    }
    let crossings = waveform
        .windows(2)
        .filter(|pair| (pair[1] >= 0.0) != (pair[0] >= 0.0))
        .count();
    crossings as f32 / waveform.len() as f32
}

/// Root mean square of the time-domain frame.
fn rms_energy(waveform: &[f32]) -> f32 {
    if waveform.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = waveform.iter().map(|&x| x * x).sum();
    (sum_squares / waveform.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::AnalysisFrame;

    const BINS: usize = 1024;

    fn frame_with(spectrum_db: Vec<f32>, waveform: Vec<f32>) -> AnalysisFrame {
        AnalysisFrame::new(spectrum_db, waveform, vec![0; BINS])
    }

    fn quiet_spectrum() -> Vec<f32> {
        // -200 dB is a linear magnitude of 1e-10: effectively silent bins.
        vec![-200.0; BINS]
    }

    #[test]
    fn test_flux_zero_on_first_frame() {
        let mut extractor = FeatureExtractor::new(48_000);
        let features = extractor.extract(&frame_with(vec![-40.0; BINS], vec![0.0; 64]));
        assert_eq!(features.spectral_flux, 0.0);
    }

    #[test]
    fn test_flux_zero_for_identical_frames() {
        let mut extractor = FeatureExtractor::new(48_000);
        let frame = frame_with(vec![-40.0; BINS], vec![0.0; 64]);
        extractor.extract(&frame);
        let features = extractor.extract(&frame);
        assert_eq!(features.spectral_flux, 0.0);
    }

    #[test]
    fn test_flux_tracks_spectral_change() {
        let mut extractor = FeatureExtractor::new(48_000);
        extractor.extract(&frame_with(vec![-40.0; BINS], vec![0.0; 64]));
        let features = extractor.extract(&frame_with(vec![-34.0; BINS], vec![0.0; 64]));
        // Every bin moved 6 dB, so flux is the RMS of a constant 6.
        assert!((features.spectral_flux - 6.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_clears_flux_history() {
        let mut extractor = FeatureExtractor::new(48_000);
        extractor.extract(&frame_with(vec![-40.0; BINS], vec![0.0; 64]));
        extractor.reset();
        let features = extractor.extract(&frame_with(vec![-34.0; BINS], vec![0.0; 64]));
        assert_eq!(features.spectral_flux, 0.0);
    }

    #[test]
    fn test_centroid_follows_dominant_bin() {
        let mut extractor = FeatureExtractor::new(48_000);
        let mut spectrum = quiet_spectrum();
        spectrum[100] = 0.0; // all the energy in bin 100

        let features = extractor.extract(&frame_with(spectrum, vec![0.0; 64]));
        let bin_width = 48_000.0 / (2.0 * BINS as f32);
        assert!(
            (features.spectral_centroid - 100.0 * bin_width).abs() < 1.0,
            "centroid {} should sit at bin 100 ({})",
            features.spectral_centroid,
            100.0 * bin_width
        );
    }

    #[test]
    fn test_zero_crossing_rate_alternating_signal() {
        let waveform: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let rate = zero_crossing_rate(&waveform);
        assert!(rate > 0.9, "alternating signal should be ~1.0, got {}", rate);
    }

    #[test]
    fn test_zero_crossing_rate_constant_signal() {
        assert_eq!(zero_crossing_rate(&[0.5; 64]), 0.0);
    }

    #[test]
    fn test_rms_energy_constant_signal() {
        assert!((rms_energy(&[0.5; 128]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms_energy_empty() {
        assert_eq!(rms_energy(&[]), 0.0);
    }

    #[test]
    fn test_band_log_energy_dimension_and_value() {
        let mut extractor = FeatureExtractor::new(48_000);
        let features = extractor.extract(&frame_with(vec![0.0; BINS], vec![0.0; 64]));

        assert_eq!(features.band_log_energy.len(), 13);
        // 0 dB bins have unit magnitude; each band sums 1024/13 = 78 of them.
        let expected = 78.0f32.ln();
        for value in &features.band_log_energy {
            assert!((value - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_level_scaling() {
        let extractor = FeatureExtractor::new(48_000);
        let frame = AnalysisFrame::new(vec![], vec![], vec![64; 512]);
        assert!((extractor.level(&frame) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_level_clamped_at_100() {
        let extractor = FeatureExtractor::new(48_000);
        let frame = AnalysisFrame::new(vec![], vec![], vec![255; 512]);
        assert_eq!(extractor.level(&frame), 100.0);
    }

    #[test]
    fn test_level_empty_spectrum() {
        let extractor = FeatureExtractor::new(48_000);
        let frame = AnalysisFrame::new(vec![], vec![], vec![]);
        assert_eq!(extractor.level(&frame), 0.0);
    }
}
