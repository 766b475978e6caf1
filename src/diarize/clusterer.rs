//! Online speaker clustering.
//!
//! Incrementally assigns feature vectors to speaker clusters by cosine
//! similarity against per-speaker centroids, creating new clusters once a
//! pending buffer of unmatched vectors is both large and self-consistent
//! enough. Tolerant of silence and acoustic noise; no supervision involved.

use crate::audio::features::AudioFeatures;
use crate::config::DiarizationConfig;
use crate::diarize::speaker::{SPEAKER_COLORS, Speaker, SpeakerId, SpeakerSummary, mean_vector};
use std::collections::VecDeque;

/// Spectral centroid normalization divisor (Hz).
const CENTROID_SCALE: f32 = 8000.0;
/// RMS energy gain applied before clustering.
const RMS_GAIN: f32 = 10.0;
/// Band log-energy normalization divisor.
const BAND_SCALE: f32 = 20.0;

/// Unsupervised online speaker clusterer.
///
/// Holds all speaker identity state for a session. One instance per session;
/// independent sessions get independent clusterers.
pub struct SpeakerClusterer {
    config: DiarizationConfig,
    speakers: Vec<Speaker>,
    /// Monotonic creation counter; drives ids, default names, and colors.
    created: u32,
    /// Unmatched vectors awaiting a consistent-enough cluster.
    pending: VecDeque<Vec<f32>>,
    current: Option<SpeakerId>,
}

impl SpeakerClusterer {
    /// Creates a clusterer with the given configuration.
    pub fn new(config: DiarizationConfig) -> Self {
        Self {
            config,
            speakers: Vec::new(),
            created: 0,
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Maps one feature frame onto a speaker identity.
    ///
    /// Returns the active speaker after this frame, which is unchanged for
    /// silent frames, unmatched frames that do not yet form a new cluster,
    /// and whenever clustering is disabled.
    pub fn identify(&mut self, features: &AudioFeatures) -> Option<SpeakerId> {
        if !self.config.enabled {
            return self.current;
        }

        // A short pause must not reassign the speaker.
        if features.rms_energy < self.config.silence_threshold {
            return self.current;
        }

        let vector = feature_vector(features);

        let mut best: Option<(usize, f32)> = None;
        for (index, speaker) in self.speakers.iter().enumerate() {
            let Some(centroid) = speaker.centroid() else {
                // Manual speakers without acoustic data never win matches.
                continue;
            };
            let similarity = cosine_similarity(&vector, centroid);
            if best.is_none_or(|(_, b)| similarity > b) {
                best = Some((index, similarity));
            }
        }

        if let Some((index, similarity)) = best
            && similarity > self.config.match_threshold
        {
            self.speakers[index].observe(vector, self.config.history_cap);
            self.pending.clear();
            self.current = Some(self.speakers[index].id);
            return self.current;
        }

        self.pending.push_back(vector);
        while self.pending.len() > self.config.pending_window {
            self.pending.pop_front();
        }

        if self.pending.len() >= self.config.min_samples
            && average_pairwise_similarity(&self.pending) > self.config.consistency_threshold
        {
            let id = self.create_from_pending();
            self.current = Some(id);
        }

        self.current
    }

    /// Inserts a speaker with no acoustic data (e.g. a user-provided label).
    pub fn add_manual_speaker(&mut self, name: Option<&str>) -> SpeakerId {
        let (id, default_name, color) = self.next_identity();
        let name = name
            .filter(|n| !n.is_empty())
            .map_or(default_name, str::to_string);
        self.speakers.push(Speaker::manual(id, name, color));
        id
    }

    /// Renames a speaker in place; id, centroid, and clustering are untouched.
    ///
    /// Returns false when the id is unknown.
    pub fn rename(&mut self, id: SpeakerId, name: &str) -> bool {
        match self.speaker_mut(id) {
            Some(speaker) => {
                speaker.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Bumps the utterance counter for a speaker.
    pub fn increment_utterance_count(&mut self, id: SpeakerId) {
        if let Some(speaker) = self.speaker_mut(id) {
            speaker.utterance_count += 1;
        }
    }

    /// Looks up one speaker.
    pub fn speaker(&self, id: SpeakerId) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.id == id)
    }

    /// All speakers in creation order.
    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    /// Display summaries for all speakers.
    pub fn stats(&self) -> Vec<SpeakerSummary> {
        self.speakers.iter().map(SpeakerSummary::from).collect()
    }

    /// The speaker the last non-silent frame was attributed to.
    pub fn current_speaker(&self) -> Option<SpeakerId> {
        self.current
    }

    /// Display name of a speaker, if known.
    pub fn speaker_name(&self, id: SpeakerId) -> Option<&str> {
        self.speaker(id).map(|s| s.name.as_str())
    }

    /// Enables or disables clustering; while disabled, `identify` is a no-op
    /// returning the last active speaker (single-speaker mode).
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Whether clustering is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Clears all speakers, counters, and buffers.
    ///
    /// Used when a transcript is discarded; the caller resets the utterance
    /// store alongside.
    pub fn reset(&mut self) {
        self.speakers.clear();
        self.created = 0;
        self.pending.clear();
        self.current = None;
    }

    fn create_from_pending(&mut self) -> SpeakerId {
        let (id, name, color) = self.next_identity();
        let cluster: Vec<Vec<f32>> = self.pending.drain(..).collect();
        self.speakers.push(Speaker::from_cluster(id, name, color, cluster));
        id
    }

    fn next_identity(&mut self) -> (SpeakerId, String, &'static str) {
        self.created += 1;
        let color = SPEAKER_COLORS[(self.created as usize - 1) % SPEAKER_COLORS.len()];
        (
            SpeakerId(self.created),
            format!("Speaker {}", self.created),
            color,
        )
    }

    fn speaker_mut(&mut self, id: SpeakerId) -> Option<&mut Speaker> {
        self.speakers.iter_mut().find(|s| s.id == id)
    }
}

/// Builds the normalized clustering vector from raw features.
///
/// Dimension is 3 + B: centroid, zero-crossing rate, gained RMS, then the
/// scaled band energies.
pub fn feature_vector(features: &AudioFeatures) -> Vec<f32> {
    let mut vector = Vec::with_capacity(3 + features.band_log_energy.len());
    vector.push(features.spectral_centroid / CENTROID_SCALE);
    vector.push(features.zero_crossing_rate);
    vector.push(features.rms_energy * RMS_GAIN);
    vector.extend(features.band_log_energy.iter().map(|&b| b / BAND_SCALE));
    vector
}

/// Cosine similarity of two vectors; 0 for mismatched lengths or zero norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator > 0.0 { dot / denominator } else { 0.0 }
}

/// Mean cosine similarity over all unordered vector pairs in the buffer.
fn average_pairwise_similarity(vectors: &VecDeque<Vec<f32>>) -> f32 {
    if vectors.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0f32;
    let mut pairs = 0usize;
    for (i, a) in vectors.iter().enumerate() {
        for b in vectors.iter().skip(i + 1) {
            total += cosine_similarity(a, b);
            pairs += 1;
        }
    }
    total / pairs as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiarizationConfig;

    /// Feature frame with a bright, energetic profile.
    fn profile_a() -> AudioFeatures {
        AudioFeatures {
            spectral_centroid: 1600.0,
            spectral_flux: 1.0,
            zero_crossing_rate: 0.1,
            rms_energy: 0.05,
            band_log_energy: vec![2.0; 13],
        }
    }

    /// Feature frame acoustically far from profile A.
    fn profile_b() -> AudioFeatures {
        AudioFeatures {
            spectral_centroid: 7200.0,
            spectral_flux: 1.0,
            zero_crossing_rate: 0.9,
            rms_energy: 0.3,
            band_log_energy: vec![-10.0; 13],
        }
    }

    /// Feature frame that disagrees strongly with profile B.
    fn profile_c() -> AudioFeatures {
        AudioFeatures {
            spectral_centroid: 400.0,
            spectral_flux: 1.0,
            zero_crossing_rate: 0.02,
            rms_energy: 0.02,
            band_log_energy: vec![10.0; 13],
        }
    }

    fn silent() -> AudioFeatures {
        AudioFeatures {
            spectral_centroid: 0.0,
            spectral_flux: 0.0,
            zero_crossing_rate: 0.0,
            rms_energy: 0.001,
            band_log_energy: vec![-23.0; 13],
        }
    }

    fn clusterer() -> SpeakerClusterer {
        SpeakerClusterer::new(DiarizationConfig::default())
    }

    fn teach(clusterer: &mut SpeakerClusterer, features: &AudioFeatures, n: usize) -> Option<SpeakerId> {
        let mut id = None;
        for _ in 0..n {
            id = clusterer.identify(features);
        }
        id
    }

    #[test]
    fn test_feature_vector_dimension() {
        assert_eq!(feature_vector(&profile_a()).len(), 16);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = feature_vector(&profile_a());
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_consistent_vectors_create_exactly_one_speaker() {
        let mut clusterer = clusterer();

        // Below the minimum sample count nothing is created.
        assert_eq!(teach(&mut clusterer, &profile_a(), 4), None);
        assert!(clusterer.speakers().is_empty());

        // The fifth consistent vector forms the cluster.
        let id = teach(&mut clusterer, &profile_a(), 1);
        assert!(id.is_some());
        assert_eq!(clusterer.speakers().len(), 1);

        // Further identical vectors keep matching the same speaker.
        assert_eq!(teach(&mut clusterer, &profile_a(), 10), id);
        assert_eq!(clusterer.speakers().len(), 1);
    }

    #[test]
    fn test_same_vector_twice_same_id() {
        let mut clusterer = clusterer();
        let id = teach(&mut clusterer, &profile_a(), 5);
        assert_eq!(clusterer.identify(&profile_a()), id);
        assert_eq!(clusterer.identify(&profile_a()), id);
    }

    #[test]
    fn test_dissimilar_voice_creates_second_speaker() {
        let mut clusterer = clusterer();
        let first = teach(&mut clusterer, &profile_a(), 5);
        let second = teach(&mut clusterer, &profile_b(), 5);

        assert!(second.is_some());
        assert_ne!(first, second);
        assert_eq!(clusterer.speakers().len(), 2);

        // Both voices keep resolving to their own cluster.
        assert_eq!(clusterer.identify(&profile_a()), first);
        assert_eq!(clusterer.identify(&profile_b()), second);
    }

    #[test]
    fn test_inconsistent_buffer_never_forms_speaker() {
        let mut clusterer = clusterer();
        for _ in 0..10 {
            clusterer.identify(&profile_b());
            clusterer.identify(&profile_c());
        }
        assert!(clusterer.speakers().is_empty());
        assert_eq!(clusterer.current_speaker(), None);
    }

    #[test]
    fn test_silence_never_changes_active_speaker() {
        let mut clusterer = clusterer();

        // Silence before any speaker exists stays unattributed.
        assert_eq!(teach(&mut clusterer, &silent(), 20), None);
        assert!(clusterer.speakers().is_empty());

        let id = teach(&mut clusterer, &profile_a(), 5);
        assert_eq!(teach(&mut clusterer, &silent(), 20), id);
        assert_eq!(clusterer.current_speaker(), id);
    }

    #[test]
    fn test_centroid_is_mean_of_retained_history() {
        let mut clusterer = clusterer();
        teach(&mut clusterer, &profile_a(), 5);
        teach(&mut clusterer, &profile_a(), 7);

        let speaker = &clusterer.speakers()[0];
        let recomputed = mean_vector(speaker.history().collect::<Vec<_>>().into_iter())
            .expect("speaker has history");
        let centroid = speaker.centroid().expect("speaker has centroid");
        for (a, b) in centroid.iter().zip(&recomputed) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_history_capped() {
        let config = DiarizationConfig {
            history_cap: 10,
            ..Default::default()
        };
        let mut clusterer = SpeakerClusterer::new(config);
        teach(&mut clusterer, &profile_a(), 40);
        assert_eq!(clusterer.speakers()[0].history_len(), 10);
    }

    #[test]
    fn test_disabled_returns_last_active() {
        let mut clusterer = clusterer();
        let id = teach(&mut clusterer, &profile_a(), 5);

        clusterer.set_enabled(false);
        assert!(!clusterer.is_enabled());
        // A very different voice no longer reassigns anything.
        assert_eq!(teach(&mut clusterer, &profile_b(), 10), id);
        assert_eq!(clusterer.speakers().len(), 1);
    }

    #[test]
    fn test_manual_speaker_never_wins_matches() {
        let mut clusterer = clusterer();
        let manual = clusterer.add_manual_speaker(Some("Moderator"));
        assert_eq!(clusterer.speaker_name(manual), Some("Moderator"));

        let clustered = teach(&mut clusterer, &profile_a(), 5);
        assert_ne!(clustered, Some(manual));
        assert_eq!(clusterer.speaker(manual).and_then(|s| s.centroid()), None);
    }

    #[test]
    fn test_manual_speaker_default_name() {
        let mut clusterer = clusterer();
        let id = clusterer.add_manual_speaker(None);
        assert_eq!(clusterer.speaker_name(id), Some("Speaker 1"));
    }

    #[test]
    fn test_rename_keeps_identity() {
        let mut clusterer = clusterer();
        let id = teach(&mut clusterer, &profile_a(), 5).expect("speaker created");

        assert!(clusterer.rename(id, "Alice"));
        assert_eq!(clusterer.speaker_name(id), Some("Alice"));
        // Matching behavior is unaffected.
        assert_eq!(clusterer.identify(&profile_a()), Some(id));

        assert!(!clusterer.rename(SpeakerId(99), "Nobody"));
    }

    #[test]
    fn test_utterance_count_and_stats() {
        let mut clusterer = clusterer();
        let id = teach(&mut clusterer, &profile_a(), 5).expect("speaker created");
        clusterer.increment_utterance_count(id);
        clusterer.increment_utterance_count(id);

        let stats = clusterer.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].utterance_count, 2);
        assert_eq!(stats[0].color, SPEAKER_COLORS[0]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut clusterer = clusterer();
        teach(&mut clusterer, &profile_a(), 5);
        clusterer.reset();

        assert!(clusterer.speakers().is_empty());
        assert_eq!(clusterer.current_speaker(), None);

        // Ids restart from 1 after a reset.
        let id = teach(&mut clusterer, &profile_a(), 5);
        assert_eq!(id, Some(SpeakerId(1)));
    }
}
