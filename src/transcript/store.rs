//! The ordered list of finalized utterances for a session.

use crate::defaults;
use crate::diarize::SpeakerId;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One finalized, speaker-attributed utterance.
///
/// Created at recognition finalization; afterwards mutated only to backfill
/// the speaker name when a speaker is renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Sequence number, unique and strictly increasing within a session.
    pub id: u64,
    pub text: String,
    /// Milliseconds since session start.
    pub timestamp_ms: u64,
    /// Engine-reported confidence in [0, 1].
    pub confidence: f32,
    /// Unset until speaker attribution completes.
    pub speaker_id: Option<SpeakerId>,
    pub speaker_name: Option<String>,
    pub is_final: bool,
}

impl Utterance {
    /// Creates a finalized utterance with no speaker attribution yet.
    pub fn finalized(id: u64, text: &str, timestamp_ms: u64, confidence: f32) -> Self {
        Self {
            id,
            text: text.to_string(),
            timestamp_ms,
            confidence,
            speaker_id: None,
            speaker_name: None,
            is_final: true,
        }
    }

    /// Attaches speaker attribution.
    pub fn with_speaker(mut self, id: SpeakerId, name: &str) -> Self {
        self.speaker_id = Some(id);
        self.speaker_name = Some(name.to_string());
        self
    }

    /// Display name, falling back for unattributed utterances.
    pub fn display_name(&self) -> &str {
        self.speaker_name
            .as_deref()
            .unwrap_or(defaults::UNKNOWN_SPEAKER)
    }
}

/// Aggregate transcript statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptStats {
    pub total_utterances: usize,
    pub total_chars: usize,
    /// Distinct speakers with at least one attributed utterance.
    pub speaker_count: usize,
    pub duration_ms: u64,
}

/// Owns the ordered finalized utterances for the session lifetime.
pub struct UtteranceStore {
    utterances: Vec<Utterance>,
    next_id: u64,
    language: String,
    /// Elapsed-time origin; set when the session begins, cleared on `clear`.
    origin: Option<Instant>,
}

impl UtteranceStore {
    /// Creates an empty store for the given recognition language.
    pub fn new(language: &str) -> Self {
        Self {
            utterances: Vec::new(),
            next_id: 0,
            language: language.to_string(),
            origin: None,
        }
    }

    /// Marks the elapsed-time origin for duration statistics.
    pub fn mark_started(&mut self) {
        self.origin = Some(Instant::now());
    }

    /// Appends an utterance, assigning the next sequence id. O(1).
    pub fn append(&mut self, mut utterance: Utterance) -> u64 {
        utterance.id = self.next_id;
        self.next_id += 1;
        let id = utterance.id;
        self.utterances.push(utterance);
        id
    }

    /// All utterances in insertion order.
    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    /// Looks up one utterance by id.
    pub fn get(&self, id: u64) -> Option<&Utterance> {
        self.utterances.iter().find(|u| u.id == id)
    }

    /// Backfills the display name on every utterance attributed to `speaker`.
    ///
    /// Returns the number of utterances updated.
    pub fn set_speaker_name(&mut self, speaker: SpeakerId, name: &str) -> usize {
        let mut updated = 0;
        for utterance in &mut self.utterances {
            if utterance.speaker_id == Some(speaker) {
                utterance.speaker_name = Some(name.to_string());
                updated += 1;
            }
        }
        updated
    }

    /// Aggregate statistics for the current transcript.
    pub fn stats(&self) -> TranscriptStats {
        let mut speakers: Vec<SpeakerId> = self
            .utterances
            .iter()
            .filter_map(|u| u.speaker_id)
            .collect();
        speakers.sort_unstable();
        speakers.dedup();

        let duration_ms = match self.origin {
            Some(origin) => origin.elapsed().as_millis() as u64,
            None => self.utterances.last().map(|u| u.timestamp_ms).unwrap_or(0),
        };

        TranscriptStats {
            total_utterances: self.utterances.len(),
            total_chars: self.utterances.iter().map(|u| u.text.chars().count()).sum(),
            speaker_count: speakers.len(),
            duration_ms,
        }
    }

    /// Recognition language for export metadata.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Number of stored utterances.
    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    /// True when no utterances are stored.
    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Empties the list and resets the id sequence and elapsed-time origin.
    ///
    /// Does not touch the speaker clusterer; the caller resets both together
    /// when discarding a transcript.
    pub fn clear(&mut self) {
        self.utterances.clear();
        self.next_id = 0;
        self.origin = None;
    }

    pub(crate) fn restore(language: String, utterances: Vec<Utterance>) -> Self {
        let next_id = utterances
            .iter()
            .map(|u| u.id.saturating_add(1))
            .max()
            .unwrap_or(0);
        Self {
            utterances,
            next_id,
            language,
            origin: None,
        }
    }
}
