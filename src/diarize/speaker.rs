//! Speaker identity state.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Stable per-speaker display colors, cycled in creation order.
pub const SPEAKER_COLORS: [&str; 8] = [
    "#3b82f6", // blue
    "#10b981", // green
    "#f59e0b", // amber
    "#ef4444", // red
    "#8b5cf6", // purple
    "#ec4899", // pink
    "#06b6d4", // cyan
    "#84cc16", // lime
];

/// Opaque speaker identity, assigned monotonically per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakerId(pub u32);

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speaker_{}", self.0)
    }
}

/// One clustered speaker.
///
/// The centroid is always the arithmetic mean of the retained history,
/// recomputed from scratch on every update so floating-point error cannot
/// compound. Manual speakers start with no acoustic data and a `None` centroid.
#[derive(Debug, Clone)]
pub struct Speaker {
    pub id: SpeakerId,
    /// User-editable display name.
    pub name: String,
    /// Cosmetic color, stable for the id.
    pub color: &'static str,
    /// Most recent feature vectors, oldest dropped at the cap.
    history: VecDeque<Vec<f32>>,
    /// Mean of `history`; `None` while the speaker has no acoustic data.
    centroid: Option<Vec<f32>>,
    pub utterance_count: u64,
}

impl Speaker {
    /// Creates a speaker from an initial cluster of feature vectors.
    pub fn from_cluster(id: SpeakerId, name: String, color: &'static str, cluster: Vec<Vec<f32>>) -> Self {
        let history: VecDeque<Vec<f32>> = cluster.into();
        let centroid = mean_vector(history.iter());
        Self {
            id,
            name,
            color,
            history,
            centroid,
            utterance_count: 0,
        }
    }

    /// Creates a manually inserted speaker with no acoustic data.
    pub fn manual(id: SpeakerId, name: String, color: &'static str) -> Self {
        Self {
            id,
            name,
            color,
            history: VecDeque::new(),
            centroid: None,
            utterance_count: 0,
        }
    }

    /// Appends a vector to the history (dropping the oldest past `cap`) and
    /// recomputes the centroid.
    pub fn observe(&mut self, vector: Vec<f32>, cap: usize) {
        self.history.push_back(vector);
        while self.history.len() > cap {
            self.history.pop_front();
        }
        self.centroid = mean_vector(self.history.iter());
    }

    /// Current centroid, `None` for speakers without acoustic data.
    pub fn centroid(&self) -> Option<&[f32]> {
        self.centroid.as_deref()
    }

    /// Number of retained feature vectors.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Retained feature vectors, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Vec<f32>> {
        self.history.iter()
    }
}

/// Display-oriented summary of one speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerSummary {
    pub id: SpeakerId,
    pub name: String,
    pub color: String,
    pub utterance_count: u64,
}

impl From<&Speaker> for SpeakerSummary {
    fn from(speaker: &Speaker) -> Self {
        Self {
            id: speaker.id,
            name: speaker.name.clone(),
            color: speaker.color.to_string(),
            utterance_count: speaker.utterance_count,
        }
    }
}

/// Arithmetic mean of a set of equal-length vectors.
pub(crate) fn mean_vector<'a, I>(vectors: I) -> Option<Vec<f32>>
where
    I: IntoIterator<Item = &'a Vec<f32>>,
{
    let mut iter = vectors.into_iter();
    let first = iter.next()?;
    let mut sum = first.clone();
    let mut count = 1usize;

    for vector in iter {
        for (slot, value) in sum.iter_mut().zip(vector) {
            *slot += value;
        }
        count += 1;
    }

    for slot in &mut sum {
        *slot /= count as f32;
    }
    Some(sum)
}
