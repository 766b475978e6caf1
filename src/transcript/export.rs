//! Transcript export formats.
//!
//! Three interchange formats: plain text, a structured JSON document (the
//! canonical archival format — it round-trips through `import_structured`),
//! and SRT-style timed captions.

use crate::defaults;
use crate::error::Result;
use crate::transcript::store::{TranscriptStats, Utterance, UtteranceStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to a structured export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub exported_at: DateTime<Utc>,
    pub language: String,
    pub stats: TranscriptStats,
}

/// The self-describing structured export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredExport {
    pub metadata: ExportMetadata,
    pub utterances: Vec<Utterance>,
}

impl UtteranceStore {
    /// Renders one `[MM:SS] Name: text` line per utterance, in insertion order.
    /// Hours appear once the session passes the one-hour mark.
    pub fn export_text(&self) -> String {
        self.utterances()
            .iter()
            .map(|u| {
                format!(
                    "[{}] {}: {}",
                    format_clock_timestamp(u.timestamp_ms),
                    u.display_name(),
                    u.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serializes the full transcript with export metadata as pretty JSON.
    pub fn export_structured(&self) -> Result<String> {
        self.export_structured_at(Utc::now())
    }

    /// Like [`export_structured`](Self::export_structured) with an explicit
    /// export timestamp.
    pub fn export_structured_at(&self, exported_at: DateTime<Utc>) -> Result<String> {
        let document = StructuredExport {
            metadata: ExportMetadata {
                exported_at,
                language: self.language().to_string(),
                stats: self.stats(),
            },
            utterances: self.utterances().to_vec(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Rebuilds a store from a structured export.
    ///
    /// The result is equivalent to the exported store: same ids, text,
    /// timestamps, and speaker attribution.
    pub fn import_structured(json: &str) -> Result<UtteranceStore> {
        let document: StructuredExport = serde_json::from_str(json)?;
        Ok(UtteranceStore::restore(
            document.metadata.language,
            document.utterances,
        ))
    }

    /// Renders sequential SRT subtitle blocks, numbered from 1. Each utterance
    /// is shown for a fixed window starting at its timestamp.
    pub fn export_subtitle(&self) -> String {
        self.utterances()
            .iter()
            .enumerate()
            .map(|(index, u)| {
                format!(
                    "{}\n{} --> {}\n{}: {}\n",
                    index + 1,
                    format_srt_timestamp(u.timestamp_ms),
                    format_srt_timestamp(u.timestamp_ms + defaults::SUBTITLE_WINDOW_MS),
                    u.display_name(),
                    u.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Formats milliseconds as `MM:SS`, or `HH:MM:SS` past an hour.
pub fn format_clock_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Formats milliseconds as the SRT `HH:MM:SS,mmm` timestamp.
pub fn format_srt_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = ms % 1000;

    format!(
        "{:02}:{:02}:{:02},{:03}",
        hours, minutes, seconds, milliseconds
    )
}
