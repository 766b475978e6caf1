//! Recognition engine boundary.
//!
//! The engine is an external resource with no continuity guarantee: it may
//! terminate after any speech segment, network hiccup, or silence timeout.
//! Confab consumes it through a narrow typed surface — `start`/`stop` plus an
//! event stream — and `RecognitionSession` owns the entire restart policy.

use crate::error::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

/// One recognized span of speech.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedSpan {
    pub text: String,
    /// Engine-reported confidence in [0, 1].
    pub confidence: f32,
    /// Final spans will not be revised further; interim spans are provisional.
    pub is_final: bool,
}

impl RecognizedSpan {
    /// Creates a final span.
    pub fn final_span(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            is_final: true,
        }
    }

    /// Creates an interim (provisional) span.
    pub fn interim_span(text: &str) -> Self {
        Self {
            text: text.to_string(),
            confidence: 0.0,
            is_final: false,
        }
    }
}

/// Typed engine error conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No speech detected within the engine's window. Benign.
    NoSpeech,
    /// The engine was aborted on request. Expected during intentional stop.
    Aborted,
    /// Capture permission was denied. Fatal.
    PermissionDenied,
    /// The audio device disappeared or could not be acquired. Fatal.
    DeviceUnavailable,
    /// Transient network failure; the session keeps running.
    Network,
    /// Anything else the engine reports.
    Other(String),
}

impl EngineError {
    /// True for conditions that must terminate the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::PermissionDenied | EngineError::DeviceUnavailable)
    }
}

/// Events emitted by a recognition engine instance.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine session began and is listening.
    Began,
    /// Speech was detected in the input.
    SpeechStart,
    /// The current speech segment ended. Informational.
    SpeechEnd,
    /// One or more recognized spans, interim or final.
    Result(Vec<RecognizedSpan>),
    /// A typed error condition.
    Error(EngineError),
    /// The engine session terminated, requested or not.
    Ended,
}

/// Trait for recognition engine instances.
///
/// One instance per start attempt; a fresh instance is created for every
/// restart. Events are delivered on the channel handed to the factory.
pub trait RecognitionEngine: Send {
    /// Ask the engine to begin recognizing.
    fn start(&mut self) -> Result<()>;

    /// Ask the engine to stop. Must be idempotent; a terminal `Ended` event
    /// may still arrive afterwards.
    fn stop(&mut self);
}

/// Trait for creating engine instances bound to a language.
pub trait EngineFactory: Send + Sync {
    /// Creates a fresh engine session that emits its events on `events`.
    fn create(
        &self,
        language: &str,
        events: UnboundedSender<EngineEvent>,
    ) -> Result<Box<dyn RecognitionEngine>>;
}

impl<F: EngineFactory + ?Sized> EngineFactory for Arc<F> {
    fn create(
        &self,
        language: &str,
        events: UnboundedSender<EngineEvent>,
    ) -> Result<Box<dyn RecognitionEngine>> {
        (**self).create(language, events)
    }
}

/// Scripted engine for testing: each `start()` replays the next batch of
/// scripted events onto the event channel.
pub struct ScriptedEngine {
    script: Arc<Mutex<VecDeque<Vec<EngineEvent>>>>,
    events: UnboundedSender<EngineEvent>,
    stopped: bool,
}

impl RecognitionEngine for ScriptedEngine {
    fn start(&mut self) -> Result<()> {
        let batch = {
            let mut script = self
                .script
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            script.pop_front().unwrap_or_default()
        };
        for event in batch {
            // Receiver dropped means the session is gone; nothing to do.
            let _ = self.events.send(event);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            let _ = self.events.send(EngineEvent::Ended);
        }
    }
}

/// Factory producing [`ScriptedEngine`]s from a shared script.
///
/// Batches are consumed across engine instances in order, which models an
/// engine that picks up where the previous instance died.
pub struct ScriptedEngineFactory {
    script: Arc<Mutex<VecDeque<Vec<EngineEvent>>>>,
    created: Arc<Mutex<u32>>,
    languages: Arc<Mutex<Vec<String>>>,
    fail_create: bool,
}

impl ScriptedEngineFactory {
    /// Creates a factory that replays the given event batches, one per start.
    pub fn new(batches: Vec<Vec<EngineEvent>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(batches.into())),
            created: Arc::new(Mutex::new(0)),
            languages: Arc::new(Mutex::new(Vec::new())),
            fail_create: false,
        }
    }

    /// Configure the factory to fail engine creation.
    pub fn failing() -> Self {
        let mut factory = Self::new(Vec::new());
        factory.fail_create = true;
        factory
    }

    /// Number of engine instances created so far.
    pub fn created(&self) -> u32 {
        *self
            .created
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Languages the created engines were bound to, in order.
    pub fn languages(&self) -> Vec<String> {
        self.languages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn create(
        &self,
        language: &str,
        events: UnboundedSender<EngineEvent>,
    ) -> Result<Box<dyn RecognitionEngine>> {
        if self.fail_create {
            return Err(crate::error::ConfabError::Recognition {
                message: "engine unavailable".to_string(),
            });
        }
        *self
            .created
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) += 1;
        self.languages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(language.to_string());
        Ok(Box::new(ScriptedEngine {
            script: Arc::clone(&self.script),
            events,
            stopped: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_engine_error_fatality() {
        assert!(EngineError::PermissionDenied.is_fatal());
        assert!(EngineError::DeviceUnavailable.is_fatal());
        assert!(!EngineError::NoSpeech.is_fatal());
        assert!(!EngineError::Aborted.is_fatal());
        assert!(!EngineError::Network.is_fatal());
        assert!(!EngineError::Other("weird".to_string()).is_fatal());
    }

    #[test]
    fn test_scripted_engine_replays_batches_per_start() {
        let factory = ScriptedEngineFactory::new(vec![
            vec![EngineEvent::Began, EngineEvent::Ended],
            vec![EngineEvent::Began],
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut first = factory.create("en-US", tx.clone()).unwrap();
        first.start().unwrap();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Began);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Ended);

        let mut second = factory.create("en-US", tx).unwrap();
        second.start().unwrap();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Began);
        assert!(rx.try_recv().is_err());

        assert_eq!(factory.created(), 2);
        assert_eq!(factory.languages(), vec!["en-US", "en-US"]);
    }

    #[test]
    fn test_scripted_engine_stop_emits_single_ended() {
        let factory = ScriptedEngineFactory::new(vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut engine = factory.create("en-US", tx).unwrap();
        engine.stop();
        engine.stop();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Ended);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failing_factory() {
        let factory = ScriptedEngineFactory::failing();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(factory.create("en-US", tx).is_err());
    }
}
