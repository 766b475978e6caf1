//! Restart-resilient recognition session.
//!
//! Wraps the external recognition engine as an explicit state machine:
//! `Idle → Starting → Listening ⇄ Speaking → Ending → {Listening | Stopped}`.
//! The engine's public contract offers no guarantee of continuous operation,
//! so every unrequested termination is treated as a restart signal, bounded by
//! a counter. The core is synchronous — every input returns the outputs it
//! caused — which makes termination and restart exhaustion directly testable;
//! the async driver in `meeting` executes the outputs (engine lifecycle,
//! restart delays).

use crate::config::RecognitionConfig;
use crate::error::ConfabError;
use crate::recognize::engine::{EngineError, EngineEvent};
use crate::transcript::Utterance;
use std::time::{Duration, Instant};

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never started.
    Idle,
    /// Engine requested, waiting for it to begin.
    Starting,
    /// Engine is live and waiting for speech.
    Listening,
    /// Speech detected in the input.
    Speaking,
    /// Engine terminated, restart decision pending.
    Ending,
    /// Stopped, either on request or fatally.
    Stopped,
}

/// Cosmetic status updates surfaced toward the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Starting,
    Listening,
    Speaking,
    /// The engine reported no speech; not an error.
    WaitingForSpeech,
    /// The engine died and a restart is scheduled.
    Restarting,
}

/// The transient preview of a not-yet-final recognition result.
///
/// Overwritten by each interim span and discarded at finalization; never
/// persisted as an utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct InterimUtterance {
    pub text: String,
    pub timestamp_ms: u64,
}

/// Effects the state machine asks its driver to perform, plus the durable
/// event stream (finals, interims, status, errors).
#[derive(Debug)]
pub enum SessionOutput {
    /// Instantiate a fresh engine bound to the configured language and start it.
    StartEngine,
    /// Request the current engine stop.
    StopEngine,
    /// Discard the current engine and start a fresh one after `delay`.
    RestartEngine { delay: Duration },
    /// A finalized utterance, never re-emitted across restarts.
    Final(Utterance),
    /// The interim preview changed.
    Interim(InterimUtterance),
    /// Cosmetic status change.
    Status(SessionStatus),
    /// A transient condition worth reporting; the session keeps running.
    Transient(EngineError),
    /// A fatal condition; the session has stopped.
    Fatal(ConfabError),
}

/// Restart-resilient recognition session state machine.
pub struct RecognitionSession<C: Clock = SystemClock> {
    config: RecognitionConfig,
    state: SessionState,
    /// Logical running flag; engine events arriving after stop must not
    /// resurrect the session.
    running: bool,
    restarts: u32,
    next_id: u64,
    started_at: Option<Instant>,
    interim: Option<InterimUtterance>,
    clock: C,
}

impl RecognitionSession<SystemClock> {
    /// Creates a session with the given configuration using the system clock.
    pub fn new(config: RecognitionConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RecognitionSession<C> {
    /// Creates a session with the given configuration and clock.
    pub fn with_clock(config: RecognitionConfig, clock: C) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            running: false,
            restarts: 0,
            next_id: 0,
            started_at: None,
            interim: None,
            clock,
        }
    }

    /// Begins a new logical session.
    ///
    /// Only valid from Idle or Stopped; a no-op otherwise. Resets the restart
    /// counter, the utterance id sequence, and the elapsed-time origin.
    pub fn start(&mut self) -> Vec<SessionOutput> {
        match self.state {
            SessionState::Idle | SessionState::Stopped => {
                self.running = true;
                self.restarts = 0;
                self.next_id = 0;
                self.started_at = Some(self.clock.now());
                self.interim = None;
                self.state = SessionState::Starting;
                vec![
                    SessionOutput::Status(SessionStatus::Starting),
                    SessionOutput::StartEngine,
                ]
            }
            _ => Vec::new(),
        }
    }

    /// Stops the session.
    ///
    /// Subsequent engine events — including the terminal `Ended` — are then
    /// expected and never trigger a restart.
    pub fn stop(&mut self) -> Vec<SessionOutput> {
        if !self.running {
            return Vec::new();
        }
        self.running = false;
        self.interim = None;
        self.state = SessionState::Stopped;
        vec![SessionOutput::StopEngine]
    }

    /// Feeds one engine event through the state machine.
    pub fn handle_event(&mut self, event: EngineEvent) -> Vec<SessionOutput> {
        if !self.running {
            // A just-terminated engine cannot resurrect a stopped session.
            return Vec::new();
        }

        match event {
            EngineEvent::Began => {
                self.state = SessionState::Listening;
                vec![SessionOutput::Status(SessionStatus::Listening)]
            }
            EngineEvent::SpeechStart => {
                self.state = SessionState::Speaking;
                vec![SessionOutput::Status(SessionStatus::Speaking)]
            }
            EngineEvent::SpeechEnd => {
                // Informational; the result event carries the payload.
                if self.state == SessionState::Speaking {
                    self.state = SessionState::Listening;
                }
                Vec::new()
            }
            EngineEvent::Result(spans) => self.handle_result(spans),
            EngineEvent::Error(error) => self.handle_error(error),
            EngineEvent::Ended => self.handle_ended(),
        }
    }

    /// Returns the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true while the session is logically running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of spontaneous restarts absorbed so far.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// The current interim preview, if any.
    pub fn current_interim(&self) -> Option<&InterimUtterance> {
        self.interim.as_ref()
    }

    /// Milliseconds since the session started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|start| self.clock.now().duration_since(start).as_millis() as u64)
            .unwrap_or(0)
    }

    fn handle_result(&mut self, spans: Vec<crate::recognize::engine::RecognizedSpan>) -> Vec<SessionOutput> {
        let timestamp_ms = self.elapsed_ms();
        let mut outputs = Vec::new();

        for span in spans {
            let text = span.text.trim();
            if text.is_empty() {
                continue;
            }

            if span.is_final {
                let utterance = Utterance::finalized(self.next_id, text, timestamp_ms, span.confidence);
                self.next_id += 1;
                self.interim = None;
                if self.state == SessionState::Speaking {
                    self.state = SessionState::Listening;
                }
                outputs.push(SessionOutput::Final(utterance));
                outputs.push(SessionOutput::Status(SessionStatus::Listening));
            } else {
                let interim = InterimUtterance {
                    text: text.to_string(),
                    timestamp_ms,
                };
                self.interim = Some(interim.clone());
                outputs.push(SessionOutput::Interim(interim));
            }
        }
        outputs
    }

    fn handle_error(&mut self, error: EngineError) -> Vec<SessionOutput> {
        match error {
            EngineError::NoSpeech => {
                vec![SessionOutput::Status(SessionStatus::WaitingForSpeech)]
            }
            EngineError::Aborted => Vec::new(),
            EngineError::PermissionDenied => self.stop_fatally(ConfabError::PermissionDenied {
                message: "capture permission denied".to_string(),
            }),
            EngineError::DeviceUnavailable => self.stop_fatally(ConfabError::DeviceUnavailable {
                message: "audio device unavailable".to_string(),
            }),
            error => vec![SessionOutput::Transient(error)],
        }
    }

    fn handle_ended(&mut self) -> Vec<SessionOutput> {
        self.state = SessionState::Ending;
        self.interim = None;
        self.restarts += 1;

        if self.restarts > self.config.max_restarts {
            let restarts = self.restarts - 1;
            return self.stop_fatally(ConfabError::RestartsExhausted { restarts });
        }

        self.state = SessionState::Starting;
        vec![
            SessionOutput::Status(SessionStatus::Restarting),
            SessionOutput::RestartEngine {
                delay: Duration::from_millis(self.config.restart_delay_ms),
            },
        ]
    }

    fn stop_fatally(&mut self, error: ConfabError) -> Vec<SessionOutput> {
        self.running = false;
        self.interim = None;
        self.state = SessionState::Stopped;
        vec![SessionOutput::Fatal(error)]
    }
}
