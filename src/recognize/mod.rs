//! Recognition engine boundary and the restart-resilient session wrapper.

pub mod engine;
pub mod session;

pub use engine::{
    EngineError, EngineEvent, EngineFactory, RecognitionEngine, RecognizedSpan, ScriptedEngine,
    ScriptedEngineFactory,
};
pub use session::{
    Clock, InterimUtterance, RecognitionSession, SessionOutput, SessionState, SessionStatus,
    SystemClock,
};
