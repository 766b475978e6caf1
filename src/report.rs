//! Status and error reporting for long-running sessions.

/// Trait for reporting session-level conditions.
///
/// Benign and transient conditions are reported here rather than surfaced as
/// failures; fatal conditions are reported *and* returned as errors.
pub trait Reporter: Send + Sync {
    /// Reports a condition from the named source component.
    fn report(&self, source: &str, message: &str);
}

/// Simple reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, source: &str, message: &str) {
        eprintln!("[{}] {}", source, message);
    }
}

/// Reporter that discards everything; useful in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _source: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_reporter_does_not_panic() {
        LogReporter.report("session", "engine restarted");
    }

    #[test]
    fn test_null_reporter_discards() {
        NullReporter.report("session", "ignored");
    }
}
