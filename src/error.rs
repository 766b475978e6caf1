//! Error types for confab.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfabError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio device errors
    #[error("Audio device unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("Audio capture permission denied: {message}")]
    PermissionDenied { message: String },

    // Recognition errors
    #[error("Recognition engine error: {message}")]
    Recognition { message: String },

    #[error("Recognition engine restart budget exhausted after {restarts} restarts")]
    RestartsExhausted { restarts: u32 },

    #[error("A meeting session is already running")]
    SessionActive,

    // Transcript data errors
    #[error("Malformed transcript document: {0}")]
    TranscriptData(#[from] serde_json::Error),

    #[error("Snapshot store error: {message}")]
    Snapshot { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ConfabError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_device_unavailable_display() {
        let error = ConfabError::DeviceUnavailable {
            message: "no microphone".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device unavailable: no microphone");
    }

    #[test]
    fn test_permission_denied_display() {
        let error = ConfabError::PermissionDenied {
            message: "capture blocked".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio capture permission denied: capture blocked"
        );
    }

    #[test]
    fn test_restarts_exhausted_display() {
        let error = ConfabError::RestartsExhausted { restarts: 100 };
        assert_eq!(
            error.to_string(),
            "Recognition engine restart budget exhausted after 100 restarts"
        );
    }

    #[test]
    fn test_session_active_display() {
        assert_eq!(
            ConfabError::SessionActive.to_string(),
            "A meeting session is already running"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: ConfabError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: ConfabError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let error: ConfabError = json_error.into();
        assert!(error.to_string().contains("Malformed transcript document"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ConfabError>();
        assert_sync::<ConfabError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
