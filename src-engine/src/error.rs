//! Error types for transcription engine operations.

use std::fmt;

/// Error type for transcription engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// The inference module could not be loaded or never became callable
    ModuleLoad(String),
    /// No model candidate could be made available to the module
    ModelProvision(String),
    /// Input audio could not be decoded
    AudioDecode(String),
    /// The foreign transcription call failed after every calling strategy
    Invocation(String),
    /// The foreign call exhausted the native stack
    StackOverflow,
    /// The service has been closed
    Closed,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ModuleLoad(msg) => write!(f, "Inference module unavailable: {}", msg),
            EngineError::ModelProvision(msg) => write!(f, "Model provisioning failed: {}", msg),
            EngineError::AudioDecode(msg) => write!(f, "Audio decode failed: {}", msg),
            EngineError::Invocation(msg) => write!(f, "Transcription call failed: {}", msg),
            EngineError::StackOverflow => write!(
                f,
                "Transcription exhausted the native stack; reduce the input length and try again"
            ),
            EngineError::Closed => write!(f, "Transcription service is closed"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for String {
    fn from(err: EngineError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_overflow_message_is_actionable() {
        let msg = EngineError::StackOverflow.to_string();
        assert!(msg.contains("reduce the input length"), "Got: {}", msg);
    }

    #[test]
    fn test_error_converts_to_string() {
        let s: String = EngineError::ModelProvision("no candidate".into()).into();
        assert!(s.contains("no candidate"));
    }
}
