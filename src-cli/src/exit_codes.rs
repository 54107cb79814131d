//! Exit codes for the CLI.
//!
//! These codes enable scripting integration by providing structured
//! feedback about operation results.

use sotto_engine::EngineError;

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Invalid command-line arguments or unreadable input file
    InvalidArguments = 2,
    /// The inference module could not be loaded
    ModuleUnavailable = 3,
    /// No model binary could be obtained
    ModelUnavailable = 4,
    /// The input audio could not be decoded
    DecodeFailed = 5,
    /// The transcription call failed
    TranscriptionFailed = 6,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map an engine error onto the exit code taxonomy.
    pub fn from_engine_error(err: &EngineError) -> Self {
        match err {
            EngineError::ModuleLoad(_) => ExitCode::ModuleUnavailable,
            EngineError::ModelProvision(_) => ExitCode::ModelUnavailable,
            EngineError::AudioDecode(_) => ExitCode::DecodeFailed,
            EngineError::Invocation(_) | EngineError::StackOverflow => {
                ExitCode::TranscriptionFailed
            }
            EngineError::Closed => ExitCode::GeneralError,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::ModuleUnavailable => write!(f, "inference module unavailable"),
            ExitCode::ModelUnavailable => write!(f, "model unavailable"),
            ExitCode::DecodeFailed => write!(f, "audio decode failed"),
            ExitCode::TranscriptionFailed => write!(f, "transcription failed"),
        }
    }
}
