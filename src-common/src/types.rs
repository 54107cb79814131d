//! Shared types for transcription operations.

use serde::{Deserialize, Serialize};

/// A single transcribed segment with timing information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in milliseconds from the beginning of the audio
    pub start_ms: u64,
    /// End time in milliseconds
    pub end_ms: u64,
    /// Transcribed text for this segment
    pub text: String,
}

/// Result of a completed transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The full transcribed text
    pub text: String,
    /// Per-segment timing. Empty when the inference module does not expose
    /// segment timing for this build variant.
    pub segments: Vec<TranscriptSegment>,
    /// Language the audio was transcribed as (requested code, or "auto")
    pub language: String,
    /// Duration of the decoded audio in milliseconds
    pub duration_ms: u64,
    /// Heuristic confidence score (0.0 to 1.0)
    pub confidence: f32,
}

/// Options for a single transcription call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeOptions {
    /// Target language (ISO 639-1 code like "en"). None lets the module
    /// auto-detect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Translate the transcript to English
    #[serde(default)]
    pub translate: bool,
    /// Number of threads the module may use for the call
    pub threads: u32,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: None,
            translate: false,
            threads: 4,
        }
    }
}

/// Status of the transcription engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Whether the inference module is loaded
    pub module_loaded: bool,
    /// Whether a model has been provisioned and a session is open
    pub model_loaded: bool,
    /// Name of the active model, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_model: Option<String>,
    /// Lifecycle state of the service ("uninitialized", "ready", "closed")
    pub state: String,
    /// Number of transcriptions completed since startup
    pub transcriptions_completed: u32,
}
