//! Sotto Engine
//!
//! Local, offline speech-to-text. The engine loads a precompiled native
//! inference module at runtime, provisions a model binary into the
//! module's virtual filesystem (or host memory when the loaded variant
//! has none), normalizes input audio, and drives the module's
//! synchronous transcription entry point with defensive limits.
//!
//! ```text
//! audio bytes (WAV/MP3/OGG/FLAC/M4A/AAC)
//!        │
//!        ▼
//! audio::normalize          - decode, downmix, resample to 16kHz mono
//!        │
//!        ▼
//! TranscriptionService      - module bootstrap + model provisioning
//!        │
//!        ▼
//! engine::invoker           - truncation cap, strategy ladder
//!        │
//!        ▼
//! engine::capture           - transcript reconstructed from print hook
//! ```
//!
//! No network call is made during transcription; the network is touched
//! only to fetch model binaries into the local cache.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod module;

pub use config::EngineConfig;
pub use engine::service::TranscriptionService;
pub use error::EngineError;
pub use sotto_common::{EngineStatus, TranscribeOptions, TranscriptSegment, TranscriptionResult};
