//! Sotto Common Library
//!
//! Shared types used by the Sotto transcription engine and the
//! command-line client.

pub mod logging;
pub mod types;

pub use types::*;
