//! Foreign inference module boundary.
//!
//! The engine drives a precompiled speech-to-text inference module through
//! a C ABI loaded at runtime. Build variants of the module export
//! different subsets of the surface, so the loader resolves every symbol
//! once and records what it found as [`Capabilities`]; the rest of the
//! engine branches on that record instead of re-probing.
//!
//! Module ABI (sessions are opaque non-zero integer ids; all calls are
//! synchronous):
//!
//! | Symbol | Required | Purpose |
//! |--------|----------|---------|
//! | `stt_runtime_ready() -> int` | no | 1 once background init finished |
//! | `stt_set_print(cb, user)` | yes | install the print/output callback |
//! | `stt_vfs_write(name, ptr, len) -> int` | no | stage a file in the module VFS |
//! | `stt_open(name) -> int` | yes | open a session against a VFS model |
//! | `stt_open_buffer(ptr, len) -> int` | no | open a session from host memory |
//! | `stt_close(session)` | yes | release a session |
//! | `stt_full(session, samples, n, lang, threads, translate) -> int` | yes | transcribe |
//! | `stt_full_minimal(session, samples, n) -> int` | no | reduced-parameter variant |
//! | `stt_full_headless(samples, n) -> int` | no | session-less variant |
//! | `stt_n_segments(session) -> int` | no | segment count of the last call |
//! | `stt_segment_text(session, i) -> *char` | no | segment text |
//! | `stt_segment_bounds(session, i, *t0, *t1) -> int` | no | segment times (ms) |

pub mod bootstrap;
pub mod native;
pub mod runtime;

#[cfg(test)]
pub(crate) mod fake;

/// Result code for a successful foreign call.
pub const RESULT_OK: i32 = 0;

/// Result code the module returns when the native stack was exhausted
/// during a call.
pub const RESULT_STACK_EXHAUSTED: i32 = -9;

/// Opaque session id bound to one provisioned model.
///
/// The module hands out non-zero ids; zero means initialization failed
/// and must be treated as failure, never as a usable handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle(pub(crate) i32);

impl SessionHandle {
    /// The dummy id some module variants accept when no real session
    /// could be opened.
    pub const PLACEHOLDER: SessionHandle = SessionHandle(1);

    pub fn id(&self) -> i32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// Capability surface negotiated once at module load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `stt_runtime_ready` exported: readiness can be polled
    pub has_ready_probe: bool,
    /// `stt_vfs_write` exported: a virtual filesystem exists
    pub has_vfs: bool,
    /// `stt_open_buffer` exported: sessions can start from host memory
    pub has_buffer_init: bool,
    /// `stt_full_minimal` exported
    pub has_minimal_call: bool,
    /// `stt_full_headless` exported
    pub has_headless_call: bool,
    /// segment count/text symbols exported
    pub has_segment_api: bool,
}

/// A calling convention for the transcription entry point, ranked by the
/// invoker and tried in order until one succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStrategy {
    /// Full parameter set: session, language, threads, translate flag
    Full,
    /// Reduced parameters: empty language, single thread
    Minimal,
    /// Dummy session id for when the real handle is invalid
    PlaceholderHandle,
    /// No session at all, for variants exposing a handle-less call
    Handleless,
}

impl CallStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            CallStrategy::Full => "full",
            CallStrategy::Minimal => "minimal",
            CallStrategy::PlaceholderHandle => "placeholder-handle",
            CallStrategy::Handleless => "handleless",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_session_is_invalid() {
        assert!(!SessionHandle(0).is_valid());
        assert!(SessionHandle(7).is_valid());
        assert!(SessionHandle::PLACEHOLDER.is_valid());
    }

    #[test]
    fn test_strategy_names_are_distinct() {
        let names = [
            CallStrategy::Full.name(),
            CallStrategy::Minimal.name(),
            CallStrategy::PlaceholderHandle.name(),
            CallStrategy::Handleless.name(),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
