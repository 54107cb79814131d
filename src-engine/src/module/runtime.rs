//! The module capability surface the engine consumes.

use std::sync::Arc;

use sotto_common::TranscriptSegment;

use super::{Capabilities, CallStrategy, SessionHandle};
use crate::model::ActiveModel;

/// Print-style output hook. The module emits transcript text and
/// diagnostics through this side channel rather than return values.
pub type PrintHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Parameters for a foreign transcription call.
#[derive(Debug, Clone)]
pub struct InvokeParams {
    /// Language code, None for auto-detection
    pub language: Option<String>,
    /// Threads the module may use
    pub threads: u32,
    /// Translate output to English
    pub translate: bool,
}

impl InvokeParams {
    /// The reduced parameter set used by fallback strategies.
    pub fn minimal() -> Self {
        Self {
            language: None,
            threads: 1,
            translate: false,
        }
    }
}

/// Abstraction over the loaded inference module.
///
/// The engine talks to the module exclusively through this trait. The
/// production implementation wraps the dynamically loaded library
/// ([`super::native::NativeModule`]); tests substitute a scripted double.
pub trait ModuleRuntime: Send + Sync {
    /// Capabilities negotiated at load time.
    fn capabilities(&self) -> Capabilities;

    /// Whether the module runtime reports itself callable. Variants
    /// without a readiness probe always report true.
    fn is_ready(&self) -> bool;

    /// Stage a file into the module's virtual filesystem.
    fn vfs_write(&self, name: &str, bytes: &[u8]) -> Result<(), String>;

    /// Open a session bound to a provisioned model. A zero id from the
    /// module is reported as an error, never as a handle.
    fn open_session(&self, model: &ActiveModel) -> Result<SessionHandle, String>;

    /// Release a session.
    fn close_session(&self, session: SessionHandle);

    /// Invoke the transcription entry point with one calling strategy.
    ///
    /// `Ok` carries the module's result code (zero is success); `Err`
    /// means the call itself could not be made (missing symbol, invalid
    /// arguments).
    fn invoke(
        &self,
        strategy: CallStrategy,
        session: Option<SessionHandle>,
        samples: &[f32],
        params: &InvokeParams,
    ) -> Result<i32, String>;

    /// Swap the module's print hook, returning the previously installed
    /// one. `None` uninstalls.
    fn install_print_hook(&self, hook: Option<PrintHook>) -> Option<PrintHook>;

    /// Per-segment output of the last completed call, when the module
    /// variant exposes segment timing.
    fn segments(&self, session: SessionHandle) -> Result<Vec<TranscriptSegment>, String>;
}
