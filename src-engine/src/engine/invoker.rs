//! Safe invocation of the foreign transcription entry point.
//!
//! The module's entry point is synchronous and runs on the caller's
//! stack, so two defenses apply before every call: oversized inputs are
//! truncated to a conservative ceiling, and a ranked list of calling
//! conventions is tried in order until one returns success.

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::module::runtime::{InvokeParams, ModuleRuntime};
use crate::module::{CallStrategy, SessionHandle, RESULT_OK, RESULT_STACK_EXHAUSTED};

/// Ceiling on the number of samples handed to a single foreign call
/// (~31 seconds at 16kHz). Longer inputs are truncated, not rejected.
pub const MAX_INVOCATION_SAMPLES: usize = 500_000;

/// Build the ranked strategy ladder for this call.
///
/// A valid session gets the full convention with the minimal one as
/// fallback; an invalid session goes straight to the placeholder handle.
/// The handle-less convention closes the ladder on variants that export
/// one.
fn strategy_ladder(
    session: Option<SessionHandle>,
    runtime: &dyn ModuleRuntime,
) -> Vec<CallStrategy> {
    let mut ladder = Vec::new();

    if session.map(|s| s.is_valid()).unwrap_or(false) {
        ladder.push(CallStrategy::Full);
        ladder.push(CallStrategy::Minimal);
    } else {
        ladder.push(CallStrategy::PlaceholderHandle);
    }

    if runtime.capabilities().has_headless_call {
        ladder.push(CallStrategy::Handleless);
    }

    ladder
}

fn params_for(strategy: CallStrategy, params: &InvokeParams) -> InvokeParams {
    match strategy {
        CallStrategy::Full => params.clone(),
        _ => InvokeParams::minimal(),
    }
}

/// Run the foreign transcription call with truncation and strategy
/// fallback. Returns the module's success code, or the error of the last
/// strategy once every convention has been tried.
pub fn invoke(
    runtime: &dyn ModuleRuntime,
    session: Option<SessionHandle>,
    samples: &[f32],
    params: &InvokeParams,
    max_samples: usize,
) -> Result<i32, EngineError> {
    let samples = if samples.len() > max_samples {
        warn!(
            "input of {} samples exceeds the invocation limit; truncating to {} (~{}s of audio)",
            samples.len(),
            max_samples,
            max_samples / 16_000
        );
        &samples[..max_samples]
    } else {
        samples
    };

    let ladder = strategy_ladder(session, runtime);
    let mut attempted: Vec<&'static str> = Vec::new();
    let mut overflow_seen = false;
    let mut last_failure = String::new();

    for strategy in ladder {
        attempted.push(strategy.name());

        match runtime.invoke(strategy, session, samples, &params_for(strategy, params)) {
            Ok(RESULT_OK) => {
                if attempted.len() > 1 {
                    debug!(
                        "strategy '{}' succeeded after {} failed attempt(s)",
                        strategy.name(),
                        attempted.len() - 1
                    );
                }
                return Ok(RESULT_OK);
            }
            Ok(code) => {
                if code == RESULT_STACK_EXHAUSTED {
                    overflow_seen = true;
                }
                warn!("strategy '{}' returned code {}", strategy.name(), code);
                last_failure = format!("code {}", code);
            }
            Err(e) => {
                warn!("strategy '{}' failed: {}", strategy.name(), e);
                last_failure = e;
            }
        }
    }

    if overflow_seen {
        Err(EngineError::StackOverflow)
    } else {
        Err(EngineError::Invocation(format!(
            "{} (strategies tried: {})",
            last_failure,
            attempted.join(", ")
        )))
    }
}
