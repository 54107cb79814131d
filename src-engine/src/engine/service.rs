//! Transcription service facade.
//!
//! Owns the process-wide module state and orchestrates the pipeline:
//! module bootstrap, model provisioning, audio preprocessing, the
//! capture-wrapped foreign invocation, and result assembly.
//!
//! Lifecycle: `Uninitialized → Loading → Ready → (Transcribing → Ready)* → Closed`.
//! All state lives behind one lock; a second concurrent `transcribe()`
//! waits for the first instead of interleaving, because the module's
//! session and captured-output state are singleton and mutation-unsafe
//! under concurrency.

use std::sync::{Arc, Mutex, MutexGuard};

use sotto_common::{EngineStatus, TranscribeOptions, TranscriptionResult};
use tracing::{debug, info, warn};

use super::{capture, invoker};
use crate::audio;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{self, ActiveModel};
use crate::module::bootstrap;
use crate::module::runtime::{InvokeParams, ModuleRuntime};
use crate::module::SessionHandle;

/// Lifecycle state of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceState {
    Uninitialized,
    Loading,
    Ready,
    Transcribing,
    Closed,
}

impl ServiceState {
    fn as_str(self) -> &'static str {
        match self {
            ServiceState::Uninitialized => "uninitialized",
            ServiceState::Loading => "loading",
            ServiceState::Ready => "ready",
            ServiceState::Transcribing => "transcribing",
            ServiceState::Closed => "closed",
        }
    }
}

struct ServiceInner {
    state: ServiceState,
    runtime: Option<Arc<dyn ModuleRuntime>>,
    session: Option<SessionHandle>,
    active_model: Option<ActiveModel>,
    completed: u32,
}

/// The transcription service. One instance owns the module handle, the
/// active model, and the session bound to it; drop or [`close`] releases
/// them.
///
/// [`close`]: TranscriptionService::close
pub struct TranscriptionService {
    config: EngineConfig,
    inner: Mutex<ServiceInner>,
}

impl TranscriptionService {
    /// Create a service. The module is not loaded until the first
    /// `transcribe()` call.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(ServiceInner {
                state: ServiceState::Uninitialized,
                runtime: None,
                session: None,
                active_model: None,
                completed: 0,
            }),
        }
    }

    /// Create a service driving an already-loaded module runtime.
    ///
    /// Used by embedders that manage module loading themselves, and by
    /// tests substituting a scripted module.
    pub fn with_runtime(config: EngineConfig, runtime: Arc<dyn ModuleRuntime>) -> Self {
        Self {
            config,
            inner: Mutex::new(ServiceInner {
                state: ServiceState::Ready,
                runtime: Some(runtime),
                session: None,
                active_model: None,
                completed: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceInner> {
        // A panic mid-transcription poisons the lock; the state machine
        // is still coherent, so recover the guard.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Transcribe one audio input (any supported container format).
    ///
    /// Calls are serialized: a second caller waits until the in-flight
    /// transcription finishes. There is no cancellation of an in-flight
    /// foreign call - pre-truncate input instead.
    pub fn transcribe(
        &self,
        bytes: &[u8],
        extension_hint: Option<&str>,
        opts: &TranscribeOptions,
    ) -> Result<TranscriptionResult, EngineError> {
        let mut inner = self.lock();

        if inner.state == ServiceState::Closed {
            return Err(EngineError::Closed);
        }

        self.ensure_loaded(&mut inner)?;
        self.ensure_model(&mut inner)?;

        let audio = audio::normalize(bytes, extension_hint)?;
        let duration_ms = audio.duration_ms();
        debug!(
            "normalized input: {} samples, {}ms",
            audio.samples.len(),
            duration_ms
        );

        let runtime = inner
            .runtime
            .clone()
            .ok_or_else(|| EngineError::ModuleLoad("runtime handle missing".into()))?;
        let session = inner.session;
        let params = InvokeParams {
            language: opts.language.clone(),
            threads: opts.threads,
            translate: opts.translate,
        };

        inner.state = ServiceState::Transcribing;
        let (invoked, captured) = capture::with_capture(runtime.as_ref(), || {
            invoker::invoke(
                runtime.as_ref(),
                session,
                &audio.samples,
                &params,
                self.config.max_samples,
            )
        });
        inner.state = ServiceState::Ready;
        invoked?;

        // Prefer the module's segment api; fall back to segments parsed
        // from the captured transcript lines.
        let segments = match (runtime.capabilities().has_segment_api, session) {
            (true, Some(session)) => runtime
                .segments(session)
                .unwrap_or_else(|_| captured.segments.clone()),
            _ => captured.segments.clone(),
        };

        let text = captured.text.trim().to_string();
        let confidence = estimate_confidence(&text, duration_ms);
        inner.completed += 1;

        info!(
            "transcription complete: {}ms of audio -> {} chars (confidence {:.2})",
            duration_ms,
            text.len(),
            confidence
        );

        Ok(TranscriptionResult {
            text,
            segments,
            language: opts.language.clone().unwrap_or_else(|| "auto".to_string()),
            duration_ms,
            confidence,
        })
    }

    /// Current lifecycle and model state.
    pub fn status(&self) -> EngineStatus {
        let inner = self.lock();
        EngineStatus {
            module_loaded: inner.runtime.is_some(),
            model_loaded: inner.session.is_some(),
            active_model: inner.active_model.as_ref().map(|m| m.name.clone()),
            state: inner.state.as_str().to_string(),
            transcriptions_completed: inner.completed,
        }
    }

    /// Release the session and the module handle. Any call after this
    /// fails with an explicit closed error rather than reinitializing.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state == ServiceState::Closed {
            return;
        }

        if let (Some(runtime), Some(session)) = (&inner.runtime, inner.session) {
            runtime.close_session(session);
        }
        inner.session = None;
        inner.active_model = None;
        inner.runtime = None;
        inner.state = ServiceState::Closed;
        info!("transcription service closed");
    }

    /// Bootstrap the module on first use; later calls reuse the handle.
    fn ensure_loaded(&self, inner: &mut ServiceInner) -> Result<(), EngineError> {
        if inner.runtime.is_some() {
            return Ok(());
        }

        inner.state = ServiceState::Loading;
        match bootstrap::load(&self.config) {
            Ok(loaded) => {
                inner.runtime = Some(loaded.runtime);
                inner.state = ServiceState::Ready;
                Ok(())
            }
            Err(e) => {
                // Bootstrap failure is fatal for this call but leaves the
                // service usable for a retry
                inner.state = ServiceState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Provision a model and open the session on first use. Idempotent
    /// after the first success.
    fn ensure_model(&self, inner: &mut ServiceInner) -> Result<(), EngineError> {
        if inner.session.is_some() {
            return Ok(());
        }

        let runtime = inner
            .runtime
            .clone()
            .ok_or_else(|| EngineError::ModuleLoad("runtime handle missing".into()))?;

        let model_dir = self
            .config
            .model_dir
            .clone()
            .unwrap_or_else(model::default_model_dir);

        let active = match inner.active_model.clone() {
            Some(active) => active,
            None => {
                let candidates =
                    model::candidates_for(self.config.model.as_deref(), &model_dir);
                let active = model::provision::provision(runtime.as_ref(), &candidates, &model_dir)?;
                inner.active_model = Some(active.clone());
                active
            }
        };

        // A failed session init is not fatal: the invoker falls back to
        // the placeholder-handle convention when no valid session exists.
        match runtime.open_session(&active) {
            Ok(session) => {
                debug!("session {} opened for model '{}'", session.id(), active.name);
                inner.session = Some(session);
            }
            Err(e) => {
                warn!(
                    "session init failed for model '{}' ({}); proceeding without a session",
                    active.name, e
                );
            }
        }
        Ok(())
    }
}

impl Drop for TranscriptionService {
    fn drop(&mut self) {
        self.close();
    }
}

/// Heuristic transcript confidence from text shape and speaking pace.
fn estimate_confidence(text: &str, duration_ms: u64) -> f32 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.2;
    }

    let mut confidence = 0.5f32;

    // Plausible speaking pace lands between 10 and 100 chars/second
    let secs = (duration_ms as f32 / 1000.0).max(0.1);
    let chars_per_second = trimmed.len() as f32 / secs;
    if (10.0..100.0).contains(&chars_per_second) {
        confidence += 0.2;
    } else {
        confidence -= 0.1;
    }

    if trimmed.chars().next().map_or(false, |c| c.is_uppercase()) {
        confidence += 0.1;
    }

    if trimmed.contains("...") || trimmed.contains("???") {
        confidence -= 0.2;
    } else if trimmed.ends_with(['.', '?', '!']) {
        confidence += 0.1;
    }

    confidence.clamp(0.0, 1.0)
}
