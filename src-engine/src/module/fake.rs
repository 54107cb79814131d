//! Scripted module double for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use sotto_common::TranscriptSegment;

use super::runtime::{InvokeParams, ModuleRuntime, PrintHook};
use super::{Capabilities, CallStrategy, SessionHandle, RESULT_OK};
use crate::model::ActiveModel;

/// A scriptable stand-in for the native inference module.
///
/// Capabilities, readiness, per-strategy results, and emitted output
/// lines are all configurable; every interaction is recorded for
/// assertions.
pub(crate) struct FakeModule {
    caps: Capabilities,
    ready_countdown: AtomicU32,
    hook: Mutex<Option<PrintHook>>,
    vfs: Mutex<HashMap<String, usize>>,
    responses: Mutex<HashMap<CallStrategy, Result<i32, String>>>,
    lines: Mutex<Vec<String>>,
    emit_call_counter: bool,
    invoke_delay: Option<Duration>,
    fail_open: bool,

    next_session: AtomicI32,
    call_count: AtomicU32,
    pub last_invocation_len: AtomicUsize,
    pub invocations: Mutex<Vec<CallStrategy>>,
    pub closed_sessions: Mutex<Vec<SessionHandle>>,
    module_segments: Mutex<Vec<TranscriptSegment>>,
}

impl FakeModule {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            ready_countdown: AtomicU32::new(0),
            hook: Mutex::new(None),
            vfs: Mutex::new(HashMap::new()),
            responses: Mutex::new(HashMap::new()),
            lines: Mutex::new(Vec::new()),
            emit_call_counter: false,
            invoke_delay: None,
            fail_open: false,
            next_session: AtomicI32::new(7),
            call_count: AtomicU32::new(0),
            last_invocation_len: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
            closed_sessions: Mutex::new(Vec::new()),
            module_segments: Mutex::new(Vec::new()),
        }
    }

    /// Report not-ready for the first `polls` readiness checks.
    pub fn ready_after(self, polls: u32) -> Self {
        self.ready_countdown.store(polls, Ordering::SeqCst);
        self
    }

    /// Script the result of one calling strategy (default is Ok(0)).
    pub fn with_response(self, strategy: CallStrategy, response: Result<i32, String>) -> Self {
        if let Ok(mut map) = self.responses.lock() {
            map.insert(strategy, response);
        }
        self
    }

    /// Emit these lines through the print hook on every successful call.
    pub fn with_lines(self, lines: Vec<&str>) -> Self {
        if let Ok(mut slot) = self.lines.lock() {
            *slot = lines.into_iter().map(String::from).collect();
        }
        self
    }

    /// Emit "utterance N" (per-call counter) on every successful call.
    pub fn with_call_counter_lines(mut self) -> Self {
        self.emit_call_counter = true;
        self
    }

    /// Hold each invocation for `delay` before returning.
    pub fn with_invoke_delay(mut self, delay: Duration) -> Self {
        self.invoke_delay = Some(delay);
        self
    }

    /// Make session initialization return the invalid zero id.
    pub fn with_failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Segments reported by the module segment api.
    pub fn with_segments(self, segments: Vec<TranscriptSegment>) -> Self {
        if let Ok(mut slot) = self.module_segments.lock() {
            *slot = segments;
        }
        self
    }

    pub fn vfs_len(&self, name: &str) -> Option<usize> {
        self.vfs.lock().ok().and_then(|m| m.get(name).copied())
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Emit a line through whichever print hook is currently installed.
    pub fn emit_line(&self, line: &str) {
        let hook = self.hook.lock().ok().and_then(|g| g.clone());
        if let Some(hook) = hook {
            hook(line);
        }
    }
}

impl ModuleRuntime for FakeModule {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn is_ready(&self) -> bool {
        let remaining = self.ready_countdown.load(Ordering::SeqCst);
        if remaining == 0 {
            true
        } else {
            self.ready_countdown.store(remaining - 1, Ordering::SeqCst);
            false
        }
    }

    fn vfs_write(&self, name: &str, bytes: &[u8]) -> Result<(), String> {
        if !self.caps.has_vfs {
            return Err("module variant has no virtual filesystem".into());
        }
        if let Ok(mut vfs) = self.vfs.lock() {
            vfs.insert(name.to_string(), bytes.len());
        }
        Ok(())
    }

    fn open_session(&self, model: &ActiveModel) -> Result<SessionHandle, String> {
        if self.fail_open {
            return Err(format!("session init failed for model '{}'", model.name));
        }
        Ok(SessionHandle(self.next_session.fetch_add(1, Ordering::SeqCst)))
    }

    fn close_session(&self, session: SessionHandle) {
        if let Ok(mut closed) = self.closed_sessions.lock() {
            closed.push(session);
        }
    }

    fn invoke(
        &self,
        strategy: CallStrategy,
        _session: Option<SessionHandle>,
        samples: &[f32],
        _params: &InvokeParams,
    ) -> Result<i32, String> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(strategy);
        }
        self.last_invocation_len.store(samples.len(), Ordering::SeqCst);

        if let Some(delay) = self.invoke_delay {
            std::thread::sleep(delay);
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|map| map.get(&strategy).cloned())
            .unwrap_or(Ok(RESULT_OK));

        if response == Ok(RESULT_OK) {
            let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
            if self.emit_call_counter {
                self.emit_line(&format!("utterance {}", call));
            }
            let lines: Vec<String> = self
                .lines
                .lock()
                .map(|l| l.clone())
                .unwrap_or_default();
            for line in lines {
                self.emit_line(&line);
            }
        }

        response
    }

    fn install_print_hook(&self, hook: Option<PrintHook>) -> Option<PrintHook> {
        match self.hook.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, hook),
            Err(_) => None,
        }
    }

    fn segments(&self, _session: SessionHandle) -> Result<Vec<TranscriptSegment>, String> {
        if !self.caps.has_segment_api {
            return Err("module variant has no segment api".into());
        }
        Ok(self
            .module_segments
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default())
    }
}
