//! Transcript capture from the module's print side channel.
//!
//! The inference module emits its results through a logging-style print
//! callback rather than a return value. Around each invocation the
//! engine swaps in a capturing hook, reconstructs the transcript from
//! the captured lines afterwards, and always restores the previous hook.

use std::sync::{Arc, Mutex};

use sotto_common::TranscriptSegment;
use tracing::debug;

use crate::module::runtime::{ModuleRuntime, PrintHook};

/// Line prefixes the module emits for diagnostics rather than transcript.
const NOISE_PREFIXES: &[&str] = &[
    "stt_",
    "ggml_",
    "system_info",
    "progress",
    "model:",
    "init:",
    "load:",
];

/// Output reconstructed from one capture window.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    /// Transcript text, filtered and joined with single spaces
    pub text: String,
    /// Segments parsed from timestamped transcript lines, when present
    pub segments: Vec<TranscriptSegment>,
}

/// Restores the previously installed print hook when dropped, so the
/// hook chain survives panics and early returns inside the capture
/// window.
struct HookGuard<'a> {
    runtime: &'a dyn ModuleRuntime,
    previous: Option<PrintHook>,
}

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        self.runtime.install_print_hook(self.previous.take());
    }
}

/// Run `f` with the module's print output captured.
///
/// Captured lines are forwarded to the previously installed hook as
/// well, so host-level logging keeps working during the call.
pub fn with_capture<R>(runtime: &dyn ModuleRuntime, f: impl FnOnce() -> R) -> (R, CapturedOutput) {
    let buffer: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let previous = runtime.install_print_hook(None);
    let forward = previous.clone();
    let sink = Arc::clone(&buffer);
    runtime.install_print_hook(Some(Arc::new(move |line: &str| {
        if let Ok(mut lines) = sink.lock() {
            lines.push(line.to_string());
        }
        if let Some(prev) = &forward {
            prev(line);
        }
    })));
    let guard = HookGuard { runtime, previous };

    let result = f();
    drop(guard);

    let lines = buffer.lock().map(|l| l.clone()).unwrap_or_default();
    (result, reconstruct(&lines))
}

/// Rebuild the transcript from captured lines.
///
/// Known diagnostic lines are dropped and timestamped transcript lines
/// are parsed into segments. If filtering leaves nothing but lines were
/// captured, the full unfiltered capture is returned instead - losing
/// output entirely is worse than including noise.
fn reconstruct(lines: &[String]) -> CapturedOutput {
    let mut parts: Vec<String> = Vec::new();
    let mut segments: Vec<TranscriptSegment> = Vec::new();

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() || is_noise(line) {
            continue;
        }

        if let Some((start_ms, end_ms, text)) = parse_timestamped_line(line) {
            if !text.is_empty() {
                parts.push(text.to_string());
                segments.push(TranscriptSegment {
                    start_ms,
                    end_ms,
                    text: text.to_string(),
                });
            }
            continue;
        }

        parts.push(line.to_string());
    }

    let mut text = parts.join(" ").trim().to_string();
    if text.is_empty() && !lines.is_empty() {
        debug!("transcript filter matched nothing; falling back to the unfiltered capture");
        text = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }

    CapturedOutput { text, segments }
}

fn is_noise(line: &str) -> bool {
    NOISE_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Parse a `[HH:MM:SS.mmm --> HH:MM:SS.mmm]  text` transcript line.
fn parse_timestamped_line(line: &str) -> Option<(u64, u64, &str)> {
    let rest = line.strip_prefix('[')?;
    let close = rest.find(']')?;
    let (range, text) = (&rest[..close], rest[close + 1..].trim());
    let (start, end) = range.split_once("-->")?;
    let start_ms = parse_timestamp(start.trim())?;
    let end_ms = parse_timestamp(end.trim())?;
    Some((start_ms, end_ms, text))
}

/// Parse `HH:MM:SS.mmm` into milliseconds.
fn parse_timestamp(ts: &str) -> Option<u64> {
    let (hms, millis) = ts.split_once('.')?;
    let millis: u64 = millis.parse().ok()?;
    let mut fields = hms.split(':');
    let hours: u64 = fields.next()?.parse().ok()?;
    let minutes: u64 = fields.next()?.parse().ok()?;
    let seconds: u64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}
