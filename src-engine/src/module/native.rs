//! FFI bindings to the native inference module.
//!
//! The module is loaded dynamically with libloading. Required symbols
//! fail the load when absent; optional symbols are resolved individually
//! and recorded in [`Capabilities`] so the engine never probes twice.

use std::ffi::{c_char, c_float, c_int, c_void, CStr, CString};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use libloading::Library;
use sotto_common::TranscriptSegment;

use super::runtime::{InvokeParams, ModuleRuntime, PrintHook};
use super::{Capabilities, CallStrategy, SessionHandle};
use crate::model::{ActiveModel, ModelPlacement};

type PrintCallback = unsafe extern "C" fn(*const c_char, *mut c_void);

type ReadyFn = unsafe extern "C" fn() -> c_int;
type SetPrintFn = unsafe extern "C" fn(PrintCallback, *mut c_void);
type VfsWriteFn = unsafe extern "C" fn(*const c_char, *const u8, usize) -> c_int;
type OpenFn = unsafe extern "C" fn(*const c_char) -> c_int;
type OpenBufferFn = unsafe extern "C" fn(*const u8, usize) -> c_int;
type CloseFn = unsafe extern "C" fn(c_int);
type FullFn =
    unsafe extern "C" fn(c_int, *const c_float, c_int, *const c_char, c_int, c_int) -> c_int;
type FullMinimalFn = unsafe extern "C" fn(c_int, *const c_float, c_int) -> c_int;
type FullHeadlessFn = unsafe extern "C" fn(*const c_float, c_int) -> c_int;
type SegmentCountFn = unsafe extern "C" fn(c_int) -> c_int;
type SegmentTextFn = unsafe extern "C" fn(c_int, c_int) -> *const c_char;
type SegmentBoundsFn = unsafe extern "C" fn(c_int, c_int, *mut i64, *mut i64) -> c_int;

/// NUL-terminated empty language string for reduced-parameter calls.
const EMPTY_LANG: &[u8] = b"\0";

/// Global library handle. The module is loaded at most once per process;
/// a dynamic library cannot be safely unloaded while sessions may exist.
static MODULE_LIB: OnceLock<Option<Library>> = OnceLock::new();

/// Currently installed host print hook, called from the trampoline.
static PRINT_HOOK: OnceLock<Mutex<Option<PrintHook>>> = OnceLock::new();

fn hook_slot() -> &'static Mutex<Option<PrintHook>> {
    PRINT_HOOK.get_or_init(|| Mutex::new(None))
}

unsafe extern "C" fn print_trampoline(msg: *const c_char, _user: *mut c_void) {
    if msg.is_null() {
        return;
    }
    let text = CStr::from_ptr(msg).to_string_lossy().into_owned();
    // Clone the hook out of the slot so the lock is not held across the
    // callback (the hook may log or forward to a previous hook).
    let hook = match hook_slot().lock() {
        Ok(guard) => guard.clone(),
        Err(_) => return,
    };
    if let Some(hook) = hook {
        hook(&text);
    }
}

/// Safe wrapper around the loaded inference module.
pub struct NativeModule {
    ready: Option<ReadyFn>,
    vfs_write: Option<VfsWriteFn>,
    open: OpenFn,
    open_buffer: Option<OpenBufferFn>,
    close: CloseFn,
    full: FullFn,
    full_minimal: Option<FullMinimalFn>,
    full_headless: Option<FullHeadlessFn>,
    n_segments: Option<SegmentCountFn>,
    segment_text: Option<SegmentTextFn>,
    segment_bounds: Option<SegmentBoundsFn>,
    caps: Capabilities,
}

impl NativeModule {
    /// Load the inference module from `path` and resolve its symbol
    /// surface. The underlying library is loaded at most once per
    /// process; later calls reuse the existing mapping.
    pub fn load(path: &Path) -> Result<Self, String> {
        let lib = MODULE_LIB.get_or_init(|| match unsafe { Library::new(path) } {
            Ok(lib) => {
                tracing::info!("Loaded inference module from: {}", path.display());
                Some(lib)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load inference module from {}: {}",
                    path.display(),
                    e
                );
                None
            }
        });

        let lib = lib
            .as_ref()
            .ok_or_else(|| format!("inference module unavailable at {}", path.display()))?;
        Self::from_library(lib)
    }

    fn from_library(lib: &Library) -> Result<Self, String> {
        unsafe {
            // Required surface - absence is a load failure
            let open = *lib
                .get::<OpenFn>(b"stt_open\0")
                .map_err(|e| format!("missing stt_open: {}", e))?;
            let close = *lib
                .get::<CloseFn>(b"stt_close\0")
                .map_err(|e| format!("missing stt_close: {}", e))?;
            let full = *lib
                .get::<FullFn>(b"stt_full\0")
                .map_err(|e| format!("missing stt_full: {}", e))?;
            let set_print = *lib
                .get::<SetPrintFn>(b"stt_set_print\0")
                .map_err(|e| format!("missing stt_set_print: {}", e))?;

            // Optional surface - recorded as capabilities
            let ready = lib.get::<ReadyFn>(b"stt_runtime_ready\0").ok().map(|s| *s);
            let vfs_write = lib.get::<VfsWriteFn>(b"stt_vfs_write\0").ok().map(|s| *s);
            let open_buffer = lib
                .get::<OpenBufferFn>(b"stt_open_buffer\0")
                .ok()
                .map(|s| *s);
            let full_minimal = lib
                .get::<FullMinimalFn>(b"stt_full_minimal\0")
                .ok()
                .map(|s| *s);
            let full_headless = lib
                .get::<FullHeadlessFn>(b"stt_full_headless\0")
                .ok()
                .map(|s| *s);
            let n_segments = lib
                .get::<SegmentCountFn>(b"stt_n_segments\0")
                .ok()
                .map(|s| *s);
            let segment_text = lib
                .get::<SegmentTextFn>(b"stt_segment_text\0")
                .ok()
                .map(|s| *s);
            let segment_bounds = lib
                .get::<SegmentBoundsFn>(b"stt_segment_bounds\0")
                .ok()
                .map(|s| *s);

            let caps = Capabilities {
                has_ready_probe: ready.is_some(),
                has_vfs: vfs_write.is_some(),
                has_buffer_init: open_buffer.is_some(),
                has_minimal_call: full_minimal.is_some(),
                has_headless_call: full_headless.is_some(),
                has_segment_api: n_segments.is_some() && segment_text.is_some(),
            };

            // Register the trampoline before anything else can run; the
            // host hook behind it is swapped freely afterwards.
            set_print(print_trampoline, std::ptr::null_mut());

            Ok(Self {
                ready,
                vfs_write,
                open,
                open_buffer,
                close,
                full,
                full_minimal,
                full_headless,
                n_segments,
                segment_text,
                segment_bounds,
                caps,
            })
        }
    }

    fn call_full_reduced(&self, session_id: c_int, samples: &[f32]) -> i32 {
        unsafe {
            (self.full)(
                session_id,
                samples.as_ptr(),
                samples.len() as c_int,
                EMPTY_LANG.as_ptr().cast::<c_char>(),
                1,
                0,
            )
        }
    }
}

impl ModuleRuntime for NativeModule {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn is_ready(&self) -> bool {
        match self.ready {
            Some(f) => unsafe { f() == 1 },
            // Variants without a readiness probe are callable as soon as
            // the entry points resolved.
            None => true,
        }
    }

    fn vfs_write(&self, name: &str, bytes: &[u8]) -> Result<(), String> {
        let f = self
            .vfs_write
            .ok_or("module variant has no virtual filesystem")?;
        let c_name =
            CString::new(name).map_err(|_| "VFS name contains an interior NUL".to_string())?;
        let code = unsafe { f(c_name.as_ptr(), bytes.as_ptr(), bytes.len()) };
        if code == 0 {
            Ok(())
        } else {
            Err(format!("vfs write of '{}' failed with code {}", name, code))
        }
    }

    fn open_session(&self, model: &ActiveModel) -> Result<SessionHandle, String> {
        let id = match &model.placement {
            ModelPlacement::VirtualFs(name) => {
                let c_name = CString::new(name.as_str())
                    .map_err(|_| "model name contains an interior NUL".to_string())?;
                unsafe { (self.open)(c_name.as_ptr()) }
            }
            ModelPlacement::InMemory(bytes) => {
                let f = self
                    .open_buffer
                    .ok_or("module variant cannot initialize from host memory")?;
                unsafe { f(bytes.as_ptr(), bytes.len()) }
            }
        };

        if id == 0 {
            Err(format!("session init failed for model '{}'", model.name))
        } else {
            Ok(SessionHandle(id))
        }
    }

    fn close_session(&self, session: SessionHandle) {
        if session.is_valid() {
            unsafe { (self.close)(session.id()) }
        }
    }

    fn invoke(
        &self,
        strategy: CallStrategy,
        session: Option<SessionHandle>,
        samples: &[f32],
        params: &InvokeParams,
    ) -> Result<i32, String> {
        let n = samples.len() as c_int;

        match strategy {
            CallStrategy::Full => {
                let session = session
                    .filter(SessionHandle::is_valid)
                    .ok_or("no valid session for the full calling convention")?;
                let lang = CString::new(params.language.clone().unwrap_or_default())
                    .map_err(|_| "language code contains an interior NUL".to_string())?;
                let code = unsafe {
                    (self.full)(
                        session.id(),
                        samples.as_ptr(),
                        n,
                        lang.as_ptr(),
                        params.threads as c_int,
                        params.translate as c_int,
                    )
                };
                Ok(code)
            }
            CallStrategy::Minimal => {
                let session = session
                    .filter(SessionHandle::is_valid)
                    .ok_or("no valid session for the minimal calling convention")?;
                let code = match self.full_minimal {
                    Some(f) => unsafe { f(session.id(), samples.as_ptr(), n) },
                    // Reduced parameters through the full entry point
                    None => self.call_full_reduced(session.id(), samples),
                };
                Ok(code)
            }
            CallStrategy::PlaceholderHandle => {
                Ok(self.call_full_reduced(SessionHandle::PLACEHOLDER.id(), samples))
            }
            CallStrategy::Handleless => {
                let f = self
                    .full_headless
                    .ok_or("module variant has no handle-less entry point")?;
                Ok(unsafe { f(samples.as_ptr(), n) })
            }
        }
    }

    fn install_print_hook(&self, hook: Option<PrintHook>) -> Option<PrintHook> {
        match hook_slot().lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, hook),
            Err(_) => None,
        }
    }

    fn segments(&self, session: SessionHandle) -> Result<Vec<TranscriptSegment>, String> {
        let (count_fn, text_fn) = match (self.n_segments, self.segment_text) {
            (Some(c), Some(t)) => (c, t),
            _ => return Err("module variant has no segment api".to_string()),
        };

        let count = unsafe { count_fn(session.id()) };
        let mut segments = Vec::with_capacity(count.max(0) as usize);

        for i in 0..count {
            let ptr = unsafe { text_fn(session.id(), i) };
            if ptr.is_null() {
                continue;
            }
            let text = unsafe { CStr::from_ptr(ptr) }
                .to_string_lossy()
                .trim()
                .to_string();

            let (mut t0, mut t1) = (0i64, 0i64);
            if let Some(bounds_fn) = self.segment_bounds {
                unsafe { bounds_fn(session.id(), i, &mut t0, &mut t1) };
            }

            segments.push(TranscriptSegment {
                start_ms: t0.max(0) as u64,
                end_ms: t1.max(0) as u64,
                text,
            });
        }

        Ok(segments)
    }
}
