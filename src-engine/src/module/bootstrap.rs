//! Module loading and readiness negotiation.
//!
//! Loading walks a ranked search-path list, installs the host output
//! hooks, then waits for the module runtime to report itself callable.
//! Some build variants initialize a compute backend on a background
//! thread after the library maps, so symbol resolution succeeding does
//! not mean the module is ready - hence the poll loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::native::NativeModule;
use super::runtime::ModuleRuntime;
use super::Capabilities;
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Poll interval while waiting for the module runtime to become callable.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Give up waiting for readiness after this long. Timing out is fatal and
/// surfaced to the caller; it is not retried silently.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the module search path.
pub const MODULE_PATH_ENV: &str = "SOTTO_MODULE_PATH";

/// A loaded, ready-to-use inference module.
pub struct LoadedModule {
    pub runtime: Arc<dyn ModuleRuntime>,
    pub capabilities: Capabilities,
}

/// Platform file name of the inference module.
pub fn module_file_name() -> &'static str {
    if cfg!(windows) {
        "stt.dll"
    } else if cfg!(target_os = "macos") {
        "libstt.dylib"
    } else {
        "libstt.so"
    }
}

/// Resolve the module library path through the search ladder:
/// explicit config path, environment override, next to the executable,
/// current directory, then the bare name for the system loader.
pub fn resolve_module_path(config: &EngineConfig) -> PathBuf {
    if let Some(path) = &config.module_path {
        return path.clone();
    }

    if let Ok(env_path) = std::env::var(MODULE_PATH_ENV) {
        return PathBuf::from(env_path);
    }

    let name = module_file_name();
    let search_paths = [
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.join(name))),
        std::env::current_dir().ok().map(|p| p.join(name)),
    ];

    for path in search_paths.iter().flatten() {
        if path.exists() {
            return path.clone();
        }
    }

    // Fall through to the system loader
    PathBuf::from(name)
}

/// Load the inference module and wait until its runtime is callable.
pub fn load(config: &EngineConfig) -> Result<LoadedModule, EngineError> {
    let path = resolve_module_path(config);
    debug!("loading inference module from {}", path.display());

    let module = NativeModule::load(&path).map_err(EngineError::ModuleLoad)?;

    // Host hooks go in before the readiness wait so early module output
    // is not lost.
    module.install_print_hook(Some(Arc::new(|line: &str| {
        tracing::debug!(target: "sotto::module", "{}", line);
    })));

    wait_until_ready(&module, READY_POLL_INTERVAL, READY_TIMEOUT)?;

    let capabilities = module.capabilities();
    info!(
        "inference module ready (vfs: {}, buffer init: {}, headless: {}, segments: {})",
        capabilities.has_vfs,
        capabilities.has_buffer_init,
        capabilities.has_headless_call,
        capabilities.has_segment_api
    );
    if !capabilities.has_vfs {
        warn!("module variant has no virtual filesystem; model bytes will stay in host memory");
    }

    Ok(LoadedModule {
        runtime: Arc::new(module),
        capabilities,
    })
}

/// Poll the module until it reports ready, or fail after `timeout`.
///
/// Variants without a readiness probe are accepted as soon as their entry
/// points resolve (partial readiness).
pub(crate) fn wait_until_ready(
    runtime: &dyn ModuleRuntime,
    interval: Duration,
    timeout: Duration,
) -> Result<(), EngineError> {
    if !runtime.capabilities().has_ready_probe {
        debug!("module has no readiness probe; accepting partial readiness");
        return Ok(());
    }

    let start = Instant::now();
    let mut polls = 0u32;
    loop {
        if runtime.is_ready() {
            debug!("module runtime ready after {} polls", polls);
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(EngineError::ModuleLoad(format!(
                "runtime did not become callable within {:?} ({} polls)",
                timeout, polls
            )));
        }
        polls += 1;
        std::thread::sleep(interval);
    }
}
