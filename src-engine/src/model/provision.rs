//! Candidate provisioning: cache lookup, fetch, and module placement.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ActiveModel, ModelAsset, ModelOrigin, ModelPlacement, MIN_MODEL_BYTES};
use crate::error::EngineError;
use crate::module::runtime::ModuleRuntime;

/// Fetch callback: URL in, raw bytes out.
pub(crate) type Fetcher<'a> = &'a dyn Fn(&str) -> Result<Vec<u8>, String>;

/// Make one of the candidate models available to the loaded module.
///
/// Candidates are tried in priority order; the first success wins and the
/// remaining candidates are not attempted. A cache hit (by name, under
/// `model_dir`) short-circuits the fetch, so a second call with the same
/// candidate list performs no network traffic.
pub fn provision(
    runtime: &dyn ModuleRuntime,
    candidates: &[ModelAsset],
    model_dir: &Path,
) -> Result<ActiveModel, EngineError> {
    provision_with(runtime, candidates, model_dir, &fetch_blocking, MIN_MODEL_BYTES)
}

pub(crate) fn provision_with(
    runtime: &dyn ModuleRuntime,
    candidates: &[ModelAsset],
    model_dir: &Path,
    fetch: Fetcher<'_>,
    min_bytes: u64,
) -> Result<ActiveModel, EngineError> {
    if candidates.is_empty() {
        return Err(EngineError::ModelProvision("no candidates given".into()));
    }

    let mut failures: Vec<String> = Vec::new();

    for candidate in candidates {
        match obtain_bytes(candidate, model_dir, fetch, min_bytes) {
            Ok(bytes) => {
                let active = place(runtime, &candidate.name, bytes)
                    .map_err(EngineError::ModelProvision)?;
                info!(
                    "model '{}' provisioned ({} bytes, {:?})",
                    active.name, active.byte_len, active.placement
                );
                return Ok(active);
            }
            Err(e) => {
                warn!("model candidate '{}' unavailable: {}", candidate.name, e);
                failures.push(format!("{}: {}", candidate.name, e));
            }
        }
    }

    Err(EngineError::ModelProvision(format!(
        "no candidate could be obtained ({})",
        failures.join("; ")
    )))
}

/// Resolve a candidate to raw bytes: local path, cache hit, or fetch.
fn obtain_bytes(
    candidate: &ModelAsset,
    model_dir: &Path,
    fetch: Fetcher<'_>,
    min_bytes: u64,
) -> Result<Vec<u8>, String> {
    match &candidate.origin {
        ModelOrigin::CachePath(path) => {
            if !path.exists() {
                return Err(format!("file not found: {}", path.display()));
            }
            std::fs::read(path).map_err(|e| format!("read {}: {}", path.display(), e))
        }
        ModelOrigin::Remote { url } => {
            let cached = model_dir.join(&candidate.name);
            if let Ok(meta) = std::fs::metadata(&cached) {
                if meta.len() >= min_bytes {
                    debug!("model '{}' already cached", candidate.name);
                    return std::fs::read(&cached)
                        .map_err(|e| format!("read cache {}: {}", cached.display(), e));
                }
                warn!(
                    "cached model '{}' is only {} bytes; refetching",
                    candidate.name,
                    meta.len()
                );
            }

            info!("fetching model '{}' from {}", candidate.name, url);
            let bytes = fetch(url)?;
            if (bytes.len() as u64) < min_bytes {
                return Err(format!(
                    "download truncated: {} bytes (minimum {})",
                    bytes.len(),
                    min_bytes
                ));
            }

            // Cache failures are not fatal; the in-memory bytes still work
            // for this call.
            if let Err(e) = std::fs::create_dir_all(model_dir)
                .and_then(|_| std::fs::write(&cached, &bytes))
            {
                warn!("failed to cache model '{}': {}", candidate.name, e);
            }

            Ok(bytes)
        }
    }
}

/// Place obtained bytes where the module can read them.
fn place(
    runtime: &dyn ModuleRuntime,
    name: &str,
    bytes: Vec<u8>,
) -> Result<ActiveModel, String> {
    let byte_len = bytes.len() as u64;

    if runtime.capabilities().has_vfs {
        runtime.vfs_write(name, &bytes)?;
        Ok(ActiveModel {
            name: name.to_string(),
            byte_len,
            placement: ModelPlacement::VirtualFs(name.to_string()),
        })
    } else {
        debug!("module has no virtual filesystem; keeping model bytes in host memory");
        Ok(ActiveModel {
            name: name.to_string(),
            byte_len,
            placement: ModelPlacement::InMemory(Arc::new(bytes)),
        })
    }
}

/// Download a model into the local cache without touching the module.
///
/// Returns the cached path. Used for pre-fetching from the CLI.
pub fn prefetch(asset: &ModelAsset, model_dir: &Path) -> Result<PathBuf, EngineError> {
    match &asset.origin {
        ModelOrigin::CachePath(path) => {
            if path.exists() {
                Ok(path.clone())
            } else {
                Err(EngineError::ModelProvision(format!(
                    "file not found: {}",
                    path.display()
                )))
            }
        }
        ModelOrigin::Remote { .. } => {
            obtain_bytes(asset, model_dir, &fetch_blocking, MIN_MODEL_BYTES)
                .map_err(EngineError::ModelProvision)?;
            Ok(model_dir.join(&asset.name))
        }
    }
}

/// Blocking HTTP fetch for model binaries.
fn fetch_blocking(url: &str) -> Result<Vec<u8>, String> {
    let response =
        reqwest::blocking::get(url).map_err(|e| format!("request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let bytes = response
        .bytes()
        .map_err(|e| format!("read response: {}", e))?;
    Ok(bytes.to_vec())
}
